use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::fmt;

/// Window applied to the sample block before the FFT.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum WindowFunction {
    Rectangular,
    Triangle,
    Hamming,
    #[default]
    Hanning,
    Blackman,
    BlackmanHarris,
}

impl WindowFunction {
    /// Symmetric window coefficients for a block of `size` samples.
    pub fn coefficients(self, size: usize) -> Vec<f32> {
        if size <= 1 {
            return vec![1.0; size];
        }

        let last = (size - 1) as f32;
        (0..size)
            .map(|i| {
                let x = i as f32 / last;
                match self {
                    WindowFunction::Rectangular => 1.0,
                    WindowFunction::Triangle => 1.0 - (2.0 * x - 1.0).abs(),
                    WindowFunction::Hamming => 0.54 - 0.46 * (2.0 * PI * x).cos(),
                    WindowFunction::Hanning => 0.5 * (1.0 - (2.0 * PI * x).cos()),
                    WindowFunction::Blackman => {
                        0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
                    }
                    WindowFunction::BlackmanHarris => {
                        0.35875 - 0.48829 * (2.0 * PI * x).cos() + 0.14128 * (4.0 * PI * x).cos()
                            - 0.01168 * (6.0 * PI * x).cos()
                    }
                }
            })
            .collect()
    }

    pub fn name(&self) -> &'static str {
        match self {
            WindowFunction::Rectangular => "rectangular",
            WindowFunction::Triangle => "triangle",
            WindowFunction::Hamming => "hamming",
            WindowFunction::Hanning => "hanning",
            WindowFunction::Blackman => "blackman",
            WindowFunction::BlackmanHarris => "blackman-harris",
        }
    }
}

impl fmt::Display for WindowFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
