use rustfft::{num_complex::Complex, FftPlanner};

use super::WindowFunction;

/// Magnitude spectrum of the newest samples of one channel.
///
/// A request for `n` bins runs a `2n`-point FFT over the most recent `2n`
/// samples and keeps the first `n` magnitudes, scaled by `1 / 2n`.
pub struct SpectrumAnalyzer {
    planner: FftPlanner<f32>,
    buffer: Vec<Complex<f32>>,
    window_kind: Option<WindowFunction>,
    window: Vec<f32>,
}

impl SpectrumAnalyzer {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
            buffer: Vec::new(),
            window_kind: None,
            window: Vec::new(),
        }
    }

    /// Fill `out` with `out.len()` bin magnitudes computed from `samples`.
    ///
    /// Fewer samples than the FFT size are zero padded at the front, so a
    /// device that has only just started recording reads as quiet.
    pub fn magnitudes(&mut self, samples: &[f32], window: WindowFunction, out: &mut [f32]) {
        let bins = out.len();
        if bins == 0 {
            return;
        }
        let fft_size = bins * 2;

        if self.window_kind != Some(window) || self.window.len() != fft_size {
            self.window = window.coefficients(fft_size);
            self.window_kind = Some(window);
        }

        self.buffer.clear();
        self.buffer.resize(fft_size, Complex::new(0.0, 0.0));

        let take = samples.len().min(fft_size);
        let offset = fft_size - take;
        for (i, &sample) in samples[samples.len() - take..].iter().enumerate() {
            let idx = offset + i;
            self.buffer[idx] = Complex::new(sample * self.window[idx], 0.0);
        }

        let fft = self.planner.plan_fft_forward(fft_size);
        fft.process(&mut self.buffer);

        let scale = 1.0 / fft_size as f32;
        for (magnitude, bin) in out.iter_mut().zip(self.buffer.iter()) {
            *magnitude = bin.norm() * scale;
        }
    }
}

impl Default for SpectrumAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
