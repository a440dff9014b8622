use crate::audio::{SpectrumSource, WindowFunction};

use super::buffer::SpectralBuffer;
use super::mapper::FrequencyWindow;

/// Added to magnitudes before taking the log so silence stays finite.
pub const DB_EPSILON: f32 = 1e-7;

/// `20 * log10(magnitude + DB_EPSILON)`
#[inline]
pub fn to_decibels(magnitude: f32) -> f32 {
    20.0 * (magnitude + DB_EPSILON).log10()
}

/// Transform applied to each magnitude before it is stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MagnitudeScale {
    Decibels,
    Linear { gain: f32 },
}

impl MagnitudeScale {
    #[inline]
    pub fn apply(self, magnitude: f32) -> f32 {
        match self {
            MagnitudeScale::Decibels => to_decibels(magnitude),
            MagnitudeScale::Linear { gain } => magnitude * gain,
        }
    }

    /// Stored value for a silent bin.
    pub fn silence(self) -> f32 {
        self.apply(0.0)
    }
}

/// Which bins of a captured spectrum end up in the buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinLayout {
    /// Every bin
    Full,
    /// Every bin, with bins outside the window stored as silence
    Masked(FrequencyWindow),
    /// Only the window's bins, packed from row 0
    Cropped(FrequencyWindow),
}

impl BinLayout {
    /// Buffer rows needed for a `bins`-point spectrum.
    pub fn rows(&self, bins: usize) -> usize {
        match self {
            BinLayout::Full | BinLayout::Masked(_) => bins,
            BinLayout::Cropped(window) => window.visible_bins(),
        }
    }
}

/// Pulls one spectral frame per channel and stores it at the buffer cursor.
pub struct SliceCapture {
    channels: usize,
    window: WindowFunction,
    layout: BinLayout,
    scale: MagnitudeScale,
    spectrum: Vec<f32>,
    frame: Vec<f32>,
}

impl SliceCapture {
    pub fn new(
        bins: usize,
        channels: usize,
        window: WindowFunction,
        layout: BinLayout,
        scale: MagnitudeScale,
    ) -> Self {
        Self {
            channels,
            window,
            layout,
            scale,
            spectrum: vec![0.0; bins],
            frame: vec![0.0; layout.rows(bins)],
        }
    }

    pub fn rows(&self) -> usize {
        self.frame.len()
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Capture one slice from `source` into `buffer` and advance its cursor.
    /// Returns the column written.
    ///
    /// Stale or silent spectra are stored as they are; bins a source leaves
    /// unwritten read as zero magnitude.
    pub fn capture(&mut self, source: &mut dyn SpectrumSource, buffer: &mut SpectralBuffer) -> usize {
        let column = buffer.cursor();
        for channel in 0..self.channels {
            self.spectrum.fill(0.0);
            source.spectrum(channel, self.window, &mut self.spectrum);
            self.shape_frame();
            buffer.write(column, channel, &self.frame);
        }
        buffer.advance();
        column
    }

    fn shape_frame(&mut self) {
        let scale = self.scale;
        match self.layout {
            BinLayout::Full => {
                for (value, &magnitude) in self.frame.iter_mut().zip(&self.spectrum) {
                    *value = scale.apply(magnitude);
                }
            }
            BinLayout::Masked(window) => {
                let silence = scale.silence();
                for (bin, (value, &magnitude)) in self.frame.iter_mut().zip(&self.spectrum).enumerate() {
                    *value = if window.contains(bin) {
                        scale.apply(magnitude)
                    } else {
                        silence
                    };
                }
            }
            BinLayout::Cropped(window) => {
                for (value, &magnitude) in self.frame.iter_mut().zip(window.crop(&self.spectrum)) {
                    *value = scale.apply(magnitude);
                }
            }
        }
    }
}
