//! The three spectrogram rasterizers.
//!
//! Time runs along x and frequency along y, with low frequencies at the bottom
//! unless `invert_y` is set. The stereo views put the right channel in the
//! lower panel and the left channel in the upper one.

use super::{panel_row, Rasterizer, Surface};
use crate::color::{Heatmap, Rgb8};
use crate::spectrogram::{resample, SpectralBuffer};

/// dB value drawn as black in the mono view
pub const MONO_FLOOR_DB: f32 = -80.0;
/// dB value drawn at full intensity in the mono view
pub const MONO_CEILING_DB: f32 = 0.0;

const LEFT: usize = 0;
const RIGHT: usize = 1;

#[inline]
fn inverse_lerp(a: f32, b: f32, v: f32) -> f32 {
    ((v - a) / (b - a)).clamp(0.0, 1.0)
}

/// Redraw every column of one channel, oldest at x = 0.
fn draw_history(
    buffer: &SpectralBuffer,
    surface: &mut dyn Surface,
    channel: usize,
    base: usize,
    invert: bool,
    color: impl Fn(f32) -> Rgb8,
) {
    let rows = buffer.rows();
    let channel = channel.min(buffer.channels().saturating_sub(1));
    for (x, column) in buffer.chronological(channel).enumerate() {
        for (y, &value) in column.iter().enumerate() {
            surface.set_pixel(x, panel_row(base, y, rows, invert), color(value));
        }
    }
}

/// Single channel, decibels mapped black to red, full redraw each frame.
pub struct MonoHeatmap {
    time_width: usize,
    bins: usize,
    invert_y: bool,
}

impl MonoHeatmap {
    pub fn new(time_width: usize, bins: usize, invert_y: bool) -> Self {
        Self {
            time_width,
            bins,
            invert_y,
        }
    }
}

impl Rasterizer for MonoHeatmap {
    fn name(&self) -> &'static str {
        "mono"
    }

    fn surface_size(&self) -> (usize, usize) {
        (self.time_width, self.bins)
    }

    fn after_frame(&mut self, buffer: &SpectralBuffer, surface: &mut dyn Surface) {
        draw_history(buffer, surface, LEFT, 0, self.invert_y, |db| {
            Heatmap::TwoStop.color(inverse_lerp(MONO_FLOOR_DB, MONO_CEILING_DB, db))
        });
        surface.commit();
    }
}

/// Both channels at full bin resolution, full redraw each frame.
pub struct StackedHeatmap {
    time_width: usize,
    bins: usize,
    invert_y: bool,
}

impl StackedHeatmap {
    pub fn new(time_width: usize, bins: usize, invert_y: bool) -> Self {
        Self {
            time_width,
            bins,
            invert_y,
        }
    }
}

impl Rasterizer for StackedHeatmap {
    fn name(&self) -> &'static str {
        "stacked"
    }

    fn surface_size(&self) -> (usize, usize) {
        (self.time_width, self.bins * 2)
    }

    fn after_frame(&mut self, buffer: &SpectralBuffer, surface: &mut dyn Surface) {
        let color = |v: f32| Heatmap::ThreeStop.color(v);
        draw_history(buffer, surface, RIGHT, 0, self.invert_y, color);
        draw_history(buffer, surface, LEFT, self.bins, self.invert_y, color);
        surface.commit();
    }
}

/// Both channels resampled to a fixed row count; each capture draws only its
/// own column, at the buffer slot it was written to.
pub struct ColumnStrips {
    time_width: usize,
    rows: usize,
    invert_y: bool,
    strip: Vec<f32>,
}

impl ColumnStrips {
    pub fn new(time_width: usize, vertical_resolution: usize, invert_y: bool) -> Self {
        Self {
            time_width,
            rows: vertical_resolution.max(1),
            invert_y,
            strip: vec![0.0; vertical_resolution.max(1)],
        }
    }

    fn draw_strip(&mut self, column: &[f32], x: usize, base: usize, surface: &mut dyn Surface) {
        resample(column, &mut self.strip);
        for (y, &value) in self.strip.iter().enumerate() {
            let row = panel_row(base, y, self.rows, self.invert_y);
            surface.set_pixel(x, row, Heatmap::ThreeStop.color(value));
        }
    }
}

impl Rasterizer for ColumnStrips {
    fn name(&self) -> &'static str {
        "columns"
    }

    fn surface_size(&self) -> (usize, usize) {
        (self.time_width, self.rows * 2)
    }

    fn after_capture(&mut self, buffer: &SpectralBuffer, surface: &mut dyn Surface) {
        let x = buffer.latest_column();
        let last = buffer.channels().saturating_sub(1);
        self.draw_strip(buffer.column(RIGHT.min(last), x), x, 0, surface);
        self.draw_strip(buffer.column(LEFT, x), x, self.rows, surface);
        surface.commit();
    }
}
