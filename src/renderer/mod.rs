//! Pixel surfaces and the spectrogram rasterizers that draw into them.
//!
//! Rasterizers write through the [`Surface`] trait and publish their work with
//! [`Surface::commit`]. [`Canvas`] is the in-memory surface handed to the
//! presentation layer; it keeps a back buffer for writes and a front buffer
//! holding the last committed image.

pub mod styles;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::color::Rgb8;
use crate::spectrogram::SpectralBuffer;

pub use styles::{ColumnStrips, MonoHeatmap, StackedHeatmap};

/// Writable RGB image with an explicit publish step.
///
/// Pixel `(0, 0)` is the bottom-left corner.
pub trait Surface {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn set_pixel(&mut self, x: usize, y: usize, color: Rgb8);
    fn commit(&mut self);
}

/// Strategy that turns the spectral buffer into pixels.
pub trait Rasterizer {
    fn name(&self) -> &'static str;

    /// `(width, height)` of the surface this rasterizer draws into.
    fn surface_size(&self) -> (usize, usize);

    /// Runs after every slice capture, possibly several times per frame.
    fn after_capture(&mut self, _buffer: &SpectralBuffer, _surface: &mut dyn Surface) {}

    /// Runs once per rendered frame, after pending captures.
    fn after_frame(&mut self, _buffer: &SpectralBuffer, _surface: &mut dyn Surface) {}
}

/// Spectrogram layout
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Single channel in dB, black to red
    #[default]
    Mono,
    /// Both channels stacked, whole image redrawn every frame
    Stacked,
    /// Both channels stacked, only the newest column drawn per capture
    Columns,
}

impl ViewMode {
    /// Channels captured for this view.
    pub fn channels(&self) -> usize {
        match self {
            ViewMode::Mono => 1,
            ViewMode::Stacked | ViewMode::Columns => 2,
        }
    }
}

fn black() -> Rgb8 {
    Rgb8::new(0, 0, 0)
}

/// Owned, double-buffered RGB pixel grid.
pub struct Canvas {
    width: usize,
    height: usize,
    back: Vec<Rgb8>,
    front: Vec<Rgb8>,
    /// Inclusive column span written since the last commit
    dirty: Option<(usize, usize)>,
    commits: u64,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            back: vec![black(); width * height],
            front: vec![black(); width * height],
            dirty: None,
            commits: 0,
        }
    }

    /// Committed color at (x, y); black outside the grid.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> Rgb8 {
        if x < self.width && y < self.height {
            self.front[y * self.width + x]
        } else {
            black()
        }
    }

    /// Number of commits so far.
    pub fn commits(&self) -> u64 {
        self.commits
    }
}

impl Surface for Canvas {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn set_pixel(&mut self, x: usize, y: usize, color: Rgb8) {
        if x >= self.width || y >= self.height {
            return;
        }
        self.back[y * self.width + x] = color;
        self.dirty = Some(match self.dirty {
            Some((lo, hi)) => (lo.min(x), hi.max(x)),
            None => (x, x),
        });
    }

    /// Copy the dirty column span of the back buffer to the front buffer.
    fn commit(&mut self) {
        if let Some((lo, hi)) = self.dirty.take() {
            for row in 0..self.height {
                let start = row * self.width;
                self.front[start + lo..=start + hi].copy_from_slice(&self.back[start + lo..=start + hi]);
            }
        }
        self.commits += 1;
    }
}

/// Build the rasterizer for `view`.
pub fn build_rasterizer(
    view: ViewMode,
    time_width: usize,
    bins: usize,
    vertical_resolution: usize,
    invert_y: bool,
) -> Box<dyn Rasterizer> {
    match view {
        ViewMode::Mono => Box::new(MonoHeatmap::new(time_width, bins, invert_y)),
        ViewMode::Stacked => Box::new(StackedHeatmap::new(time_width, bins, invert_y)),
        ViewMode::Columns => Box::new(ColumnStrips::new(time_width, vertical_resolution, invert_y)),
    }
}

/// Surface row for panel row `y` of a `height`-row panel starting at `base`.
#[inline]
pub(crate) fn panel_row(base: usize, y: usize, height: usize, invert: bool) -> usize {
    if invert {
        base + height - 1 - y
    } else {
        base + y
    }
}
