use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::audio::{SourceKind, WindowFunction};
use crate::error::SpectrogramError;
use crate::renderer::ViewMode;

/// Supported spectrum sizes
pub const MIN_BINS: usize = 64;
pub const MAX_BINS: usize = 8192;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub spectrogram: SpectrogramConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub source: SourceKind,
    /// Explicit device name; bypasses priority selection
    pub device: Option<String>,
    /// Keywords tried in order against device names
    pub device_priorities: Vec<String>,
    pub sample_rate: u32,
    /// Length of the looping record ring
    pub buffer_seconds: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::default(),
            device: None,
            device_priorities: vec!["Built-in".to_string(), "USB".to_string(), "Headset".to_string()],
            sample_rate: 44100,
            buffer_seconds: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpectrogramConfig {
    pub view: ViewMode,
    pub seconds_visible: f32,
    pub slices_per_second: u32,
    pub frequency_bins: usize,
    pub fft_window: WindowFunction,
    pub min_frequency: f32,
    pub max_frequency: f32,
    /// Pixel rows per channel in the columns view
    pub vertical_resolution: usize,
    /// Gain applied to linear magnitudes in the stereo views
    pub magnitude_scale: f32,
    pub invert_y: bool,
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        Self {
            view: ViewMode::default(),
            seconds_visible: 5.0,
            slices_per_second: 100,
            frequency_bins: 512,
            fft_window: WindowFunction::default(),
            min_frequency: 20.0,
            max_frequency: 6000.0,
            vertical_resolution: 1024,
            magnitude_scale: 50.0,
            invert_y: false,
        }
    }
}

impl SpectrogramConfig {
    /// Columns kept in the circular buffer. Halves round to even.
    pub fn time_width(&self) -> usize {
        (self.seconds_visible * self.slices_per_second as f32).round_ties_even() as usize
    }

    pub fn validate(&self, sample_rate: u32) -> Result<(), SpectrogramError> {
        let invalid = |msg: String| Err(SpectrogramError::InvalidConfig(msg));

        if sample_rate == 0 {
            return invalid("sample_rate must be positive".into());
        }
        if self.slices_per_second == 0 {
            return invalid("slices_per_second must be positive".into());
        }
        if !self.seconds_visible.is_finite() || self.time_width() == 0 {
            return invalid(format!(
                "seconds_visible ({}) x slices_per_second ({}) must cover at least one slice",
                self.seconds_visible, self.slices_per_second
            ));
        }
        if !self.frequency_bins.is_power_of_two()
            || !(MIN_BINS..=MAX_BINS).contains(&self.frequency_bins)
        {
            return invalid(format!(
                "frequency_bins ({}) must be a power of two between {} and {}",
                self.frequency_bins, MIN_BINS, MAX_BINS
            ));
        }
        if !(self.min_frequency >= 0.0 && self.max_frequency >= 0.0) {
            return invalid("frequencies must be non-negative".into());
        }
        if self.vertical_resolution == 0 {
            return invalid("vertical_resolution must be at least 1".into());
        }
        if !self.magnitude_scale.is_finite() {
            return invalid("magnitude_scale must be finite".into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    /// Render frames per second in the terminal
    pub fps: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { fps: 30 }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Get the default XDG config path (~/.config/micgram/config.toml)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("micgram").join("config.toml"))
    }

    /// Load config from the default XDG path if it exists
    /// Returns None if file doesn't exist, logs warning on parse errors
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            return None;
        }
        match Self::load(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("{:#}; using defaults", e);
                None
            }
        }
    }

    /// Initialize default config file at XDG path, returns the path
    pub fn init_default_config() -> Result<PathBuf> {
        let path = Self::default_path().context("Could not determine config directory")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&path, Self::generate_config_template())?;
        Ok(path)
    }

    /// Generate a commented TOML config template
    pub fn generate_config_template() -> String {
        r#"# micgram configuration

[audio]
# Capture backend: "pulse" or "tone" (synthetic test signal)
source = "pulse"
# Explicit device name; when unset the priority list below picks one
# device = "alsa_input.usb-Blue_Microphones"
# Keywords matched case-insensitively against device names, in order
device_priorities = ["Built-in", "USB", "Headset"]
# Sample rate in Hz
sample_rate = 44100
# Length of the looping record buffer in seconds
buffer_seconds = 1

[spectrogram]
# Layout: "mono" (dB, black to red), "stacked" (both channels, full redraw),
# "columns" (both channels, newest column per capture)
view = "mono"
# Seconds of history across the image
seconds_visible = 5.0
# Spectrum captures per second, independent of the frame rate
slices_per_second = 100
# Spectrum size, power of two between 64 and 8192
frequency_bins = 512
# rectangular, triangle, hamming, hanning, blackman, blackman-harris
fft_window = "hanning"
# Frequency band shown by the stacked and columns views (Hz)
min_frequency = 20.0
max_frequency = 6000.0
# Pixel rows per channel in the columns view
vertical_resolution = 1024
# Gain applied to magnitudes in the stacked and columns views
magnitude_scale = 50.0
# Draw high frequencies at the bottom
invert_y = false

[display]
# Terminal frames per second
fps = 30
"#
        .to_string()
    }

    /// Merge CLI arguments into config (CLI takes priority)
    pub fn merge_args(&mut self, args: &crate::Args) {
        // Audio settings
        if let Some(source) = args.source {
            self.audio.source = source;
        }
        if let Some(ref device) = args.device {
            self.audio.device = Some(device.clone());
        }
        if let Some(rate) = args.sample_rate {
            self.audio.sample_rate = rate;
        }

        // Spectrogram settings
        if let Some(view) = args.view {
            self.spectrogram.view = view;
        }
        if let Some(seconds) = args.seconds {
            self.spectrogram.seconds_visible = seconds;
        }
        if let Some(slices) = args.slices {
            self.spectrogram.slices_per_second = slices;
        }
        if let Some(bins) = args.bins {
            self.spectrogram.frequency_bins = bins;
        }
        if let Some(window) = args.window {
            self.spectrogram.fft_window = window;
        }
        if let Some(freq) = args.min_freq {
            self.spectrogram.min_frequency = freq;
        }
        if let Some(freq) = args.max_freq {
            self.spectrogram.max_frequency = freq;
        }
        if let Some(rows) = args.vertical_resolution {
            self.spectrogram.vertical_resolution = rows;
        }
        if let Some(scale) = args.magnitude_scale {
            self.spectrogram.magnitude_scale = scale;
        }
        if args.invert_y {
            self.spectrogram.invert_y = true;
        }

        // Display settings
        if let Some(fps) = args.fps {
            self.display.fps = fps;
        }
    }
}
