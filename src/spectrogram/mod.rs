//! Sliding-window spectrogram engine.
//!
//! A [`Spectrogram`] owns the recording, the circular spectral buffer, the
//! slice clock, the rasterizer and the pixel surface. The caller drives it
//! with [`Spectrogram::tick`] from its own loop; each tick drains every slice
//! capture that came due since the previous one, then lets the rasterizer
//! finish the frame.

mod buffer;
mod capture;
mod clock;
mod mapper;
#[cfg(test)]
pub(crate) mod testing;

pub use buffer::SpectralBuffer;
pub use capture::{BinLayout, MagnitudeScale, SliceCapture};
pub use clock::SliceClock;
pub use mapper::{resample, FrequencyWindow};

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::audio::{select_by_priority, AudioInput, SpectrumSource};
use crate::config::{AudioConfig, SpectrogramConfig};
use crate::error::SpectrogramError;
use crate::renderer::{build_rasterizer, Canvas, Rasterizer, ViewMode};

/// How long to wait for the first recorded samples before rendering anyway.
pub const WARMUP_TIMEOUT: Duration = Duration::from_secs(2);

/// The values stored by the most recent capture, one row set per channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpectralFrame {
    /// Spectrum bin of row 0
    pub first_bin: usize,
    pub channels: Vec<Vec<f32>>,
}

impl SpectralFrame {
    /// Spectrum bin holding the largest value of the first channel.
    pub fn peak_bin(&self) -> Option<usize> {
        let rows = self.channels.first()?;
        rows.iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f32)>, (row, &value)| match best {
                Some((_, top)) if top >= value => best,
                _ => Some((row, value)),
            })
            .map(|(row, _)| self.first_bin + row)
    }
}

pub struct Spectrogram {
    source: Box<dyn SpectrumSource>,
    capture: SliceCapture,
    buffer: SpectralBuffer,
    clock: SliceClock,
    rasterizer: Box<dyn Rasterizer>,
    surface: Canvas,
    window: FrequencyWindow,
    first_bin: usize,
    mirrored: bool,
    frames: watch::Sender<Arc<SpectralFrame>>,
    captures: u64,
}

impl Spectrogram {
    /// Pick a device, start recording and build the pipeline.
    ///
    /// Fails with [`SpectrogramError::NoInputDevice`] when the input reports
    /// no devices; there is no retry.
    pub fn start(
        input: &mut dyn AudioInput,
        audio: &AudioConfig,
        settings: &SpectrogramConfig,
    ) -> Result<Self, SpectrogramError> {
        settings.validate(audio.sample_rate)?;

        let devices = input.list_devices().unwrap_or_else(|e| {
            warn!("Failed to list audio devices: {:#}", e);
            Vec::new()
        });

        info!("Detected {} audio input device(s)", devices.len());
        for device in &devices {
            info!("  {}", device);
        }

        if devices.is_empty() {
            error!("No audio input device detected");
            return Err(SpectrogramError::NoInputDevice);
        }

        let device = match &audio.device {
            Some(name) => name.clone(),
            None => {
                let (chosen, matched) = select_by_priority(&devices, &audio.device_priorities)
                    .ok_or(SpectrogramError::NoInputDevice)?;
                if matched {
                    debug!("Priority match found: {}", chosen);
                } else {
                    debug!("No priority match, falling back to first device");
                }
                chosen.to_string()
            }
        };

        info!("Using audio input: {}", device);

        let source = input
            .start_capture(&device, true, audio.buffer_seconds, audio.sample_rate)
            .map_err(|e| SpectrogramError::DeviceStart {
                device: device.clone(),
                reason: format!("{:#}", e),
            })?;

        wait_for_recording(source.as_ref(), WARMUP_TIMEOUT);

        Self::new(source, audio.sample_rate, settings)
    }

    /// Build the pipeline around an already running source.
    pub fn new(
        source: Box<dyn SpectrumSource>,
        sample_rate: u32,
        settings: &SpectrogramConfig,
    ) -> Result<Self, SpectrogramError> {
        settings.validate(sample_rate)?;

        let bins = settings.frequency_bins;
        let time_width = settings.time_width();
        let view = settings.view;
        let clock = SliceClock::new(settings.slices_per_second);
        let window = FrequencyWindow::new(
            sample_rate,
            bins,
            settings.min_frequency,
            settings.max_frequency,
        );

        let (layout, scale) = match view {
            ViewMode::Mono => (BinLayout::Full, MagnitudeScale::Decibels),
            ViewMode::Stacked => (
                BinLayout::Masked(window),
                MagnitudeScale::Linear { gain: settings.magnitude_scale },
            ),
            ViewMode::Columns => (
                BinLayout::Cropped(window),
                MagnitudeScale::Linear { gain: settings.magnitude_scale },
            ),
        };

        let mirrored = source.channels() < view.channels();
        if mirrored {
            warn!(
                "{:?} view wants {} channels but the input has {}; repeating the last channel",
                view,
                view.channels(),
                source.channels()
            );
        }
        let first_bin = match layout {
            BinLayout::Cropped(window) => window.min_bin(),
            BinLayout::Full | BinLayout::Masked(_) => 0,
        };

        let capture = SliceCapture::new(bins, view.channels(), settings.fft_window, layout, scale);
        let buffer = SpectralBuffer::new(time_width, capture.rows(), capture.channels(), scale.silence());
        let rasterizer = build_rasterizer(
            view,
            time_width,
            bins,
            settings.vertical_resolution,
            settings.invert_y,
        );
        let (width, height) = rasterizer.surface_size();

        info!(
            "Spectrogram: {} view, {} columns x {} rows, bins {}..={} of {}, {} window",
            rasterizer.name(),
            width,
            height,
            window.min_bin(),
            window.max_bin(),
            bins,
            settings.fft_window
        );
        debug!("Capturing a slice every {:?}", clock.interval());

        Ok(Self {
            source,
            capture,
            buffer,
            clock,
            rasterizer,
            surface: Canvas::new(width, height),
            window,
            first_bin,
            mirrored,
            frames: watch::channel(Arc::new(SpectralFrame::default())).0,
            captures: 0,
        })
    }

    /// Advance by `elapsed`, run every capture that came due, and finish the
    /// frame. Returns the number of captures performed.
    pub fn tick(&mut self, elapsed: Duration) -> usize {
        self.clock.advance(elapsed);

        let mut captured = 0;
        while self.clock.next_slice() {
            self.capture_slice();
            captured += 1;
        }

        self.rasterizer.after_frame(&self.buffer, &mut self.surface);
        captured
    }

    /// Capture one slice immediately, outside the clock.
    pub fn capture_slice(&mut self) {
        let column = self.capture.capture(self.source.as_mut(), &mut self.buffer);
        self.captures += 1;
        let frame = SpectralFrame {
            first_bin: self.first_bin,
            channels: (0..self.buffer.channels())
                .map(|channel| self.buffer.column(channel, column).to_vec())
                .collect(),
        };
        self.frames.send_replace(Arc::new(frame));
        self.rasterizer.after_capture(&self.buffer, &mut self.surface);
    }

    pub fn surface(&self) -> &Canvas {
        &self.surface
    }

    pub fn buffer(&self) -> &SpectralBuffer {
        &self.buffer
    }

    pub fn frequency_window(&self) -> FrequencyWindow {
        self.window
    }

    /// Receiver of the newest captured frame, updated after every capture.
    pub fn subscribe(&self) -> watch::Receiver<Arc<SpectralFrame>> {
        self.frames.subscribe()
    }

    /// True when the view needs more channels than the input provides.
    pub fn mirrors_channels(&self) -> bool {
        self.mirrored
    }

    pub fn captures(&self) -> u64 {
        self.captures
    }

    pub fn view_name(&self) -> &'static str {
        self.rasterizer.name()
    }

    /// Stop recording and release the surface.
    pub fn shutdown(self) {
        info!("Stopping spectrogram after {} captures", self.captures);
        drop(self.source);
        drop(self.surface);
    }
}

/// Block until `source` reports recorded samples or `timeout` passes.
pub fn wait_for_recording(source: &dyn SpectrumSource, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while source.write_position() == 0 {
        if Instant::now() >= deadline {
            warn!("No audio recorded after {:?}; starting with silence", timeout);
            return false;
        }
        thread::sleep(Duration::from_millis(5));
    }
    debug!("Recording started at frame {}", source.write_position());
    true
}

#[cfg(test)]
mod tests {
    use super::testing::{ScriptedInput, ScriptedSource};
    use super::*;
    use crate::color::{Heatmap, Rgb8};

    fn settings(view: ViewMode) -> SpectrogramConfig {
        SpectrogramConfig {
            view,
            seconds_visible: 0.03,
            slices_per_second: 100,
            frequency_bins: 64,
            min_frequency: 0.0,
            max_frequency: 4000.0,
            vertical_resolution: 8,
            magnitude_scale: 1.0,
            ..SpectrogramConfig::default()
        }
    }

    fn impulse(bin: usize, value: f32) -> Vec<f32> {
        let mut frame = vec![0.0; 64];
        frame[bin] = value;
        frame
    }

    #[test]
    fn test_tick_drains_due_captures_in_order() {
        let frames = (1..=4).map(|i| impulse(i, 1.0)).collect();
        let source = ScriptedSource::mono(frames);
        let mut spectrogram = Spectrogram::new(Box::new(source), 8000, &settings(ViewMode::Mono)).unwrap();
        assert_eq!(spectrogram.buffer().time_width(), 3);

        assert_eq!(spectrogram.tick(Duration::from_millis(5)), 0);
        assert_eq!(spectrogram.tick(Duration::from_millis(40)), 4);
        assert_eq!(spectrogram.captures(), 4);
        assert_eq!(spectrogram.buffer().cursor(), 1);

        // Oldest surviving capture is the second one.
        let newest_bins: Vec<usize> = spectrogram
            .buffer()
            .chronological(0)
            .map(|column| column.iter().position(|&v| v > -1.0).unwrap())
            .collect();
        assert_eq!(newest_bins, vec![2, 3, 4]);
    }

    #[test]
    fn test_mono_view_renders_every_frame() {
        let source = ScriptedSource::mono(vec![impulse(5, 1.0)]);
        let mut spectrogram = Spectrogram::new(Box::new(source), 8000, &settings(ViewMode::Mono)).unwrap();

        spectrogram.tick(Duration::from_millis(15));
        assert_eq!(spectrogram.surface().commits(), 1);
        spectrogram.tick(Duration::ZERO);
        assert_eq!(spectrogram.surface().commits(), 2);

        // One capture landed in the newest (rightmost) column.
        let surface = spectrogram.surface();
        assert_eq!(surface.pixel(2, 5), Heatmap::TwoStop.color(1.0));
        assert_eq!(surface.pixel(2, 6), Rgb8::new(0, 0, 0));
        assert_eq!(surface.pixel(0, 5), Rgb8::new(0, 0, 0));
    }

    #[test]
    fn test_columns_view_commits_per_capture() {
        let left = vec![vec![1.0; 64]; 3];
        let right = vec![vec![0.0; 64]; 3];
        let source = ScriptedSource::stereo(left, right);
        let mut spectrogram =
            Spectrogram::new(Box::new(source), 8000, &settings(ViewMode::Columns)).unwrap();

        assert_eq!(spectrogram.tick(Duration::from_millis(35)), 3);
        assert_eq!(spectrogram.surface().commits(), 3);

        let surface = spectrogram.surface();
        for x in 0..3 {
            // Right channel below, left channel above
            assert_eq!(surface.pixel(x, 0), Rgb8::new(0, 0, 0));
            assert_eq!(surface.pixel(x, 8), Heatmap::ThreeStop.color(1.0));
        }
    }

    #[test]
    fn test_stacked_view_masks_out_of_band_bins() {
        let mut config = settings(ViewMode::Stacked);
        config.min_frequency = 1000.0;
        config.max_frequency = 2000.0;
        let source = ScriptedSource::stereo(vec![vec![1.0; 64]], vec![vec![1.0; 64]]);
        let mut spectrogram = Spectrogram::new(Box::new(source), 8000, &config).unwrap();
        let window = spectrogram.frequency_window();
        assert_eq!((window.min_bin(), window.max_bin()), (16, 32));

        spectrogram.tick(Duration::from_millis(15));
        let surface = spectrogram.surface();
        let red = Heatmap::ThreeStop.color(1.0);
        assert_eq!(surface.pixel(2, 15), Rgb8::new(0, 0, 0));
        assert_eq!(surface.pixel(2, 16), red);
        assert_eq!(surface.pixel(2, 32), red);
        assert_eq!(surface.pixel(2, 33), Rgb8::new(0, 0, 0));
        assert_eq!(surface.pixel(2, 64 + 20), red);
    }

    #[test]
    fn test_latest_frame_is_published_after_each_capture() {
        let source = ScriptedSource::mono(vec![impulse(5, 1.0), impulse(9, 1.0)]);
        let mut spectrogram = Spectrogram::new(Box::new(source), 8000, &settings(ViewMode::Mono)).unwrap();
        let mut frames = spectrogram.subscribe();
        assert!(!frames.has_changed().unwrap());

        assert_eq!(spectrogram.tick(Duration::from_millis(25)), 2);
        assert!(frames.has_changed().unwrap());
        let frame = frames.borrow_and_update().clone();
        assert_eq!(frame.channels.len(), 1);
        assert_eq!(frame.channels[0].len(), 64);
        assert_eq!(frame.peak_bin(), Some(9));
        assert!(frame.channels[0][9].abs() < 1e-5);
    }

    #[test]
    fn test_cropped_frame_reports_spectrum_bins() {
        let mut config = settings(ViewMode::Columns);
        config.min_frequency = 1000.0;
        config.max_frequency = 2000.0;
        let source = ScriptedSource::stereo(vec![impulse(20, 0.5)], vec![impulse(30, 0.5)]);
        let mut spectrogram = Spectrogram::new(Box::new(source), 8000, &config).unwrap();
        let frames = spectrogram.subscribe();

        spectrogram.capture_slice();
        let frame = frames.borrow().clone();
        assert_eq!(frame.first_bin, 16);
        assert_eq!(frame.channels.len(), 2);
        assert_eq!(frame.channels[0].len(), 17);
        assert_eq!(frame.peak_bin(), Some(20));
        assert_eq!(SpectralFrame::default().peak_bin(), None);
    }

    #[test]
    fn test_stereo_view_on_mono_input_mirrors_channels() {
        let mono = ScriptedSource::mono(Vec::new());
        let spectrogram = Spectrogram::new(Box::new(mono), 8000, &settings(ViewMode::Stacked)).unwrap();
        assert!(spectrogram.mirrors_channels());

        let mono = ScriptedSource::mono(Vec::new());
        let spectrogram = Spectrogram::new(Box::new(mono), 8000, &settings(ViewMode::Mono)).unwrap();
        assert!(!spectrogram.mirrors_channels());

        let stereo = ScriptedSource::stereo(Vec::new(), Vec::new());
        let spectrogram = Spectrogram::new(Box::new(stereo), 8000, &settings(ViewMode::Columns)).unwrap();
        assert!(!spectrogram.mirrors_channels());
    }

    #[test]
    fn test_rejects_invalid_settings() {
        let source = ScriptedSource::mono(Vec::new());
        let mut config = settings(ViewMode::Mono);
        config.frequency_bins = 100;
        assert!(matches!(
            Spectrogram::new(Box::new(source), 8000, &config),
            Err(SpectrogramError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_start_without_devices_is_disabled() {
        let mut input = ScriptedInput::new(&[]);
        let result = Spectrogram::start(&mut input, &AudioConfig::default(), &settings(ViewMode::Mono));
        assert!(matches!(result, Err(SpectrogramError::NoInputDevice)));
        assert!(input.started.is_empty());
    }

    #[test]
    fn test_start_selects_by_priority() {
        let mut input = ScriptedInput::new(&["HDMI Capture", "USB PnP Sound", "Built-in Mic"]);
        let audio = AudioConfig {
            sample_rate: 8000,
            ..AudioConfig::default()
        };
        let spectrogram = Spectrogram::start(&mut input, &audio, &settings(ViewMode::Stacked)).unwrap();
        assert_eq!(input.started, vec![("Built-in Mic".to_string(), true, 1, 8000)]);
        spectrogram.shutdown();
    }

    #[test]
    fn test_start_honours_explicit_device() {
        let mut input = ScriptedInput::new(&["Built-in Mic"]);
        let audio = AudioConfig {
            device: Some("alsa_input.custom".to_string()),
            sample_rate: 8000,
            ..AudioConfig::default()
        };
        Spectrogram::start(&mut input, &audio, &settings(ViewMode::Mono)).unwrap();
        assert_eq!(input.started[0].0, "alsa_input.custom");
    }

    #[test]
    fn test_start_reports_device_failure() {
        let mut input = ScriptedInput::new(&["USB Mic"]);
        input.fail_start = true;
        let audio = AudioConfig {
            sample_rate: 8000,
            ..AudioConfig::default()
        };
        let result = Spectrogram::start(&mut input, &audio, &settings(ViewMode::Mono));
        match result {
            Err(SpectrogramError::DeviceStart { device, reason }) => {
                assert_eq!(device, "USB Mic");
                assert!(reason.contains("busy"));
            }
            other => panic!("unexpected result: {:?}", other.err()),
        }
    }

    #[test]
    fn test_wait_for_recording_times_out() {
        let mut source = ScriptedSource::mono(Vec::new());
        source.write_position = 0;
        assert!(!wait_for_recording(&source, Duration::from_millis(20)));
        source.write_position = 10;
        assert!(wait_for_recording(&source, Duration::from_millis(20)));
    }
}
