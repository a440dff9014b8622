use anyhow::{bail, Result};
use std::f32::consts::TAU;
use std::thread;
use std::time::Duration;
use tracing::info;

use super::capture::{RecordingSource, CHUNK_FRAMES};
use super::{AudioInput, SpectrumSource};

pub const TONE_DEVICE: &str = "Test Tone";

/// Synthetic stereo input: a steady sine on each channel, paced in real time.
pub struct ToneInput {
    pub left_hz: f32,
    pub right_hz: f32,
    pub amplitude: f32,
}

impl Default for ToneInput {
    fn default() -> Self {
        Self {
            left_hz: 440.0,
            right_hz: 2000.0,
            amplitude: 0.5,
        }
    }
}

impl AudioInput for ToneInput {
    fn list_devices(&self) -> Result<Vec<String>> {
        Ok(vec![TONE_DEVICE.to_string()])
    }

    fn start_capture(
        &mut self,
        device: &str,
        looping: bool,
        buffer_seconds: u32,
        sample_rate: u32,
    ) -> Result<Box<dyn SpectrumSource>> {
        if device != TONE_DEVICE {
            bail!("Unknown tone device: {}", device);
        }
        if sample_rate == 0 {
            bail!("Sample rate must be positive");
        }

        info!(
            "Generating {} Hz / {} Hz test tone at {} Hz",
            self.left_hz, self.right_hz, sample_rate
        );

        let rate = sample_rate as f32;
        let steps = [TAU * self.left_hz / rate, TAU * self.right_hz / rate];
        let amplitude = self.amplitude;
        let mut phases = [0.0f32; 2];
        let chunk_duration = Duration::from_secs_f64(CHUNK_FRAMES as f64 / sample_rate as f64);

        let capacity = sample_rate as usize * buffer_seconds.max(1) as usize;
        let source = RecordingSource::start(
            "tone",
            2,
            capacity,
            looping,
            move |chunk: &mut [f32]| {
                for frame in chunk.chunks_exact_mut(2) {
                    for (channel, sample) in frame.iter_mut().enumerate() {
                        *sample = phases[channel].sin() * amplitude;
                        phases[channel] = (phases[channel] + steps[channel]) % TAU;
                    }
                }
                thread::sleep(chunk_duration);
                Ok(())
            },
        )?;

        Ok(Box::new(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::WindowFunction;
    use std::time::Instant;

    fn peak(values: &[f32]) -> usize {
        values
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    #[test]
    fn test_lists_single_device() {
        let input = ToneInput::default();
        assert_eq!(input.list_devices().unwrap(), vec![TONE_DEVICE.to_string()]);
    }

    #[test]
    fn test_rejects_unknown_device() {
        let mut input = ToneInput::default();
        assert!(input.start_capture("Built-in Microphone", true, 1, 8000).is_err());
    }

    #[test]
    fn test_tone_spectrum_peaks_per_channel() {
        let mut input = ToneInput {
            left_hz: 500.0,
            right_hz: 2000.0,
            amplitude: 0.5,
        };
        let mut source = input.start_capture(TONE_DEVICE, true, 1, 8000).unwrap();
        assert_eq!(source.channels(), 2);

        let deadline = Instant::now() + Duration::from_secs(5);
        while source.write_position() == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(source.write_position() > 0, "tone never started");

        // 256 bins -> 512-point FFT -> 15.625 Hz per bin
        let mut out = vec![0.0; 256];
        source.spectrum(0, WindowFunction::Hanning, &mut out);
        assert_eq!(peak(&out), 32);
        source.spectrum(1, WindowFunction::Hanning, &mut out);
        assert_eq!(peak(&out), 128);

        // Channels past the device's count read the last channel.
        source.spectrum(5, WindowFunction::Hanning, &mut out);
        assert_eq!(peak(&out), 128);
    }
}
