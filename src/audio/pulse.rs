use anyhow::{anyhow, Result};
use libpulse_binding as pulse;
use libpulse_simple_binding as psimple;
use pulse::sample::{Format, Spec};
use pulse::stream::Direction;
use tracing::info;

use super::capture::RecordingSource;
use super::{AudioInput, SpectrumSource};

/// Channels requested from the record stream.
const CHANNELS: u8 = 2;

/// Recording input backed by PulseAudio/PipeWire.
pub struct PulseInput;

/// List available PulseAudio/PipeWire sources.
///
/// Returns `(name, state)` tuples parsed from `pactl list short sources`.
pub fn list_sources() -> Result<Vec<(String, String)>> {
    let output = std::process::Command::new("pactl")
        .args(["list", "short", "sources"])
        .output()
        .map_err(|e| anyhow!("Failed to run pactl: {}", e))?;

    if !output.status.success() {
        return Err(anyhow!("pactl list short sources failed"));
    }

    Ok(parse_sources(&String::from_utf8_lossy(&output.stdout)))
}

fn parse_sources(text: &str) -> Vec<(String, String)> {
    let mut sources = Vec::new();
    for line in text.lines() {
        // Format: <id>\t<name>\t<module>\t<sample_spec>\t<state>
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() >= 5 {
            sources.push((cols[1].to_string(), cols[4].to_string()));
        }
    }
    sources
}

impl AudioInput for PulseInput {
    /// Capture sources, excluding the `.monitor` loopbacks of output sinks.
    fn list_devices(&self) -> Result<Vec<String>> {
        Ok(list_sources()?
            .into_iter()
            .map(|(name, _)| name)
            .filter(|name| !name.ends_with(".monitor"))
            .collect())
    }

    fn start_capture(
        &mut self,
        device: &str,
        looping: bool,
        buffer_seconds: u32,
        sample_rate: u32,
    ) -> Result<Box<dyn SpectrumSource>> {
        let spec = Spec {
            format: Format::F32le,
            channels: CHANNELS,
            rate: sample_rate,
        };

        if !spec.is_valid() {
            return Err(anyhow!("Invalid PulseAudio sample spec at {} Hz", sample_rate));
        }

        let stream = psimple::Simple::new(
            None,              // Use default server
            "micgram",         // Application name
            Direction::Record, // Recording stream
            Some(device),      // Source name
            "spectrogram",     // Stream description
            &spec,             // Sample format
            None,              // Default channel map
            None,              // Default buffering attributes
        )
        .map_err(|e| anyhow!("Failed to connect to PulseAudio: {:?}", e))?;

        info!("Recording from {} at {} Hz", device, sample_rate);

        let capacity = sample_rate as usize * buffer_seconds.max(1) as usize;
        let source = RecordingSource::start(
            "pulse",
            CHANNELS as usize,
            capacity,
            looping,
            move |chunk: &mut [f32]| {
                let bytes = unsafe {
                    std::slice::from_raw_parts_mut(
                        chunk.as_mut_ptr() as *mut u8,
                        std::mem::size_of_val(chunk),
                    )
                };
                stream
                    .read(bytes)
                    .map_err(|e| anyhow!("PulseAudio read failed: {:?}", e))
            },
        )?;

        Ok(Box::new(source))
    }
}
