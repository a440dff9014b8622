//! Scripted audio doubles shared by the spectrogram tests.

use anyhow::{bail, Result};
use std::collections::VecDeque;

use crate::audio::{AudioInput, SpectrumSource, WindowFunction};

/// Replays queued frames per channel; writes nothing once a queue is empty.
pub struct ScriptedSource {
    frames: Vec<VecDeque<Vec<f32>>>,
    requests: Vec<(usize, usize, WindowFunction)>,
    pub write_position: usize,
}

impl ScriptedSource {
    pub fn mono(frames: Vec<Vec<f32>>) -> Self {
        Self::with_channels(vec![frames])
    }

    pub fn stereo(left: Vec<Vec<f32>>, right: Vec<Vec<f32>>) -> Self {
        Self::with_channels(vec![left, right])
    }

    fn with_channels(channels: Vec<Vec<Vec<f32>>>) -> Self {
        Self {
            frames: channels.into_iter().map(VecDeque::from).collect(),
            requests: Vec::new(),
            write_position: 1,
        }
    }

    /// `(channel, bins, window)` of every spectrum request so far
    pub fn requests(&self) -> &[(usize, usize, WindowFunction)] {
        &self.requests
    }
}

impl SpectrumSource for ScriptedSource {
    fn channels(&self) -> usize {
        self.frames.len()
    }

    fn write_position(&self) -> usize {
        self.write_position
    }

    fn spectrum(&mut self, channel: usize, window: WindowFunction, out: &mut [f32]) {
        self.requests.push((channel, out.len(), window));
        if let Some(frame) = self.frames.get_mut(channel).and_then(VecDeque::pop_front) {
            let len = frame.len().min(out.len());
            out[..len].copy_from_slice(&frame[..len]);
        }
    }
}

/// Device list plus a record of every capture start.
pub struct ScriptedInput {
    pub devices: Vec<String>,
    pub started: Vec<(String, bool, u32, u32)>,
    pub fail_start: bool,
}

impl ScriptedInput {
    pub fn new(devices: &[&str]) -> Self {
        Self {
            devices: devices.iter().map(|d| d.to_string()).collect(),
            started: Vec::new(),
            fail_start: false,
        }
    }
}

impl AudioInput for ScriptedInput {
    fn list_devices(&self) -> Result<Vec<String>> {
        Ok(self.devices.clone())
    }

    fn start_capture(
        &mut self,
        device: &str,
        looping: bool,
        buffer_seconds: u32,
        sample_rate: u32,
    ) -> Result<Box<dyn SpectrumSource>> {
        if self.fail_start {
            bail!("device busy");
        }
        self.started
            .push((device.to_string(), looping, buffer_seconds, sample_rate));
        Ok(Box::new(ScriptedSource::stereo(Vec::new(), Vec::new())))
    }
}
