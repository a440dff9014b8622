mod capture;
mod fft;
#[cfg(feature = "pulse")]
mod pulse;
mod tone;
mod window;

#[cfg(feature = "pulse")]
pub use pulse::PulseInput;
pub use tone::ToneInput;
pub use window::WindowFunction;

use anyhow::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// A running recording that answers spectrum queries from its newest samples.
pub trait SpectrumSource {
    fn channels(&self) -> usize;

    /// Frame offset of the recorder's next write. Zero until audio arrives.
    fn write_position(&self) -> usize;

    /// Fill `out` with `out.len()` magnitude bins for `channel`.
    fn spectrum(&mut self, channel: usize, window: WindowFunction, out: &mut [f32]);
}

/// Platform capture capability: enumerate devices and start recording.
pub trait AudioInput {
    fn list_devices(&self) -> Result<Vec<String>>;

    fn start_capture(
        &mut self,
        device: &str,
        looping: bool,
        buffer_seconds: u32,
        sample_rate: u32,
    ) -> Result<Box<dyn SpectrumSource>>;
}

/// Which capture backend feeds the spectrogram
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Pulse,
    Tone,
}

/// Build the input for `kind`.
pub fn open_input(kind: SourceKind) -> Result<Box<dyn AudioInput>> {
    match kind {
        #[cfg(feature = "pulse")]
        SourceKind::Pulse => Ok(Box::new(PulseInput)),
        #[cfg(not(feature = "pulse"))]
        SourceKind::Pulse => Err(anyhow::anyhow!(
            "PulseAudio support not compiled in; rebuild with --features pulse or use --source tone"
        )),
        SourceKind::Tone => Ok(Box::new(ToneInput::default())),
    }
}

/// Pick a device by keyword priority.
///
/// The first priority matching any candidate (case-insensitive substring)
/// wins; otherwise the first candidate. The flag tells whether a priority
/// matched. `None` only when there are no candidates.
pub fn select_by_priority<'a>(
    candidates: &'a [String],
    priorities: &[String],
) -> Option<(&'a str, bool)> {
    for priority in priorities {
        let needle = priority.to_lowercase();
        if let Some(found) = candidates
            .iter()
            .find(|candidate| candidate.to_lowercase().contains(&needle))
        {
            return Some((found.as_str(), true));
        }
    }
    candidates.first().map(|first| (first.as_str(), false))
}
