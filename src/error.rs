use thiserror::Error;

/// Failures that keep the spectrogram from starting.
#[derive(Debug, Error)]
pub enum SpectrogramError {
    #[error("no audio input device detected")]
    NoInputDevice,

    #[error("failed to start capture on '{device}': {reason}")]
    DeviceStart { device: String, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
