use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SignalError {
    #[error("Invalid filter spec: {0}")]
    InvalidFilterSpec(String),

    #[error("Signal too short for filter: {len} samples, need at least {required}")]
    SignalTooShort { len: usize, required: usize },

    #[error("Invalid window config: nperseg={nperseg}, noverlap={noverlap}, signal length={len}")]
    InvalidWindowConfig {
        nperseg: usize,
        noverlap: usize,
        len: usize,
    },

    #[error("Insufficient samples: {len} samples, need at least {required}")]
    InsufficientSamples { len: usize, required: usize },

    #[error("Invalid detector config: {0}")]
    InvalidDetectorConfig(String),

    #[error("Invalid channel map: {0}")]
    InvalidChannelMap(String),
}

impl SignalError {
    /// Short machine-readable kind, used in serialized failure reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidFilterSpec(_) => "invalid_filter_spec",
            Self::SignalTooShort { .. } => "signal_too_short",
            Self::InvalidWindowConfig { .. } => "invalid_window_config",
            Self::InsufficientSamples { .. } => "insufficient_samples",
            Self::InvalidDetectorConfig(_) => "invalid_detector_config",
            Self::InvalidChannelMap(_) => "invalid_channel_map",
        }
    }
}

pub type Result<T> = std::result::Result<T, SignalError>;
