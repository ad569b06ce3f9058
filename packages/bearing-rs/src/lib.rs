//! Signal conditioning and anomaly scoring for multichannel bearing sensor data.
//!
//! Each channel runs through a zero-phase Butterworth bandpass, an FFT
//! magnitude spectrum, a spectrogram and an anomaly detector. See
//! [`PipelineOrchestrator`] for the end-to-end entry point.

pub mod anomaly;
pub mod error;
pub mod pipeline;
pub mod signal_processing;
pub mod types;

pub use anomaly::{
    AnomalyDetector, IsolationForest, IsolationForestConfig, IsolationForestDetector,
    ZScoreConfig, ZScoreDetector,
};
pub use error::{Result, SignalError};
pub use pipeline::{
    analyze_channels, BandpassConfig, ChannelFailure, DetectorConfig, DetectorKind,
    PipelineConfig, PipelineOrchestrator, PipelineOutput, SpectrogramConfig, Stage,
};
pub use signal_processing::{
    butter_bandpass, FilterDesigner, SpectralAnalyzer, SpectrogramAnalyzer, ZeroPhaseFilter,
};
pub use types::*;
