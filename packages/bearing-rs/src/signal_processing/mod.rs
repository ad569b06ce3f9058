//! Signal Processing Module
//!
//! Conditioning and spectral transforms for sensor channels:
//! - Butterworth bandpass design (transfer-function form, cached per spec)
//! - Zero-phase forward-backward filtering
//! - One-sided FFT magnitude spectra
//! - Short-time power spectral density (spectrogram)

mod design;
mod filtfilt;
mod spectrogram;
mod spectrum;

pub use design::{butter_bandpass, FilterDesigner};
pub use filtfilt::ZeroPhaseFilter;
pub use spectrogram::{tukey_periodic, tukey_symmetric, SpectrogramAnalyzer, TUKEY_ALPHA};
pub use spectrum::SpectralAnalyzer;
