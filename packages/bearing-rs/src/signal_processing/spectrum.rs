//! FFT magnitude spectrum

use crate::error::{Result, SignalError};
use crate::types::SpectrumResult;
use rustfft::{num_complex::Complex, FftPlanner};

/// One-sided FFT magnitude spectrum with a rectangular window
#[derive(Debug, Clone, Copy)]
pub struct SpectralAnalyzer {
    sample_rate: f64,
}

impl SpectralAnalyzer {
    pub fn new(sample_rate: f64) -> Self {
        Self { sample_rate }
    }

    /// Magnitudes `|X[k]|` and frequencies `k * fs / N` for `k` in `[0, N/2)`.
    ///
    /// The transform runs at the signal's own length (no zero padding).
    pub fn analyze(&self, signal: &[f64]) -> Result<SpectrumResult> {
        let n = signal.len();
        if n == 0 {
            return Err(SignalError::InsufficientSamples { len: 0, required: 1 });
        }

        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(n);

        let mut buffer: Vec<Complex<f64>> =
            signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
        fft.process(&mut buffer);

        let half = n / 2;
        let resolution = self.sample_rate / n as f64;

        Ok(SpectrumResult {
            frequencies: (0..half).map(|k| k as f64 * resolution).collect(),
            amplitudes: buffer[..half].iter().map(|c| c.norm()).collect(),
        })
    }
}
