//! Short-Time Spectral Analysis
//!
//! Splits the signal into overlapping segments, removes each segment's mean,
//! applies a periodic Tukey window (shape 0.25) and computes a one-sided
//! power spectral density per segment. Samples after the last full segment
//! are dropped; the signal is never padded.

use crate::error::{Result, SignalError};
use crate::types::SpectrogramResult;
use rustfft::{num_complex::Complex, FftPlanner};
use std::f64::consts::PI;

/// Tukey taper fraction
pub const TUKEY_ALPHA: f64 = 0.25;

/// Windowed short-time PSD
#[derive(Debug, Clone)]
pub struct SpectrogramAnalyzer {
    sample_rate: f64,
    nperseg: usize,
    noverlap: usize,
    window: Vec<f64>,
}

impl SpectrogramAnalyzer {
    pub fn new(sample_rate: f64, nperseg: usize, noverlap: usize) -> Self {
        Self {
            sample_rate,
            nperseg,
            noverlap,
            window: tukey_periodic(nperseg, TUKEY_ALPHA),
        }
    }

    /// Number of full segments that fit in `len` samples
    pub fn segment_count(&self, len: usize) -> Result<usize> {
        self.check(len)?;
        Ok((len - self.nperseg) / self.step() + 1)
    }

    fn step(&self) -> usize {
        self.nperseg - self.noverlap
    }

    fn check(&self, len: usize) -> Result<()> {
        if self.nperseg == 0 || self.noverlap >= self.nperseg || self.nperseg > len {
            return Err(SignalError::InvalidWindowConfig {
                nperseg: self.nperseg,
                noverlap: self.noverlap,
                len,
            });
        }
        Ok(())
    }

    pub fn analyze(&self, signal: &[f64]) -> Result<SpectrogramResult> {
        let columns = self.segment_count(signal.len())?;
        let nfft = self.nperseg;
        let n_freqs = nfft / 2 + 1;
        let step = self.step();

        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(nfft);

        let window_power: f64 = self.window.iter().map(|w| w * w).sum();
        let scale = 1.0 / (self.sample_rate * window_power);

        let mut power = vec![Vec::with_capacity(columns); n_freqs];
        let mut buffer = vec![Complex::new(0.0, 0.0); nfft];

        for col in 0..columns {
            let segment = &signal[col * step..col * step + nfft];
            let mean = segment.iter().sum::<f64>() / nfft as f64;
            for ((slot, &x), &w) in buffer.iter_mut().zip(segment).zip(&self.window) {
                *slot = Complex::new((x - mean) * w, 0.0);
            }
            fft.process(&mut buffer);

            for (k, row) in power.iter_mut().enumerate() {
                let mut value = buffer[k].norm_sqr() * scale;
                // Fold negative frequencies; DC and Nyquist have no mirror
                let is_nyquist = nfft % 2 == 0 && k == nfft / 2;
                if k != 0 && !is_nyquist {
                    value *= 2.0;
                }
                row.push(value);
            }
        }

        let frequencies = (0..n_freqs)
            .map(|k| k as f64 * self.sample_rate / nfft as f64)
            .collect();
        let half = self.nperseg as f64 / 2.0;
        let times = (0..columns)
            .map(|col| (half + (col * step) as f64) / self.sample_rate)
            .collect();

        log::trace!(
            "Spectrogram: {} samples -> {} freqs x {} segments",
            signal.len(),
            n_freqs,
            columns
        );

        Ok(SpectrogramResult {
            frequencies,
            times,
            power,
        })
    }
}

/// Periodic (DFT-even) Tukey window of length `m`
pub fn tukey_periodic(m: usize, alpha: f64) -> Vec<f64> {
    if m == 0 {
        return Vec::new();
    }
    let mut w = tukey_symmetric(m + 1, alpha);
    w.truncate(m);
    w
}

/// Symmetric Tukey (tapered cosine) window of length `m`
pub fn tukey_symmetric(m: usize, alpha: f64) -> Vec<f64> {
    if m <= 1 {
        return vec![1.0; m];
    }
    if alpha <= 0.0 {
        return vec![1.0; m];
    }
    let span = (m - 1) as f64;
    if alpha >= 1.0 {
        return (0..m)
            .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / span).cos())
            .collect();
    }

    let width = (alpha * span / 2.0).floor() as usize;
    (0..m)
        .map(|i| {
            let n = i as f64;
            if i <= width {
                0.5 * (1.0 + (PI * (-1.0 + 2.0 * n / alpha / span)).cos())
            } else if i < m - width - 1 {
                1.0
            } else {
                0.5 * (1.0 + (PI * (-2.0 / alpha + 1.0 + 2.0 * n / alpha / span)).cos())
            }
        })
        .collect()
}
