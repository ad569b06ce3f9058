//! Zero-Phase Filtering
//!
//! Forward-backward IIR filtering: the signal is filtered once forward, the
//! result is time-reversed and filtered again, then reversed back. The phase
//! lag of the first pass is cancelled by the second.
//!
//! Edge transients are reduced by odd-reflection padding of `3 * taps`
//! samples at each end and by starting each pass from the filter's
//! steady-state initial conditions.

use crate::error::{Result, SignalError};
use crate::types::FilterCoefficients;
use nalgebra::{DMatrix, DVector};

/// Applies a coefficient set forward and backward
#[derive(Debug, Clone)]
pub struct ZeroPhaseFilter {
    b: Vec<f64>,
    a: Vec<f64>,
    zi: Vec<f64>,
}

impl ZeroPhaseFilter {
    pub fn new(coeffs: &FilterCoefficients) -> Result<Self> {
        let taps = coeffs.taps();
        if taps < 2 || coeffs.a.is_empty() || coeffs.a[0] == 0.0 {
            return Err(SignalError::InvalidFilterSpec(
                "coefficient vectors must have at least two taps and a non-zero a[0]".to_string(),
            ));
        }

        // Equalize lengths and normalize so a[0] == 1
        let a0 = coeffs.a[0];
        let mut b: Vec<f64> = coeffs.b.iter().map(|v| v / a0).collect();
        let mut a: Vec<f64> = coeffs.a.iter().map(|v| v / a0).collect();
        b.resize(taps, 0.0);
        a.resize(taps, 0.0);

        let zi = steady_state_zi(&b, &a)?;
        Ok(Self { b, a, zi })
    }

    /// Samples of odd-reflection padding added at each end
    pub fn padlen(&self) -> usize {
        3 * self.b.len()
    }

    /// Minimum signal length this filter accepts
    pub fn min_len(&self) -> usize {
        self.padlen() + 1
    }

    /// Filter `signal` with zero phase distortion, returning a new vector
    pub fn apply(&self, signal: &[f64]) -> Result<Vec<f64>> {
        let padlen = self.padlen();
        if signal.len() <= padlen {
            return Err(SignalError::SignalTooShort {
                len: signal.len(),
                required: self.min_len(),
            });
        }

        let extended = odd_extend(signal, padlen);

        // Forward pass
        let x0 = extended[0];
        let mut state: Vec<f64> = self.zi.iter().map(|z| z * x0).collect();
        let mut forward = self.lfilter(&extended, &mut state);

        // Backward pass over the reversed forward output
        forward.reverse();
        let y0 = forward[0];
        let mut state: Vec<f64> = self.zi.iter().map(|z| z * y0).collect();
        let mut backward = self.lfilter(&forward, &mut state);
        backward.reverse();

        Ok(backward[padlen..backward.len() - padlen].to_vec())
    }

    /// Direct Form II Transposed filtering with explicit state
    fn lfilter(&self, input: &[f64], state: &mut [f64]) -> Vec<f64> {
        let order = state.len();
        let mut output = Vec::with_capacity(input.len());

        for &x in input {
            let y = self.b[0] * x + state[0];
            for i in 0..order - 1 {
                state[i] = self.b[i + 1] * x + state[i + 1] - self.a[i + 1] * y;
            }
            state[order - 1] = self.b[order] * x - self.a[order] * y;
            output.push(y);
        }

        output
    }
}

/// Steady-state initial conditions for a unit step input.
///
/// Solves `(I - C^T) zi = b[1..] - a[1..] * b[0]`, where `C` is the
/// companion matrix of `a`.
fn steady_state_zi(b: &[f64], a: &[f64]) -> Result<Vec<f64>> {
    let n = a.len() - 1;

    let system = DMatrix::from_fn(n, n, |row, col| {
        // C^T has -a[1..] down the first column and ones on the superdiagonal
        let companion_t = if col == 0 {
            -a[row + 1]
        } else if col == row + 1 {
            1.0
        } else {
            0.0
        };
        let identity = if row == col { 1.0 } else { 0.0 };
        identity - companion_t
    });
    let rhs = DVector::from_fn(n, |i, _| b[i + 1] - a[i + 1] * b[0]);

    let zi = system.lu().solve(&rhs).ok_or_else(|| {
        SignalError::InvalidFilterSpec(
            "steady-state initial conditions are singular".to_string(),
        )
    })?;

    Ok(zi.iter().copied().collect())
}

/// Extend `signal` by `padlen` samples of odd reflection about each endpoint
fn odd_extend(signal: &[f64], padlen: usize) -> Vec<f64> {
    let n = signal.len();
    let first = signal[0];
    let last = signal[n - 1];

    let mut extended = Vec::with_capacity(n + 2 * padlen);
    extended.extend((1..=padlen).rev().map(|i| 2.0 * first - signal[i]));
    extended.extend_from_slice(signal);
    extended.extend((1..=padlen).map(|i| 2.0 * last - signal[n - 1 - i]));
    extended
}
