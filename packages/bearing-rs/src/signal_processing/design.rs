//! Butterworth Bandpass Design
//!
//! Designs digital Butterworth bandpass filters in transfer-function form via
//! the bilinear transform:
//! 1. Analog lowpass prototype poles on the unit circle
//! 2. Pre-warping of both band edges
//! 3. Lowpass-to-bandpass transform in the analog domain
//! 4. Bilinear transform to the z-plane
//!
//! Designed coefficients are cached per distinct [`FilterSpec`] so that
//! channel workers running in parallel share a single design.

use crate::error::{Result, SignalError};
use crate::types::{FilterCoefficients, FilterSpec};
use parking_lot::RwLock;
use rustfft::num_complex::Complex;
use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::Arc;

/// Bilinear transform constant for normalized frequencies (`2 * fs` with `fs = 2`)
const BILINEAR_FS2: f64 = 4.0;

/// Cache key built from the exact bit patterns of a spec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SpecKey {
    order: usize,
    low: u64,
    high: u64,
    sample_rate: u64,
}

impl From<&FilterSpec> for SpecKey {
    fn from(spec: &FilterSpec) -> Self {
        Self {
            order: spec.order,
            low: spec.low_hz.to_bits(),
            high: spec.high_hz.to_bits(),
            sample_rate: spec.sample_rate.to_bits(),
        }
    }
}

/// Butterworth bandpass designer with a coefficient cache
#[derive(Debug, Default)]
pub struct FilterDesigner {
    cache: RwLock<HashMap<SpecKey, Arc<FilterCoefficients>>>,
}

impl FilterDesigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Design (or fetch from cache) the coefficients for `spec`
    pub fn design(&self, spec: &FilterSpec) -> Result<Arc<FilterCoefficients>> {
        let key = SpecKey::from(spec);
        if let Some(coeffs) = self.cache.read().get(&key) {
            return Ok(Arc::clone(coeffs));
        }

        let coeffs = Arc::new(butter_bandpass(spec)?);
        log::debug!(
            "Designed order-{} bandpass {}-{} Hz at {} Hz ({} taps)",
            spec.order,
            spec.low_hz,
            spec.high_hz,
            spec.sample_rate,
            coeffs.taps()
        );

        let mut cache = self.cache.write();
        Ok(Arc::clone(cache.entry(key).or_insert(coeffs)))
    }

    /// Number of distinct specs designed so far
    pub fn cached_designs(&self) -> usize {
        self.cache.read().len()
    }
}

/// Design a digital Butterworth bandpass filter.
///
/// The analog prototype of order `n` yields a digital transfer function of
/// degree `2n`, so both returned vectors have `2n + 1` entries.
pub fn butter_bandpass(spec: &FilterSpec) -> Result<FilterCoefficients> {
    spec.validate()?;

    let n = spec.order;
    let nyquist = spec.nyquist();

    // Analog prototype: n poles on the left half of the unit circle, no zeros
    let prototype_poles: Vec<Complex<f64>> = (0..n)
        .map(|i| {
            let m = 2.0 * i as f64 - (n as f64 - 1.0);
            -Complex::from_polar(1.0, PI * m / (2.0 * n as f64))
        })
        .collect();

    let warped_low = prewarp(spec.low_hz / nyquist);
    let warped_high = prewarp(spec.high_hz / nyquist);
    let bandwidth = warped_high - warped_low;
    let center_sq = warped_low * warped_high;

    // Lowpass -> bandpass: each prototype pole splits into two
    let mut analog_poles = Vec::with_capacity(2 * n);
    let scaled: Vec<Complex<f64>> = prototype_poles
        .iter()
        .map(|&p| p * (bandwidth / 2.0))
        .collect();
    for &p in &scaled {
        analog_poles.push(p + (p * p - center_sq).sqrt());
    }
    for &p in &scaled {
        analog_poles.push(p - (p * p - center_sq).sqrt());
    }
    let analog_zeros = vec![Complex::new(0.0, 0.0); n];
    let analog_gain = bandwidth.powi(n as i32);

    // Bilinear transform
    let digital_poles: Vec<Complex<f64>> = analog_poles.iter().map(|&p| bilinear(p)).collect();
    let mut digital_zeros: Vec<Complex<f64>> = analog_zeros.iter().map(|&z| bilinear(z)).collect();
    let degree = analog_poles.len() - analog_zeros.len();
    digital_zeros.extend(std::iter::repeat(Complex::new(-1.0, 0.0)).take(degree));

    let zero_term: Complex<f64> = analog_zeros
        .iter()
        .map(|&z| Complex::new(BILINEAR_FS2, 0.0) - z)
        .product();
    let pole_term: Complex<f64> = analog_poles
        .iter()
        .map(|&p| Complex::new(BILINEAR_FS2, 0.0) - p)
        .product();
    let digital_gain = analog_gain * (zero_term / pole_term).re;

    let b: Vec<f64> = poly(&digital_zeros)
        .into_iter()
        .map(|c| c.re * digital_gain)
        .collect();
    let a: Vec<f64> = poly(&digital_poles).into_iter().map(|c| c.re).collect();

    normalize(b, a)
}

/// Pre-warp a normalized frequency (1.0 = Nyquist) for the bilinear transform
fn prewarp(normalized: f64) -> f64 {
    BILINEAR_FS2 * (PI * normalized / 2.0).tan()
}

fn bilinear(s: Complex<f64>) -> Complex<f64> {
    (BILINEAR_FS2 + s) / (BILINEAR_FS2 - s)
}

/// Expand roots into monic polynomial coefficients, highest power first
fn poly(roots: &[Complex<f64>]) -> Vec<Complex<f64>> {
    let mut coeffs = vec![Complex::new(1.0, 0.0)];
    for &root in roots {
        let mut next = vec![Complex::new(0.0, 0.0); coeffs.len() + 1];
        for (i, &c) in coeffs.iter().enumerate() {
            next[i] += c;
            next[i + 1] -= c * root;
        }
        coeffs = next;
    }
    coeffs
}

/// Scale both vectors so that `a[0] == 1`
fn normalize(b: Vec<f64>, a: Vec<f64>) -> Result<FilterCoefficients> {
    let a0 = a[0];
    if a0 == 0.0 || !a0.is_finite() {
        return Err(SignalError::InvalidFilterSpec(
            "leading feedback coefficient is zero".to_string(),
        ));
    }
    Ok(FilterCoefficients {
        b: b.into_iter().map(|v| v / a0).collect(),
        a: a.into_iter().map(|v| v / a0).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const REF_B: [f64; 9] = [
        0.01856301062689718,
        0.0,
        -0.07425204250758873,
        0.0,
        0.1113780637613831,
        0.0,
        -0.07425204250758873,
        0.0,
        0.01856301062689718,
    ];
    const REF_A: [f64; 9] = [
        1.0,
        -4.420693558001915,
        9.119788708175781,
        -11.63477329536695,
        10.1194920656412,
        -6.116683968546442,
        2.4909756129446885,
        -0.6263060211119962,
        0.07619706461033243,
    ];

    #[test]
    fn test_reference_coefficients() {
        let coeffs = butter_bandpass(&FilterSpec::new(4, 500.0, 2000.0, 10000.0)).unwrap();
        assert_eq!(coeffs.b.len(), 9);
        assert_eq!(coeffs.a.len(), 9);
        for (got, want) in coeffs.b.iter().zip(REF_B.iter()) {
            assert!((got - want).abs() < 1e-9, "b: got {}, want {}", got, want);
        }
        for (got, want) in coeffs.a.iter().zip(REF_A.iter()) {
            assert!((got - want).abs() < 1e-9, "a: got {}, want {}", got, want);
        }
    }

    #[test]
    fn test_second_order_reference() {
        let coeffs = butter_bandpass(&FilterSpec::new(2, 10.0, 50.0, 1000.0)).unwrap();
        let ref_b = [0.013359200027856498, 0.0, -0.026718400055712997, 0.0, 0.013359200027856498];
        let ref_a = [
            1.0,
            -3.611329851485927,
            4.92981059433737,
            -3.019048982950716,
            0.7008967811884027,
        ];
        for (got, want) in coeffs.b.iter().zip(ref_b.iter()) {
            assert!((got - want).abs() < 1e-9);
        }
        for (got, want) in coeffs.a.iter().zip(ref_a.iter()) {
            assert!((got - want).abs() < 1e-9);
        }
    }

    #[test]
    fn test_leading_feedback_is_one() {
        for order in 1..=8 {
            let coeffs = butter_bandpass(&FilterSpec::new(order, 100.0, 300.0, 2000.0)).unwrap();
            assert_eq!(coeffs.a[0], 1.0);
            assert_eq!(coeffs.a.len(), coeffs.order() + 1);
            assert_eq!(coeffs.b.len(), coeffs.order() + 1);
            assert_eq!(coeffs.order(), 2 * order);
        }
    }

    #[test]
    fn test_unity_gain_at_center() {
        // |H(e^jw)| at the geometric centre of the warped band is 1 for Butterworth
        let spec = FilterSpec::new(4, 500.0, 2000.0, 10000.0);
        let coeffs = butter_bandpass(&spec).unwrap();
        let wl = (PI * 500.0 / 10000.0).tan();
        let wh = (PI * 2000.0 / 10000.0).tan();
        let w = 2.0 * (wl * wh).sqrt().atan();
        let eval = |c: &[f64]| -> Complex<f64> {
            c.iter()
                .enumerate()
                .map(|(k, &v)| Complex::from_polar(v, -w * k as f64))
                .sum()
        };
        let gain = (eval(&coeffs.b) / eval(&coeffs.a)).norm();
        assert!((gain - 1.0).abs() < 1e-9, "gain at centre = {}", gain);
    }

    #[test]
    fn test_invalid_specs() {
        let bad = [
            FilterSpec::new(4, -1.0, 2000.0, 10000.0),
            FilterSpec::new(4, 2000.0, 2000.0, 10000.0),
            FilterSpec::new(4, 500.0, 6000.0, 10000.0),
            FilterSpec::new(0, 500.0, 2000.0, 10000.0),
        ];
        for spec in &bad {
            assert!(matches!(
                butter_bandpass(spec),
                Err(SignalError::InvalidFilterSpec(_))
            ));
        }
    }

    #[test]
    fn test_designer_caches_per_spec() {
        let designer = FilterDesigner::new();
        let spec = FilterSpec::new(4, 500.0, 2000.0, 10000.0);
        let first = designer.design(&spec).unwrap();
        let second = designer.design(&spec).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(designer.cached_designs(), 1);

        designer
            .design(&FilterSpec::new(2, 500.0, 2000.0, 10000.0))
            .unwrap();
        assert_eq!(designer.cached_designs(), 2);
    }
}
