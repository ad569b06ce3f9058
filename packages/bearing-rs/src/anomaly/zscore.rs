use super::AnomalyDetector;
use crate::error::{Result, SignalError};
use crate::types::DetectionResult;
use serde::{Deserialize, Serialize};

/// Configuration for the z-score detector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ZScoreConfig {
    /// Absolute z-score above which a sample is anomalous
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_threshold() -> f64 {
    3.0
}

impl Default for ZScoreConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
        }
    }
}

/// Flags samples whose absolute z-score exceeds a fixed threshold
#[derive(Debug, Clone)]
pub struct ZScoreDetector {
    config: ZScoreConfig,
}

impl ZScoreDetector {
    pub fn new(config: ZScoreConfig) -> Result<Self> {
        if !config.threshold.is_finite() || config.threshold <= 0.0 {
            return Err(SignalError::InvalidDetectorConfig(format!(
                "z-score threshold must be positive, got {}",
                config.threshold
            )));
        }
        Ok(Self { config })
    }
}

impl AnomalyDetector for ZScoreDetector {
    fn name(&self) -> &'static str {
        "zscore"
    }

    fn detect(&self, samples: &[f64]) -> Result<DetectionResult> {
        let n = samples.len();
        if n < 2 {
            return Err(SignalError::InsufficientSamples { len: n, required: 2 });
        }

        let mean = samples.iter().sum::<f64>() / n as f64;
        let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
        let std = variance.sqrt();

        // A flat signal has no outliers
        let scores: Vec<f64> = if std > 0.0 {
            samples.iter().map(|x| ((x - mean) / std).abs()).collect()
        } else {
            vec![0.0; n]
        };
        let mask: Vec<bool> = scores.iter().map(|&z| z > self.config.threshold).collect();
        let n_anomalies = mask.iter().filter(|&&m| m).count();

        Ok(DetectionResult {
            mask,
            scores,
            threshold: Some(self.config.threshold),
            n_anomalies,
        })
    }
}
