//! Anomaly detection module
//!
//! Per-channel detectors producing a boolean mask plus per-sample scores:
//! - Isolation Forest (randomized tree ensemble, contamination threshold)
//! - Z-score (fixed absolute threshold)

mod isolation_forest;
mod zscore;

pub use isolation_forest::{
    average_path_length, IsolationForest, IsolationForestConfig, IsolationForestDetector,
    IsolationTree, Node,
};
pub use zscore::{ZScoreConfig, ZScoreDetector};

use crate::error::Result;
use crate::types::{AnomalyMask, DetectionResult};

/// A detector applied to a single channel
pub trait AnomalyDetector: Send + Sync {
    fn name(&self) -> &'static str;

    fn detect(&self, samples: &[f64]) -> Result<DetectionResult>;
}

/// Derive an independent seed for stream `stream` from `root` (SplitMix64)
pub fn derive_seed(root: u64, stream: u64) -> u64 {
    let mut z = root
        .wrapping_add(stream.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Mark the `k` highest scores; ties go to the lower index.
/// Returns the mask and the lowest flagged score.
pub(crate) fn top_k_mask(scores: &[f64], k: usize) -> (AnomalyMask, Option<f64>) {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&i, &j| scores[j].total_cmp(&scores[i]).then(i.cmp(&j)));

    let mut mask = vec![false; scores.len()];
    for &i in order.iter().take(k) {
        mask[i] = true;
    }
    let threshold = k
        .checked_sub(1)
        .and_then(|last| order.get(last))
        .map(|&i| scores[i]);
    (mask, threshold)
}
