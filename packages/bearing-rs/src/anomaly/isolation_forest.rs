//! Isolation Forest
//!
//! Unsupervised anomaly scoring by random recursive partitioning. Points that
//! are easy to isolate (short average path from root to leaf) score close
//! to 1; typical points score around 0.5 or below.
//!
//! Trees are stored as node arenas indexed by `usize` ids. Each tree draws
//! from its own `StdRng`, seeded from a value taken sequentially from the
//! root generator, so parallel construction reproduces the sequential result.

use super::{AnomalyDetector, top_k_mask};
use crate::error::{Result, SignalError};
use crate::types::DetectionResult;
use ndarray::{ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

const EULER_GAMMA: f64 = 0.5772156649;

/// Expected path length of an unsuccessful search in a BST of `n` points
pub fn average_path_length(n: usize) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    let n = n as f64;
    2.0 * harmonic(n - 1.0) - 2.0 * (n - 1.0) / n
}

fn harmonic(i: f64) -> f64 {
    i.ln() + EULER_GAMMA
}

/// Configuration for the isolation forest detector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IsolationForestConfig {
    /// Number of trees in the ensemble
    #[serde(default = "default_n_trees")]
    pub n_trees: usize,

    /// Points drawn per tree; clamped to the sample count
    #[serde(default = "default_subsample_size")]
    pub subsample_size: usize,

    /// Expected fraction of anomalous samples
    #[serde(default = "default_contamination")]
    pub contamination: f64,

    /// Root seed for every random draw
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_n_trees() -> usize {
    100
}
fn default_subsample_size() -> usize {
    256
}
fn default_contamination() -> f64 {
    0.01
}
fn default_seed() -> u64 {
    42
}

impl Default for IsolationForestConfig {
    fn default() -> Self {
        Self {
            n_trees: default_n_trees(),
            subsample_size: default_subsample_size(),
            contamination: default_contamination(),
            seed: default_seed(),
        }
    }
}

impl IsolationForestConfig {
    pub fn validate(&self) -> Result<()> {
        if self.n_trees == 0 {
            return Err(SignalError::InvalidDetectorConfig(
                "ensemble size must be positive".to_string(),
            ));
        }
        if self.subsample_size < 2 {
            return Err(SignalError::InvalidDetectorConfig(format!(
                "subsample size must be at least 2, got {}",
                self.subsample_size
            )));
        }
        if !(0.0..=0.5).contains(&self.contamination) {
            return Err(SignalError::InvalidDetectorConfig(format!(
                "contamination must be in [0, 0.5], got {}",
                self.contamination
            )));
        }
        Ok(())
    }
}

/// A node of an isolation tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Internal {
        feature: usize,
        split: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        size: usize,
        depth: usize,
    },
}

/// Binary partition of a subsample, stored as an arena rooted at id 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    /// Grow a tree over the rows of `data` listed in `indices`
    pub fn build(
        data: &ArrayView2<f64>,
        indices: Vec<usize>,
        max_depth: usize,
        rng: &mut StdRng,
    ) -> Self {
        let n_features = data.ncols();
        let mut nodes = vec![Node::Leaf { size: 0, depth: 0 }];
        let mut pending = vec![(0usize, indices, 0usize)];

        while let Some((id, subset, depth)) = pending.pop() {
            if subset.len() <= 1 || depth >= max_depth {
                nodes[id] = Node::Leaf {
                    size: subset.len(),
                    depth,
                };
                continue;
            }

            let feature = rng.gen_range(0..n_features);
            let (min, max) = subset
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
                    let v = data[[i, feature]];
                    (lo.min(v), hi.max(v))
                });
            if min >= max {
                // Every remaining value is identical; nothing left to separate
                nodes[id] = Node::Leaf {
                    size: subset.len(),
                    depth,
                };
                continue;
            }

            let split = draw_split(rng, min, max);
            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
                subset.into_iter().partition(|&i| data[[i, feature]] < split);

            let left = nodes.len();
            let right = left + 1;
            nodes.push(Node::Leaf { size: 0, depth: depth + 1 });
            nodes.push(Node::Leaf { size: 0, depth: depth + 1 });
            nodes[id] = Node::Internal {
                feature,
                split,
                left,
                right,
            };

            // Right is pushed first so the left subtree is grown first
            pending.push((right, right_rows, depth + 1));
            pending.push((left, left_rows, depth + 1));
        }

        Self { nodes }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Depth of the leaf reached by `point` plus the size correction `c(size)`
    pub fn path_length(&self, point: &ArrayView1<f64>) -> f64 {
        let mut id = 0;
        loop {
            match self.nodes[id] {
                Node::Internal {
                    feature,
                    split,
                    left,
                    right,
                } => {
                    id = if point[feature] < split { left } else { right };
                }
                Node::Leaf { size, depth } => {
                    return depth as f64 + average_path_length(size);
                }
            }
        }
    }
}

/// Uniform split in `[min, max)`. Stays finite when `max - min` overflows.
fn draw_split(rng: &mut StdRng, min: f64, max: f64) -> f64 {
    let u: f64 = rng.gen();
    let span = max - min;
    let split = if span.is_finite() {
        min + u * span
    } else {
        min * (1.0 - u) + max * u
    };
    if (min..max).contains(&split) {
        split
    } else {
        min
    }
}

/// Fitted ensemble of isolation trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    subsample_size: usize,
}

impl IsolationForest {
    /// Fit `n_trees` trees on the rows of `data`
    pub fn fit(data: &ArrayView2<f64>, config: &IsolationForestConfig) -> Result<Self> {
        config.validate()?;
        let n = data.nrows();
        if n < 2 {
            return Err(SignalError::InsufficientSamples { len: n, required: 2 });
        }

        let subsample_size = config.subsample_size.min(n);
        let max_depth = (subsample_size as f64).log2().ceil() as usize;

        let mut root = StdRng::seed_from_u64(config.seed);
        let tree_seeds: Vec<u64> = (0..config.n_trees).map(|_| root.gen()).collect();

        let trees = tree_seeds
            .par_iter()
            .map(|&seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                let indices = rand::seq::index::sample(&mut rng, n, subsample_size).into_vec();
                IsolationTree::build(data, indices, max_depth, &mut rng)
            })
            .collect();

        Ok(Self {
            trees,
            subsample_size,
        })
    }

    pub fn trees(&self) -> &[IsolationTree] {
        &self.trees
    }

    pub fn subsample_size(&self) -> usize {
        self.subsample_size
    }

    /// Anomaly score `2^(-E[h(x)] / c(s))` for every row of `data`
    pub fn score_samples(&self, data: &ArrayView2<f64>) -> Vec<f64> {
        let norm = average_path_length(self.subsample_size);
        let n_trees = self.trees.len() as f64;

        (0..data.nrows())
            .into_par_iter()
            .map(|i| {
                let point = data.row(i);
                let total: f64 = self.trees.iter().map(|t| t.path_length(&point)).sum();
                2f64.powf(-(total / n_trees) / norm)
            })
            .collect()
    }
}

/// Per-channel isolation forest with contamination thresholding
#[derive(Debug, Clone)]
pub struct IsolationForestDetector {
    config: IsolationForestConfig,
}

impl IsolationForestDetector {
    pub fn new(config: IsolationForestConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &IsolationForestConfig {
        &self.config
    }

    /// Fit a forest treating each sample as a one-feature point
    pub fn fit(&self, samples: &[f64]) -> Result<IsolationForest> {
        let data = as_column(samples)?;
        IsolationForest::fit(&data, &self.config)
    }
}

impl AnomalyDetector for IsolationForestDetector {
    fn name(&self) -> &'static str {
        "isolation_forest"
    }

    fn detect(&self, samples: &[f64]) -> Result<DetectionResult> {
        let data = as_column(samples)?;
        let forest = IsolationForest::fit(&data, &self.config)?;
        let scores = forest.score_samples(&data);

        let k = ((self.config.contamination * samples.len() as f64).round() as usize)
            .min(samples.len());
        let (mask, threshold) = top_k_mask(&scores, k);

        log::debug!(
            "Isolation forest: {} trees, subsample {}, flagged {}/{}",
            forest.trees().len(),
            forest.subsample_size(),
            k,
            samples.len()
        );

        Ok(DetectionResult {
            mask,
            scores,
            threshold,
            n_anomalies: k,
        })
    }
}

/// View a channel as an `N x 1` feature matrix
fn as_column(samples: &[f64]) -> Result<ArrayView2<'_, f64>> {
    ArrayView2::from_shape((samples.len(), 1), samples)
        .map_err(|e| SignalError::InvalidDetectorConfig(format!("cannot shape samples: {}", e)))
}
