use crate::cli::{DetectorArg, PipelineArgs};
use bearing_rs::{DetectorKind, PipelineConfig};
use std::path::Path;

/// Load a JSON pipeline configuration file.
pub fn load_config_file(path: &str) -> Result<PipelineConfig, String> {
    let p = Path::new(path);
    if !p.exists() {
        return Err(format!("Config file not found: {}", path));
    }
    let text = std::fs::read_to_string(p)
        .map_err(|e| format!("Failed to read config file '{}': {}", path, e))?;
    serde_json::from_str(&text).map_err(|e| format!("Invalid config file '{}': {}", path, e))
}

/// Build the effective configuration.
///
/// Precedence: command-line flag, then the input file's sample rate, then the
/// config file, then built-in defaults.
pub fn resolve_config(
    args: &PipelineArgs,
    input_sample_rate: Option<f64>,
) -> Result<PipelineConfig, String> {
    let mut config = match &args.config {
        Some(path) => load_config_file(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(sr) = args.sr.or(input_sample_rate) {
        config.sample_rate = sr;
    }
    if let Some(order) = args.order {
        config.filter.order = order;
    }
    if let Some(low) = args.low {
        config.filter.low_hz = low;
    }
    if let Some(high) = args.high {
        config.filter.high_hz = high;
    }
    if let Some(nperseg) = args.nperseg {
        config.spectrogram.nperseg = nperseg;
    }
    if let Some(noverlap) = args.noverlap {
        config.spectrogram.noverlap = noverlap;
    }
    if let Some(detector) = args.detector {
        config.detector.kind = match detector {
            DetectorArg::IsolationForest => DetectorKind::IsolationForest,
            DetectorArg::Zscore => DetectorKind::ZScore,
        };
    }

    let forest = &mut config.detector.isolation_forest;
    if let Some(trees) = args.trees {
        forest.n_trees = trees;
    }
    if let Some(subsample) = args.subsample {
        forest.subsample_size = subsample;
    }
    if let Some(contamination) = args.contamination {
        forest.contamination = contamination;
    }
    if let Some(seed) = args.seed {
        forest.seed = seed;
    }
    if let Some(threshold) = args.z_threshold {
        config.detector.zscore.threshold = threshold;
    }

    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}
