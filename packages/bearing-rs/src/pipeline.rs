//! Analysis Pipeline
//!
//! Orchestrates per-channel processing:
//! 1. Zero-phase bandpass filter
//! 2. FFT magnitude spectrum
//! 3. Spectrogram
//! 4. Anomaly detection
//!
//! Channels are processed in parallel and collected in input order. A failure
//! in one channel is recorded and does not stop the others.

use crate::anomaly::{
    derive_seed, AnomalyDetector, IsolationForestConfig, IsolationForestDetector, ZScoreConfig,
    ZScoreDetector,
};
use crate::error::{Result, SignalError};
use crate::signal_processing::{
    FilterDesigner, SpectralAnalyzer, SpectrogramAnalyzer, ZeroPhaseFilter,
};
use crate::types::{
    AnomalyMask, Channel, ChannelMap, ChannelResults, DetectionResult, FilterSpec,
    SpectrogramResult, SpectrumResult,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Bandpass settings shared by every channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BandpassConfig {
    /// Analog prototype order (typically 2-8)
    #[serde(default = "default_filter_order")]
    pub order: usize,

    /// Low cutoff frequency (Hz)
    #[serde(default = "default_low_hz")]
    pub low_hz: f64,

    /// High cutoff frequency (Hz)
    #[serde(default = "default_high_hz")]
    pub high_hz: f64,
}

fn default_filter_order() -> usize {
    4
}
fn default_low_hz() -> f64 {
    500.0
}
fn default_high_hz() -> f64 {
    2000.0
}

impl Default for BandpassConfig {
    fn default() -> Self {
        Self {
            order: default_filter_order(),
            low_hz: default_low_hz(),
            high_hz: default_high_hz(),
        }
    }
}

impl BandpassConfig {
    pub fn to_spec(&self, sample_rate: f64) -> FilterSpec {
        FilterSpec::new(self.order, self.low_hz, self.high_hz, sample_rate)
    }
}

/// Spectrogram segmentation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpectrogramConfig {
    /// Samples per segment
    #[serde(default = "default_nperseg")]
    pub nperseg: usize,

    /// Samples shared by consecutive segments
    #[serde(default = "default_noverlap")]
    pub noverlap: usize,
}

fn default_nperseg() -> usize {
    256
}
fn default_noverlap() -> usize {
    128
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        Self {
            nperseg: default_nperseg(),
            noverlap: default_noverlap(),
        }
    }
}

/// Which detector runs on each filtered channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    #[default]
    IsolationForest,
    #[serde(rename = "zscore")]
    ZScore,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DetectorConfig {
    #[serde(default)]
    pub kind: DetectorKind,

    #[serde(default)]
    pub isolation_forest: IsolationForestConfig,

    #[serde(default)]
    pub zscore: ZScoreConfig,
}

/// Configuration for the whole pipeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// Sampling rate shared by all channels (Hz)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f64,

    #[serde(default)]
    pub filter: BandpassConfig,

    #[serde(default)]
    pub spectrogram: SpectrogramConfig,

    #[serde(default)]
    pub detector: DetectorConfig,
}

fn default_sample_rate() -> f64 {
    20_000.0
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            filter: BandpassConfig::default(),
            spectrogram: SpectrogramConfig::default(),
            detector: DetectorConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Check every setting that does not depend on channel length
    pub fn validate(&self) -> Result<()> {
        self.filter_spec().validate()?;

        let sg = &self.spectrogram;
        if sg.nperseg == 0 || sg.noverlap >= sg.nperseg {
            return Err(SignalError::InvalidWindowConfig {
                nperseg: sg.nperseg,
                noverlap: sg.noverlap,
                len: 0,
            });
        }

        match self.detector.kind {
            DetectorKind::IsolationForest => self.detector.isolation_forest.validate(),
            DetectorKind::ZScore => ZScoreDetector::new(self.detector.zscore.clone()).map(|_| ()),
        }
    }

    pub fn filter_spec(&self) -> FilterSpec {
        self.filter.to_spec(self.sample_rate)
    }
}

/// Pipeline stage at which a channel failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Filter,
    Spectrum,
    Spectrogram,
    Detection,
}

/// A channel that could not be processed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelFailure {
    pub channel: String,
    pub stage: Stage,
    pub error: SignalError,
}

impl std::fmt::Display for ChannelFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "channel '{}' failed at {:?}: {}", self.channel, self.stage, self.error)
    }
}

/// Per-channel results, keyed and ordered as the input map
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub filtered: ChannelResults<Vec<f64>>,
    pub spectra: ChannelResults<SpectrumResult>,
    pub spectrograms: ChannelResults<SpectrogramResult>,
    pub anomalies: ChannelResults<DetectionResult>,
    pub failures: Vec<ChannelFailure>,
    /// Wall-clock processing time in milliseconds
    pub processing_time_ms: f64,
}

impl PipelineOutput {
    pub fn anomaly_mask(&self, channel: &str) -> Option<&AnomalyMask> {
        self.anomalies.get(channel).map(|r| &r.mask)
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

struct ChannelOutput {
    filtered: Vec<f64>,
    spectrum: SpectrumResult,
    spectrogram: SpectrogramResult,
    detection: DetectionResult,
}

/// Runs the per-channel pipeline over a channel map
pub struct PipelineOrchestrator {
    config: PipelineConfig,
    designer: FilterDesigner,
}

impl PipelineOrchestrator {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            designer: FilterDesigner::new(),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process every channel. Only configuration errors abort the run;
    /// per-channel errors are collected in [`PipelineOutput::failures`].
    pub fn run(&self, channels: &ChannelMap) -> Result<PipelineOutput> {
        let start = std::time::Instant::now();

        let coeffs = self.designer.design(&self.config.filter_spec())?;
        let filter = ZeroPhaseFilter::new(&coeffs)?;
        let spectral = SpectralAnalyzer::new(self.config.sample_rate);
        let spectrogram = SpectrogramAnalyzer::new(
            self.config.sample_rate,
            self.config.spectrogram.nperseg,
            self.config.spectrogram.noverlap,
        );

        log::info!(
            "Processing {} channels at {} Hz (bandpass {}-{} Hz, order {})",
            channels.len(),
            self.config.sample_rate,
            self.config.filter.low_hz,
            self.config.filter.high_hz,
            self.config.filter.order
        );

        let indexed: Vec<(usize, &Channel)> = channels.iter().enumerate().collect();
        let results: Vec<std::result::Result<ChannelOutput, ChannelFailure>> = indexed
            .par_iter()
            .map(|&(index, channel)| {
                self.process_channel(index, channel, &filter, &spectral, &spectrogram)
            })
            .collect();

        let mut output = PipelineOutput::default();
        for (channel, result) in channels.iter().zip(results) {
            match result {
                Ok(out) => {
                    output.filtered.push(channel.name.clone(), out.filtered);
                    output.spectra.push(channel.name.clone(), out.spectrum);
                    output.spectrograms.push(channel.name.clone(), out.spectrogram);
                    output.anomalies.push(channel.name.clone(), out.detection);
                }
                Err(failure) => {
                    log::warn!("{}", failure);
                    output.failures.push(failure);
                }
            }
        }

        output.processing_time_ms = start.elapsed().as_secs_f64() * 1000.0;
        log::info!(
            "Processed {}/{} channels in {:.2} ms",
            output.filtered.len(),
            channels.len(),
            output.processing_time_ms
        );

        Ok(output)
    }

    fn process_channel(
        &self,
        index: usize,
        channel: &Channel,
        filter: &ZeroPhaseFilter,
        spectral: &SpectralAnalyzer,
        spectrogram: &SpectrogramAnalyzer,
    ) -> std::result::Result<ChannelOutput, ChannelFailure> {
        let fail = |stage: Stage| {
            move |error: SignalError| ChannelFailure {
                channel: channel.name.clone(),
                stage,
                error,
            }
        };

        let filtered = filter.apply(&channel.samples).map_err(fail(Stage::Filter))?;
        let spectrum = spectral.analyze(&filtered).map_err(fail(Stage::Spectrum))?;
        let spectrogram = spectrogram
            .analyze(&filtered)
            .map_err(fail(Stage::Spectrogram))?;
        let detection = self
            .detector_for(index)
            .and_then(|d| d.detect(&filtered))
            .map_err(fail(Stage::Detection))?;

        log::debug!(
            "Channel '{}': {} samples, {} anomalies",
            channel.name,
            filtered.len(),
            detection.n_anomalies
        );

        Ok(ChannelOutput {
            filtered,
            spectrum,
            spectrogram,
            detection,
        })
    }

    /// Build the detector for channel `index` with its own derived seed
    fn detector_for(&self, index: usize) -> Result<Box<dyn AnomalyDetector>> {
        let detector = &self.config.detector;
        match detector.kind {
            DetectorKind::IsolationForest => {
                let config = IsolationForestConfig {
                    seed: derive_seed(detector.isolation_forest.seed, index as u64),
                    ..detector.isolation_forest.clone()
                };
                Ok(Box::new(IsolationForestDetector::new(config)?))
            }
            DetectorKind::ZScore => Ok(Box::new(ZScoreDetector::new(detector.zscore.clone())?)),
        }
    }
}

/// One-shot convenience wrapper around [`PipelineOrchestrator`]
pub fn analyze_channels(channels: &ChannelMap, config: &PipelineConfig) -> Result<PipelineOutput> {
    PipelineOrchestrator::new(config.clone())?.run(channels)
}
