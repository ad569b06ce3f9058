use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "bearing",
    version,
    about = "Bearing sensor signal analysis: bandpass, spectra and anomaly detection",
    long_about = "Filter multichannel bearing sensor recordings (JSON or CSV), compute\n\
                  FFT spectra and spectrograms, and flag anomalous samples per channel."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the full pipeline on an input file
    Analyze(AnalyzeArgs),
    /// Print Butterworth bandpass coefficients
    Design(DesignArgs),
    /// Check an input file and configuration without analyzing
    Validate(ValidateArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    Json,
    Csv,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DetectorArg {
    #[value(name = "isolation-forest", alias = "iforest")]
    IsolationForest,
    Zscore,
}

/// Pipeline settings shared by `analyze` and `validate`.
///
/// Flags override the config file, which overrides built-in defaults.
#[derive(Args, Clone, Debug, Default)]
pub struct PipelineArgs {
    /// JSON pipeline configuration file
    #[arg(long, env = "BEARING_CONFIG")]
    pub config: Option<String>,

    /// Sampling rate in Hz (overrides the input file)
    #[arg(long)]
    pub sr: Option<f64>,

    /// Butterworth prototype order
    #[arg(long)]
    pub order: Option<usize>,

    /// Low cutoff in Hz
    #[arg(long)]
    pub low: Option<f64>,

    /// High cutoff in Hz
    #[arg(long)]
    pub high: Option<f64>,

    /// Spectrogram segment length in samples
    #[arg(long)]
    pub nperseg: Option<usize>,

    /// Spectrogram segment overlap in samples
    #[arg(long)]
    pub noverlap: Option<usize>,

    /// Anomaly detector
    #[arg(long, value_enum)]
    pub detector: Option<DetectorArg>,

    /// Number of isolation trees
    #[arg(long)]
    pub trees: Option<usize>,

    /// Samples drawn per isolation tree
    #[arg(long)]
    pub subsample: Option<usize>,

    /// Expected fraction of anomalous samples
    #[arg(long)]
    pub contamination: Option<f64>,

    /// Root random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Absolute z-score threshold
    #[arg(long)]
    pub z_threshold: Option<f64>,
}

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Input data file (.json or .csv)
    #[arg(long)]
    pub input: String,

    /// Input format (default: from file extension)
    #[arg(long, value_enum)]
    pub format: Option<InputFormat>,

    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Compact JSON output (no indentation)
    #[arg(long, default_value_t = false)]
    pub compact: bool,

    /// Suppress progress messages on stderr
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct DesignArgs {
    /// Butterworth prototype order
    #[arg(long, default_value_t = 4)]
    pub order: usize,

    /// Low cutoff in Hz
    #[arg(long, default_value_t = 500.0)]
    pub low: f64,

    /// High cutoff in Hz
    #[arg(long, default_value_t = 2000.0)]
    pub high: f64,

    /// Sampling rate in Hz
    #[arg(long)]
    pub sr: f64,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Input data file (.json or .csv)
    #[arg(long)]
    pub input: String,

    /// Input format (default: from file extension)
    #[arg(long, value_enum)]
    pub format: Option<InputFormat>,

    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}
