use crate::cli::AnalyzeArgs;
use crate::exit_codes;
use crate::input;
use crate::output::{self, AnalysisReport};
use crate::params;
use bearing_rs::PipelineOrchestrator;

pub fn execute(args: AnalyzeArgs) -> i32 {
    let loaded = match input::load(&args.input, args.format) {
        Ok(l) => l,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    let config = match params::resolve_config(&args.pipeline, loaded.sample_rate) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    let orchestrator = match PipelineOrchestrator::new(config) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::INPUT_ERROR;
        }
    };
    let config = orchestrator.config();

    if !args.quiet {
        eprintln!("Analyzing {}...", args.input);
        eprintln!(
            "  Channels: {}",
            loaded.channels.names().collect::<Vec<_>>().join(", ")
        );
        eprintln!(
            "  Bandpass: {}-{} Hz, order {}, fs={} Hz",
            config.filter.low_hz, config.filter.high_hz, config.filter.order, config.sample_rate
        );
        eprintln!(
            "  Spectrogram: nperseg={}, noverlap={}",
            config.spectrogram.nperseg, config.spectrogram.noverlap
        );
        eprintln!("  Detector: {:?}", config.detector.kind);
    }

    let result = match orchestrator.run(&loaded.channels) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Analysis failed: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    };

    for failure in &result.failures {
        eprintln!("Warning: {}", failure);
    }

    let report = AnalysisReport::new(
        &args.input,
        loaded.channels.names().collect(),
        config,
        &result,
    );
    if let Err(e) = output::emit(&report, args.compact, args.output.as_deref()) {
        eprintln!("Error: {}", e);
        return exit_codes::EXECUTION_ERROR;
    }

    let total = loaded.channels.len();
    let succeeded = result.anomalies.len();
    if !args.quiet {
        let flagged: usize = result.anomalies.iter().map(|(_, d)| d.n_anomalies).sum();
        eprintln!(
            "Analysis complete: {}/{} channels, {} anomalous samples, {:.1} ms",
            succeeded, total, flagged, result.processing_time_ms
        );
        if let Some(ref path) = args.output {
            eprintln!("Results written to {}", path);
        }
    }

    if result.is_complete() {
        exit_codes::SUCCESS
    } else if succeeded > 0 {
        exit_codes::PARTIAL_FAILURE
    } else {
        exit_codes::EXECUTION_ERROR
    }
}
