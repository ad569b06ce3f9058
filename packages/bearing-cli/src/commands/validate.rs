use crate::cli::ValidateArgs;
use crate::exit_codes;
use crate::input;
use crate::output;
use crate::params;
use bearing_rs::{butter_bandpass, PipelineConfig, SpectrogramAnalyzer, ZeroPhaseFilter};
use serde::Serialize;

#[derive(Serialize)]
struct ChannelCheck {
    name: String,
    samples: usize,
    ok: bool,
    error: Option<String>,
}

#[derive(Serialize)]
struct ValidateOutput {
    file: String,
    valid: bool,
    config: Option<PipelineConfig>,
    channels: Vec<ChannelCheck>,
    error: Option<String>,
}

pub fn execute(args: ValidateArgs) -> i32 {
    let (result, code) = check(&args);

    if args.json {
        if let Err(e) = output::emit(&result, false, None) {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    } else if let Some(ref err) = result.error {
        eprintln!("Error: {}", err);
    } else {
        for channel in result.channels.iter().filter(|c| !c.ok) {
            eprintln!(
                "Channel '{}': {}",
                channel.name,
                channel.error.as_deref().unwrap_or_default()
            );
        }
        let passing = result.channels.iter().filter(|c| c.ok).count();
        println!(
            "File '{}': {}/{} channels ready for analysis",
            args.input,
            passing,
            result.channels.len()
        );
    }

    code
}

fn check(args: &ValidateArgs) -> (ValidateOutput, i32) {
    let mut result = ValidateOutput {
        file: args.input.clone(),
        valid: false,
        config: None,
        channels: Vec::new(),
        error: None,
    };

    let loaded = match input::load(&args.input, args.format) {
        Ok(l) => l,
        Err(msg) => {
            result.error = Some(msg);
            return (result, exit_codes::INPUT_ERROR);
        }
    };

    let config = match params::resolve_config(&args.pipeline, loaded.sample_rate) {
        Ok(c) => c,
        Err(msg) => {
            result.error = Some(msg);
            return (result, exit_codes::INPUT_ERROR);
        }
    };

    let min_len = match butter_bandpass(&config.filter_spec())
        .and_then(|coeffs| ZeroPhaseFilter::new(&coeffs))
    {
        Ok(filter) => filter.min_len(),
        Err(e) => {
            result.error = Some(e.to_string());
            return (result, exit_codes::INPUT_ERROR);
        }
    };
    let spectrogram = SpectrogramAnalyzer::new(
        config.sample_rate,
        config.spectrogram.nperseg,
        config.spectrogram.noverlap,
    );

    for channel in &loaded.channels {
        let error = if channel.len() < min_len {
            Some(format!(
                "{} samples, the filter needs at least {}",
                channel.len(),
                min_len
            ))
        } else {
            spectrogram
                .segment_count(channel.len())
                .err()
                .map(|e| e.to_string())
        };
        result.channels.push(ChannelCheck {
            name: channel.name.clone(),
            samples: channel.len(),
            ok: error.is_none(),
            error,
        });
    }

    result.valid = result.channels.iter().all(|c| c.ok);
    result.config = Some(config);
    let code = if result.valid {
        exit_codes::SUCCESS
    } else {
        exit_codes::PARTIAL_FAILURE
    };
    (result, code)
}
