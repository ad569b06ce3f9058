use crate::cli::DesignArgs;
use crate::exit_codes;
use crate::output;
use bearing_rs::{butter_bandpass, FilterSpec, ZeroPhaseFilter};
use serde::Serialize;

#[derive(Serialize)]
struct DesignOutput {
    spec: FilterSpec,
    /// Digital transfer function degree (2 x prototype order)
    degree: usize,
    /// Shortest signal the zero-phase filter accepts
    min_signal_len: usize,
    b: Vec<f64>,
    a: Vec<f64>,
}

pub fn execute(args: DesignArgs) -> i32 {
    let spec = FilterSpec::new(args.order, args.low, args.high, args.sr);
    let coeffs = match butter_bandpass(&spec) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::INPUT_ERROR;
        }
    };
    let filter = match ZeroPhaseFilter::new(&coeffs) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    };

    let result = DesignOutput {
        spec,
        degree: coeffs.order(),
        min_signal_len: filter.min_len(),
        b: coeffs.b,
        a: coeffs.a,
    };

    if args.json {
        if let Err(e) = output::emit(&result, false, None) {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    } else {
        println!(
            "Butterworth bandpass {}-{} Hz, order {}, fs={} Hz",
            spec.low_hz, spec.high_hz, spec.order, spec.sample_rate
        );
        println!(
            "Degree: {}  (minimum signal length {})",
            result.degree, result.min_signal_len
        );
        println!();
        println!("{:>4}  {:>24}  {:>24}", "k", "b[k]", "a[k]");
        for (k, (b, a)) in result.b.iter().zip(&result.a).enumerate() {
            println!("{:>4}  {:>24.16e}  {:>24.16e}", k, b, a);
        }
    }

    exit_codes::SUCCESS
}
