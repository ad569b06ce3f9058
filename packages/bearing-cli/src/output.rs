use bearing_rs::{PipelineConfig, PipelineOutput};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};

/// Envelope written by `bearing analyze`
#[derive(Serialize)]
pub struct AnalysisReport<'a> {
    pub id: String,
    pub created_at: String,
    pub input: &'a str,
    pub channels: Vec<&'a str>,
    pub config: &'a PipelineConfig,
    #[serde(flatten)]
    pub output: &'a PipelineOutput,
}

impl<'a> AnalysisReport<'a> {
    pub fn new(
        input: &'a str,
        channels: Vec<&'a str>,
        config: &'a PipelineConfig,
        output: &'a PipelineOutput,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            input,
            channels,
            config,
            output,
        }
    }
}

/// Serialize `value` as JSON straight into `path`, or stdout when `None`.
///
/// Stdout output ends with a newline; files get the JSON only.
pub fn emit<T: Serialize>(value: &T, compact: bool, path: Option<&str>) -> Result<(), String> {
    let (mut sink, target): (Box<dyn Write>, &str) = match path {
        Some(p) => {
            let file = File::create(p)
                .map_err(|e| format!("Failed to create output file '{}': {}", p, e))?;
            (Box::new(BufWriter::new(file)), p)
        }
        None => (Box::new(BufWriter::new(std::io::stdout().lock())), "stdout"),
    };

    let written = if compact {
        serde_json::to_writer(&mut sink, value)
    } else {
        serde_json::to_writer_pretty(&mut sink, value)
    };
    written.map_err(|e| format!("Failed to write JSON to {}: {}", target, e))?;

    if path.is_none() {
        sink.write_all(b"\n").map_err(|e| format!("Failed to write to stdout: {}", e))?;
    }
    sink.flush().map_err(|e| format!("Failed to flush {}: {}", target, e))
}
