//! Channel data loaders.
//!
//! JSON: `{"sample_rate": 20000, "channels": [{"name": "...", "samples": [...]}]}`
//! with `sample_rate` optional.
//!
//! CSV: a header row of channel names, then one row per sample.

use crate::cli::InputFormat;
use bearing_rs::{Channel, ChannelMap};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

pub struct LoadedInput {
    pub sample_rate: Option<f64>,
    pub channels: ChannelMap,
}

#[derive(Deserialize)]
struct JsonInput {
    #[serde(default)]
    sample_rate: Option<f64>,
    channels: Vec<Channel>,
}

/// Read and validate an input file.
pub fn load(path: &str, format: Option<InputFormat>) -> Result<LoadedInput, String> {
    let p = Path::new(path);
    if !p.exists() {
        return Err(format!("File not found: {}", path));
    }
    if !p.is_file() {
        return Err(format!("Not a file: {}", path));
    }

    let format = match format {
        Some(f) => f,
        None => detect_format(p)?,
    };

    let file =
        std::fs::File::open(p).map_err(|e| format!("Failed to open '{}': {}", path, e))?;
    let loaded = match format {
        InputFormat::Json => parse_json(file),
        InputFormat::Csv => parse_csv(file),
    }
    .map_err(|e| format!("{}: {}", path, e))?;

    log::info!(
        "Loaded {} channels from {} ({:?})",
        loaded.channels.len(),
        path,
        format
    );
    Ok(loaded)
}

fn detect_format(path: &Path) -> Result<InputFormat, String> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    match extension.as_str() {
        "json" => Ok(InputFormat::Json),
        "csv" => Ok(InputFormat::Csv),
        _ => Err(format!(
            "Unsupported file extension '{}'. Supported: json, csv (or pass --format)",
            extension
        )),
    }
}

fn parse_json<R: Read>(reader: R) -> Result<LoadedInput, String> {
    let input: JsonInput =
        serde_json::from_reader(reader).map_err(|e| format!("Invalid JSON input: {}", e))?;
    let channels = ChannelMap::new(input.channels).map_err(|e| e.to_string())?;
    Ok(LoadedInput {
        sample_rate: input.sample_rate,
        channels,
    })
}

fn parse_csv<R: Read>(reader: R) -> Result<LoadedInput, String> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| format!("Failed to read CSV header: {}", e))?
        .clone();
    if headers.is_empty() {
        return Err("CSV header has no channel names".to_string());
    }

    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); headers.len()];
    for (row, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| format!("Malformed CSV: {}", e))?;
        for (col, field) in record.iter().enumerate() {
            let value = field.parse::<f64>().map_err(|_| {
                format!(
                    "Row {}, column '{}': '{}' is not a number",
                    row + 2,
                    &headers[col],
                    field
                )
            })?;
            columns[col].push(value);
        }
    }

    let channels = headers
        .iter()
        .zip(columns)
        .map(|(name, samples)| Channel::new(name, samples))
        .collect();
    let channels = ChannelMap::new(channels).map_err(|e| e.to_string())?;
    Ok(LoadedInput {
        sample_rate: None,
        channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_with_sample_rate() {
        let text = r#"{"sample_rate": 20000, "channels": [
            {"name": "b1", "samples": [1.0, 2.0, 3.0]},
            {"name": "b2", "samples": [4.0, 5.0, 6.0]}
        ]}"#;
        let loaded = parse_json(text.as_bytes()).unwrap();
        assert_eq!(loaded.sample_rate, Some(20000.0));
        assert_eq!(loaded.channels.names().collect::<Vec<_>>(), vec!["b1", "b2"]);
    }

    #[test]
    fn test_parse_json_rejects_duplicates() {
        let text = r#"{"channels": [
            {"name": "b1", "samples": [1.0]},
            {"name": "b1", "samples": [2.0]}
        ]}"#;
        let err = parse_json(text.as_bytes()).err().unwrap();
        assert!(err.contains("duplicate"), "{}", err);
    }

    #[test]
    fn test_parse_csv_columns() {
        let text = "bearing_1, bearing_2\n0.5, -0.25\n1.0, 0.75\n-1.5, 2.0\n";
        let loaded = parse_csv(text.as_bytes()).unwrap();
        assert_eq!(loaded.sample_rate, None);
        assert_eq!(
            loaded.channels.get("bearing_1").unwrap().samples,
            vec![0.5, 1.0, -1.5]
        );
        assert_eq!(
            loaded.channels.get("bearing_2").unwrap().samples,
            vec![-0.25, 0.75, 2.0]
        );
    }

    #[test]
    fn test_parse_csv_bad_value() {
        let err = parse_csv("a,b\n1.0,x\n".as_bytes()).err().unwrap();
        assert!(err.contains("Row 2, column 'b'"), "{}", err);
    }

    #[test]
    fn test_parse_csv_ragged_rows() {
        assert!(parse_csv("a,b\n1.0,2.0\n3.0\n".as_bytes()).is_err());
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format(Path::new("x.JSON")).unwrap(), InputFormat::Json);
        assert_eq!(detect_format(Path::new("x.csv")).unwrap(), InputFormat::Csv);
        assert!(detect_format(Path::new("x.edf")).is_err());
    }
}
