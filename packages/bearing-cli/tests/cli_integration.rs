use assert_cmd::Command;
use predicates::prelude::*;
use std::f64::consts::PI;
use std::io::Write;

fn bearing() -> Command {
    let mut cmd = Command::cargo_bin("bearing").unwrap();
    cmd.env_remove("BEARING_CONFIG");
    cmd
}

fn tone(freq: f64, fs: f64, n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let t = i as f64 / fs;
            (2.0 * PI * freq * t).sin() + 0.2 * (2.0 * PI * 40.0 * t).sin()
        })
        .collect()
}

fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn json_input(channels: &[(&str, Vec<f64>)], sample_rate: f64) -> tempfile::NamedTempFile {
    let channels: Vec<serde_json::Value> = channels
        .iter()
        .map(|(name, samples)| serde_json::json!({"name": name, "samples": samples}))
        .collect();
    let body = serde_json::json!({"sample_rate": sample_rate, "channels": channels});
    write_temp(".json", &body.to_string())
}

fn stdout_json(output: &assert_cmd::assert::Assert) -> serde_json::Value {
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    serde_json::from_str(&stdout).unwrap()
}

// =============================================================================
// GENERAL
// =============================================================================

#[test]
fn test_no_args_shows_help() {
    bearing()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_version_flag() {
    bearing()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("bearing"));
}

#[test]
fn test_help_lists_subcommands() {
    bearing()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("analyze"))
        .stdout(predicate::str::contains("design"))
        .stdout(predicate::str::contains("validate"));
}

// =============================================================================
// ANALYZE SUBCOMMAND
// =============================================================================

#[test]
fn test_analyze_json_input() {
    let input = json_input(
        &[
            ("bearing_1", tone(1000.0, 10_000.0, 2048)),
            ("bearing_2", tone(1500.0, 10_000.0, 2048)),
        ],
        10_000.0,
    );

    let output = bearing()
        .args(["analyze", "--input", input.path().to_str().unwrap(), "--quiet"])
        .args(["--trees", "20"])
        .assert()
        .success();

    let parsed = stdout_json(&output);
    assert!(parsed.get("id").is_some());
    assert!(parsed.get("created_at").is_some());
    assert_eq!(parsed["config"]["sample_rate"], 10_000.0);
    assert_eq!(parsed["config"]["detector"]["isolation_forest"]["n_trees"], 20);
    assert_eq!(parsed["channels"], serde_json::json!(["bearing_1", "bearing_2"]));

    for name in ["bearing_1", "bearing_2"] {
        assert_eq!(parsed["filtered"][name].as_array().unwrap().len(), 2048);
        assert_eq!(
            parsed["spectra"][name]["amplitudes"].as_array().unwrap().len(),
            1024
        );
        assert_eq!(
            parsed["spectrograms"][name]["times"].as_array().unwrap().len(),
            15
        );
        // round(0.01 * 2048) = 20
        assert_eq!(parsed["anomalies"][name]["n_anomalies"], 20);
    }
    assert!(parsed["failures"].as_array().unwrap().is_empty());
}

#[test]
fn test_analyze_partial_failure_exit_code() {
    let input = json_input(
        &[
            ("good", tone(1000.0, 10_000.0, 1024)),
            ("short", tone(1000.0, 10_000.0, 12)),
        ],
        10_000.0,
    );

    let output = bearing()
        .args(["analyze", "--input", input.path().to_str().unwrap(), "--quiet"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("short"));

    let parsed = stdout_json(&output);
    let failures = parsed["failures"].as_array().unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0]["channel"], "short");
    assert_eq!(failures[0]["stage"], "filter");
    assert!(parsed["anomalies"].get("good").is_some());
    assert!(parsed["anomalies"].get("short").is_none());
}

#[test]
fn test_analyze_all_channels_failed() {
    let input = json_input(&[("tiny", vec![0.1, 0.2, 0.3])], 10_000.0);
    bearing()
        .args(["analyze", "--input", input.path().to_str().unwrap(), "--quiet"])
        .assert()
        .code(2);
}

#[test]
fn test_analyze_csv_to_file() {
    let a = tone(800.0, 20_000.0, 1024);
    let b = tone(1200.0, 20_000.0, 1024);
    let mut csv = String::from("vertical,horizontal\n");
    for (x, y) in a.iter().zip(&b) {
        csv.push_str(&format!("{},{}\n", x, y));
    }
    let input = write_temp(".csv", &csv);
    let out_dir = tempfile::tempdir().unwrap();
    let out_path = out_dir.path().join("report.json");

    bearing()
        .args(["analyze", "--input", input.path().to_str().unwrap()])
        .args(["--sr", "20000", "--detector", "zscore", "--compact"])
        .args(["-o", out_path.to_str().unwrap()])
        .assert()
        .success()
        .stderr(predicate::str::contains("Results written to"));

    let text = std::fs::read_to_string(&out_path).unwrap();
    assert!(!text.contains('\n'));
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed["config"]["detector"]["kind"], "zscore");
    assert_eq!(parsed["channels"], serde_json::json!(["vertical", "horizontal"]));
    assert_eq!(parsed["anomalies"]["vertical"]["threshold"], 3.0);
}

#[test]
fn test_analyze_is_reproducible_with_seed() {
    let mut samples = tone(1000.0, 10_000.0, 2048);
    samples[700] += 5.0;
    let input = json_input(&[("b", samples)], 10_000.0);
    let path = input.path().to_str().unwrap();

    let run = || {
        let output = bearing()
            .args(["analyze", "--input", path, "--quiet", "--seed", "7", "--trees", "30"])
            .assert()
            .success();
        stdout_json(&output)["anomalies"].clone()
    };
    assert_eq!(run(), run());
}

#[test]
fn test_analyze_missing_file() {
    bearing()
        .args(["analyze", "--input", "/nonexistent/data.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn test_analyze_invalid_cutoffs() {
    let input = json_input(&[("b", tone(1000.0, 10_000.0, 512))], 10_000.0);
    bearing()
        .args(["analyze", "--input", input.path().to_str().unwrap()])
        .args(["--low", "3000", "--high", "2000"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid filter spec"));
}

#[test]
fn test_analyze_rejects_duplicate_channels() {
    let input = json_input(
        &[("b", vec![1.0; 100]), ("b", vec![2.0; 100])],
        10_000.0,
    );
    bearing()
        .args(["analyze", "--input", input.path().to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("duplicate"));
}

#[test]
fn test_analyze_config_file() {
    let config = write_temp(
        ".json",
        r#"{"filter": {"order": 2, "low_hz": 300, "high_hz": 1200},
            "spectrogram": {"nperseg": 128, "noverlap": 32}}"#,
    );
    let input = json_input(&[("b", tone(600.0, 8_000.0, 1024))], 8_000.0);

    let output = bearing()
        .args(["analyze", "--input", input.path().to_str().unwrap(), "--quiet"])
        .args(["--config", config.path().to_str().unwrap()])
        .assert()
        .success();
    let parsed = stdout_json(&output);
    assert_eq!(parsed["config"]["filter"]["order"], 2);
    assert_eq!(parsed["config"]["spectrogram"]["noverlap"], 32);
    assert_eq!(parsed["config"]["sample_rate"], 8_000.0);
    // (1024 - 128) / 96 + 1 = 10
    assert_eq!(parsed["spectrograms"]["b"]["times"].as_array().unwrap().len(), 10);
}

// =============================================================================
// DESIGN SUBCOMMAND
// =============================================================================

#[test]
fn test_design_json() {
    let output = bearing()
        .args(["design", "--sr", "10000", "--json"])
        .assert()
        .success();
    let parsed = stdout_json(&output);
    assert_eq!(parsed["degree"], 8);
    assert_eq!(parsed["min_signal_len"], 28);
    let b = parsed["b"].as_array().unwrap();
    let a = parsed["a"].as_array().unwrap();
    assert_eq!(b.len(), 9);
    assert_eq!(a.len(), 9);
    assert_eq!(a[0], 1.0);
    assert!((b[0].as_f64().unwrap() - 0.01856301062689718).abs() < 1e-9);
}

#[test]
fn test_design_text() {
    bearing()
        .args(["design", "--order", "2", "--low", "10", "--high", "50", "--sr", "1000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Degree: 4"));
}

#[test]
fn test_design_above_nyquist() {
    bearing()
        .args(["design", "--sr", "3000"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Nyquist"));
}

// =============================================================================
// VALIDATE SUBCOMMAND
// =============================================================================

#[test]
fn test_validate_ok() {
    let input = json_input(&[("b", tone(1000.0, 10_000.0, 512))], 10_000.0);
    bearing()
        .args(["validate", "--input", input.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("1/1 channels ready"));
}

#[test]
fn test_validate_json_reports_short_channel() {
    let input = json_input(
        &[
            ("long", tone(1000.0, 10_000.0, 512)),
            ("medium", tone(1000.0, 10_000.0, 100)),
        ],
        10_000.0,
    );
    let output = bearing()
        .args(["validate", "--input", input.path().to_str().unwrap(), "--json"])
        .assert()
        .code(3);
    let parsed = stdout_json(&output);
    assert_eq!(parsed["valid"], false);
    let channels = parsed["channels"].as_array().unwrap();
    assert_eq!(channels[0]["ok"], true);
    assert_eq!(channels[1]["ok"], false);
    assert!(channels[1]["error"]
        .as_str()
        .unwrap()
        .contains("nperseg=256"));
}

#[test]
fn test_validate_unsupported_extension() {
    let input = write_temp(".edf", "not really");
    bearing()
        .args(["validate", "--input", input.path().to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unsupported file extension"));
}
