//! CLI tests for eh-core: learn → evaluate round trips, exit codes, and
//! configuration handling.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Get a Command for the eh-core binary, isolated from any ambient config.
fn eh_core() -> Command {
    let mut cmd = Command::cargo_bin("eh-core").expect("eh-core binary should exist");
    cmd.env_remove("ENGINE_HEALTH_CONFIG")
        .env_remove("ENGINE_HEALTH_CONFIG_DIR")
        .env_remove("ENGINE_HEALTH_PRESET")
        .env_remove("EH_LOG")
        .env_remove("RUST_LOG");
    cmd
}

fn sample_line(vehicle: &str, gear: u8, i: usize, temp: f64) -> String {
    format!(
        r#"{{"vehicle_id":"{vehicle}","gear":{gear},"timestamp":"2024-05-01T00:{:02}:00Z","rpm":{},"engine_temp":{temp},"oil_pressure":{},"vibration":{},"speed":35.0}}"#,
        i % 60,
        1450 + (i * 13) % 100,
        38 + i % 4,
        0.40 + (i % 6) as f64 * 0.01,
    )
}

/// JSON-lines history for VH_01 gear 3 (40 samples) and VH_02 gear 1 (5 samples).
fn write_history(dir: &Path) -> PathBuf {
    let mut lines: Vec<String> = (0..40)
        .map(|i| sample_line("VH_01", 3, i, 88.0 + (i % 5) as f64))
        .collect();
    lines.extend((0..5).map(|i| sample_line("VH_02", 1, i, 90.0)));
    let path = dir.join("history.jsonl");
    fs::write(&path, lines.join("\n")).expect("write history");
    path
}

/// Learn from the fixture history and return the baselines path.
fn learned_baselines(dir: &TempDir) -> PathBuf {
    let history = write_history(dir.path());
    let baselines = dir.path().join("baselines.json");
    eh_core()
        .args(["--preset", "standard", "-q", "learn", "--input"])
        .arg(&history)
        .arg("--output")
        .arg(&baselines)
        .assert()
        .success();
    baselines
}

fn evaluate(baselines: &Path, sample: &str) -> assert_cmd::assert::Assert {
    eh_core()
        .args(["--preset", "standard", "-q", "evaluate", "--baselines"])
        .arg(baselines)
        .args(["--sample", sample])
        .assert()
}

// ============================================================================
// Learn
// ============================================================================

mod learn {
    use super::*;

    #[test]
    fn reports_readiness_per_key() {
        let dir = TempDir::new().unwrap();
        let history = write_history(dir.path());
        let out = eh_core()
            .args(["--preset", "standard", "-q", "learn", "--input"])
            .arg(&history)
            .output()
            .unwrap();
        assert!(out.status.success());

        let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
        assert_eq!(json["command"], "learn");
        assert_eq!(json["status"], "ok");
        let keys = json["baselines"].as_array().unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0]["key"], "VH_01/gear-3");
        assert_eq!(keys[0]["ready"], true);
        assert_eq!(keys[1]["key"], "VH_02/gear-1");
        assert_eq!(keys[1]["ready"], false);
    }

    #[test]
    fn writes_baselines_file() {
        let dir = TempDir::new().unwrap();
        let baselines = learned_baselines(&dir);
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&baselines).unwrap()).unwrap();
        assert_eq!(json["schema_version"], 1);
        assert_eq!(json["snapshots"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn reads_stdin() {
        let input = (0..12)
            .map(|i| sample_line("VH_09", 2, i, 91.0 + (i % 3) as f64))
            .collect::<Vec<_>>()
            .join("\n");
        eh_core()
            .args(["--preset", "standard", "-q", "-f", "summary", "learn", "--input", "-"])
            .write_stdin(input)
            .assert()
            .success()
            .stdout(predicate::str::contains("learned 1 key(s), 1 ready"));
    }

    #[test]
    fn malformed_line_rejects_batch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.jsonl");
        let mut lines: Vec<String> = (0..12)
            .map(|i| sample_line("VH_01", 1, i, 90.0))
            .collect();
        lines[7] = r#"{"vehicle_id":"VH_01","gear":1,"timestamp":"2024-05-01T00:07:00Z","rpm":"fast"}"#.to_string();
        fs::write(&path, lines.join("\n")).unwrap();

        eh_core()
            .args(["--preset", "standard", "-f", "summary", "learn", "--input"])
            .arg(&path)
            .assert()
            .code(11)
            .stdout(predicate::str::is_empty())
            .stderr(predicate::str::contains("line 8"));
    }

    #[test]
    fn missing_input_file_fails() {
        eh_core()
            .args(["--preset", "standard", "learn", "--input", "/nonexistent/history.jsonl"])
            .assert()
            .code(20);
    }
}

// ============================================================================
// Evaluate
// ============================================================================

mod evaluate {
    use super::*;

    #[test]
    fn typical_reading_is_normal() {
        let dir = TempDir::new().unwrap();
        let baselines = learned_baselines(&dir);
        let out = evaluate(&baselines, &sample_line("VH_01", 3, 6, 90.0))
            .code(0)
            .get_output()
            .clone();

        let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
        assert_eq!(json["command"], "evaluate");
        assert_eq!(json["result"]["overall_status"], "Normal");
        assert_eq!(json["result"]["deviations"].as_array().unwrap().len(), 4);
        let score = json["result"]["engine_safety_score"].as_f64().unwrap();
        assert!(score >= 85.0, "score {score}");
    }

    #[test]
    fn overheating_alone_is_warning() {
        let dir = TempDir::new().unwrap();
        let baselines = learned_baselines(&dir);
        evaluate(&baselines, &sample_line("VH_01", 3, 6, 150.0))
            .code(1)
            .stdout(predicate::str::contains("Check engine cooling system"));
    }

    #[test]
    fn broad_failure_is_critical() {
        let dir = TempDir::new().unwrap();
        let baselines = learned_baselines(&dir);
        let sample = r#"{"vehicle_id":"VH_01","gear":3,"timestamp":"2024-05-01T01:00:00Z","rpm":3900,"engine_temp":150,"oil_pressure":9,"vibration":2.5,"speed":35}"#;
        evaluate(&baselines, sample)
            .code(2)
            .stdout(predicate::str::contains("\"overall_status\": \"Critical\""))
            .stdout(predicate::str::contains("Inspect oil system"));
    }

    #[test]
    fn sample_from_file() {
        let dir = TempDir::new().unwrap();
        let baselines = learned_baselines(&dir);
        let sample = dir.path().join("sample.json");
        fs::write(&sample, sample_line("VH_01", 3, 2, 90.0)).unwrap();
        evaluate(&baselines, &format!("@{}", sample.display())).code(0);
    }

    #[test]
    fn cold_key_exits_three_with_structured_error() {
        let dir = TempDir::new().unwrap();
        let baselines = learned_baselines(&dir);
        let out = evaluate(&baselines, &sample_line("VH_02", 1, 0, 90.0))
            .code(3)
            .get_output()
            .clone();
        assert!(out.stdout.is_empty());

        let json: serde_json::Value = serde_json::from_slice(&out.stderr).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"]["code"], 20);
        assert_eq!(json["error"]["suggested_action"], "collect_more_data");
        assert_eq!(json["error"]["context"]["vehicle_id"], "VH_02");
    }

    #[test]
    fn unknown_vehicle_is_cold_not_critical() {
        let dir = TempDir::new().unwrap();
        let baselines = learned_baselines(&dir);
        evaluate(&baselines, &sample_line("VH_77", 3, 0, 150.0)).code(3);
    }

    #[test]
    fn non_numeric_metric_exits_eleven() {
        let dir = TempDir::new().unwrap();
        let baselines = learned_baselines(&dir);
        let sample = r#"{"vehicle_id":"VH_01","gear":3,"timestamp":"2024-05-01T00:00:00Z","rpm":"n/a","engine_temp":90,"oil_pressure":40,"vibration":0.4,"speed":30}"#;
        evaluate(&baselines, sample).code(11);
    }

    #[test]
    fn gear_zero_exits_eleven() {
        let dir = TempDir::new().unwrap();
        let baselines = learned_baselines(&dir);
        let sample = sample_line("VH_01", 0, 0, 90.0);
        evaluate(&baselines, &sample).code(11);
    }

    #[test]
    fn markdown_output_has_table() {
        let dir = TempDir::new().unwrap();
        let baselines = learned_baselines(&dir);
        eh_core()
            .args(["--preset", "standard", "-q", "-f", "md", "evaluate", "--baselines"])
            .arg(&baselines)
            .args(["--sample", &sample_line("VH_01", 3, 6, 90.0)])
            .assert()
            .code(0)
            .stdout(predicate::str::contains("| Metric | Current |"))
            .stdout(predicate::str::contains("## Recommendations"));
    }

    #[test]
    fn corrupt_baselines_file_fails() {
        let dir = TempDir::new().unwrap();
        let baselines = dir.path().join("baselines.json");
        fs::write(&baselines, "{not json").unwrap();
        evaluate(&baselines, &sample_line("VH_01", 3, 0, 90.0)).code(20);
    }
}

// ============================================================================
// Configuration
// ============================================================================

mod config {
    use super::*;

    #[test]
    fn missing_explicit_config_exits_ten() {
        eh_core()
            .args(["--config", "/nonexistent/engine.json", "check"])
            .assert()
            .code(10)
            .stderr(predicate::str::contains("not found"));
    }

    #[test]
    fn unknown_preset_exits_ten() {
        eh_core()
            .args(["--preset", "turbo", "check"])
            .assert()
            .code(10);
    }

    #[test]
    fn invalid_weights_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("engine.json");
        fs::write(
            &path,
            r#"{"schema_version":"1.0.0","scoring":{"weights":{"engine_temp":0.9,"rpm":0.25,"oil_pressure":0.25,"vibration":0.2}}}"#,
        )
        .unwrap();
        eh_core()
            .args(["check", "--config"])
            .arg(&path)
            .assert()
            .code(10);
    }

    #[test]
    fn check_with_preset_is_ok() {
        eh_core()
            .args(["--preset", "sensitive", "check"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"status\": \"ok\""));
    }

    #[test]
    fn explicit_config_wins_over_preset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("engine.json");
        fs::write(
            &path,
            r#"{"schema_version":"1.0.0","learner":{"min_samples":25}}"#,
        )
        .unwrap();
        let out = eh_core()
            .args(["--preset", "relaxed", "config", "show", "--config"])
            .arg(&path)
            .output()
            .unwrap();
        assert!(out.status.success());
        let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
        assert_eq!(json["data"]["engine"]["learner"]["min_samples"], 25);
    }

    #[test]
    fn presets_listed() {
        eh_core()
            .args(["-f", "summary", "config", "presets"])
            .assert()
            .success()
            .stdout(predicate::str::contains("standard"))
            .stdout(predicate::str::contains("sensitive"))
            .stdout(predicate::str::contains("relaxed"));
    }
}

// ============================================================================
// Invalid Arguments
// ============================================================================

mod invalid_args {
    use super::*;

    #[test]
    fn unknown_command_fails() {
        eh_core()
            .arg("nonexistent-command")
            .assert()
            .failure()
            .stderr(predicate::str::contains("error"));
    }

    #[test]
    fn evaluate_requires_sample() {
        eh_core()
            .args(["evaluate", "--baselines", "b.json"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--sample"));
    }
}
