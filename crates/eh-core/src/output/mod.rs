//! Rendering of command payloads for stdout.
//!
//! Every JSON payload is wrapped in the same envelope (schema version, run
//! id, generation time, command) so downstream tooling can dispatch on it.

use chrono::Utc;
use eh_common::error::{format_error_human, StructuredError};
use eh_common::{Error, OutputFormat, Severity};
use serde::Serialize;

use crate::baseline::BaselineSnapshot;
use crate::engine::EngineStatus;

/// Schema version of the output envelope.
pub const OUTPUT_SCHEMA_VERSION: &str = "1.0.0";

#[derive(Debug, Serialize)]
struct Envelope<'a, T: Serialize> {
    schema_version: &'static str,
    run_id: &'a str,
    generated_at: String,
    command: &'a str,
    status: &'a str,
    #[serde(flatten)]
    payload: T,
}

fn envelope_json<T: Serialize>(run_id: &str, command: &str, status: &str, payload: T) -> String {
    let envelope = Envelope {
        schema_version: OUTPUT_SCHEMA_VERSION,
        run_id,
        generated_at: Utc::now().to_rfc3339(),
        command,
        status,
        payload,
    };
    serde_json::to_string_pretty(&envelope).unwrap_or_else(|e| {
        format!(r#"{{"schema_version":"{OUTPUT_SCHEMA_VERSION}","status":"error","error":"{e}"}}"#)
    })
}

#[derive(Serialize)]
struct StatusPayload<'a> {
    result: &'a EngineStatus,
}

/// Render an evaluation result.
pub fn render_status(status: &EngineStatus, format: OutputFormat, run_id: &str) -> String {
    match format {
        OutputFormat::Json => envelope_json(
            run_id,
            "evaluate",
            "ok",
            StatusPayload { result: status },
        ),
        OutputFormat::Summary => format!(
            "[{}] {} gear {}: {} (score {:.1})",
            run_id,
            status.vehicle_id,
            status.gear,
            status.overall_status,
            status.engine_safety_score
        ),
        OutputFormat::Md => status_markdown(status),
    }
}

fn status_symbol(severity: Severity) -> &'static str {
    match severity {
        Severity::Normal => "✓",
        Severity::Warning => "⚠",
        Severity::Critical => "✗",
    }
}

fn cell(value: f64) -> String {
    if value.is_finite() {
        format!("{:.2}", value)
    } else {
        "n/a".to_string()
    }
}

fn status_markdown(status: &EngineStatus) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "# Engine health: {} gear {}\n\n",
        status.vehicle_id, status.gear
    ));
    out.push_str(&format!(
        "{} **{}** - Engine Safety Score {:.1}/100 (baseline v{})\n\n",
        status_symbol(status.overall_status),
        status.overall_status,
        status.engine_safety_score,
        status.baseline_version
    ));
    out.push_str("| Metric | Current | Expected range | Dev % | Dev σ | Status |\n");
    out.push_str("|---|---|---|---|---|---|\n");
    for d in &status.deviations {
        out.push_str(&format!(
            "| {} ({}) | {} | {} .. {} | {} | {} | {} |\n",
            d.metric.display_name(),
            d.metric.unit(),
            cell(d.current_value),
            cell(d.expected_range_min),
            cell(d.expected_range_max),
            cell(d.deviation_percent),
            cell(d.deviation_std),
            d.status
        ));
    }
    out.push('\n');
    out.push_str(&status.explanation);
    out.push_str("\n\n## Recommendations\n\n");
    for rec in &status.recommendations {
        out.push_str(&format!("- {}\n", rec));
    }
    out
}

#[derive(Serialize)]
struct LearnedKey<'a> {
    key: String,
    count: u64,
    version: u64,
    ready: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    invalid_metrics: Vec<&'a str>,
}

#[derive(Serialize)]
struct LearnPayload<'a> {
    baselines: Vec<LearnedKey<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<&'a str>,
}

/// Render the outcome of a learning run.
pub fn render_learned(
    snapshots: &[&BaselineSnapshot],
    min_samples: u64,
    output: Option<&str>,
    format: OutputFormat,
    run_id: &str,
) -> String {
    let keys: Vec<LearnedKey<'_>> = snapshots
        .iter()
        .map(|s| {
            let invalid: Vec<&str> = s
                .invalid_metrics(min_samples)
                .into_iter()
                .map(|m| m.as_str())
                .collect();
            LearnedKey {
                key: s.key.to_string(),
                count: s.sample_count(),
                version: s.version,
                ready: invalid.is_empty(),
                invalid_metrics: invalid,
            }
        })
        .collect();
    let ready = keys.iter().filter(|k| k.ready).count();

    match format {
        OutputFormat::Json => envelope_json(
            run_id,
            "learn",
            "ok",
            LearnPayload {
                baselines: keys,
                output,
            },
        ),
        OutputFormat::Summary => format!(
            "[{}] learned {} key(s), {} ready",
            run_id,
            keys.len(),
            ready
        ),
        OutputFormat::Md => {
            let mut out =
                String::from("# Baselines learned\n\n| Key | Samples | Ready |\n|---|---|---|\n");
            for k in &keys {
                out.push_str(&format!(
                    "| {} | {} | {} |\n",
                    k.key,
                    k.count,
                    if k.ready { "yes" } else { "not enough data yet" }
                ));
            }
            if let Some(path) = output {
                out.push_str(&format!("\nWritten to `{}`\n", path));
            }
            out
        }
    }
}

#[derive(Serialize)]
struct ErrorPayload {
    error: StructuredError,
}

/// Render an error for stderr. JSON keeps the envelope; the other formats
/// use the human layout.
pub fn render_error(err: &Error, format: OutputFormat, run_id: &str, command: &str) -> String {
    match format {
        OutputFormat::Json => envelope_json(
            run_id,
            command,
            "error",
            ErrorPayload {
                error: StructuredError::from(err),
            },
        ),
        OutputFormat::Summary => format!("[{}] {}: {}", run_id, err.headline(), err),
        OutputFormat::Md => format_error_human(err, false),
    }
}

#[derive(Serialize)]
struct DataPayload<'a, T: Serialize> {
    data: &'a T,
}

/// Render an arbitrary serializable payload (config views, preset lists).
pub fn render_value<T: Serialize>(
    value: &T,
    format: OutputFormat,
    run_id: &str,
    command: &str,
) -> String {
    match format {
        OutputFormat::Json => envelope_json(run_id, command, "ok", DataPayload { data: value }),
        OutputFormat::Summary | OutputFormat::Md => serde_json::to_string_pretty(value)
            .unwrap_or_else(|e| format!("serialization failed: {}", e)),
    }
}
