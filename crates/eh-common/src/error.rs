//! Error types for Engine Health.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints for automation
//! - Remediation suggestions for humans
//!
//! # Human-Facing Output
//!
//! ```text
//! ✗ Not Enough Data Yet
//!   Reason: no usable baseline for vehicle VH_01 in gear 3
//!   Fix: Feed at least 10 historical samples for this vehicle and gear, then retry.
//! ```
//!
//! # Machine-Facing Output
//!
//! ```json
//! {
//!   "code": 20,
//!   "category": "baseline",
//!   "message": "no usable baseline for vehicle VH_01 in gear 3",
//!   "recoverable": true,
//!   "suggested_action": "collect_more_data",
//!   "context": { "vehicle_id": "VH_01", "gear": 3 }
//! }
//! ```

use crate::id::{Gear, VehicleId};
use crate::metric::Metric;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for Engine Health operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Configuration file errors.
    Config,
    /// Missing, cold-start, or unreadable baselines.
    Baseline,
    /// Rejected telemetry input.
    Sample,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Baseline => write!(f, "baseline"),
            ErrorCategory::Sample => write!(f, "sample"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Suggested actions for automated callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    /// Retry the operation.
    Retry,
    /// Run the configuration check command.
    RunCheck,
    /// Reset configuration to defaults.
    ResetConfig,
    /// Learn from more history before evaluating.
    CollectMoreData,
    /// Correct the input record and resubmit.
    FixInput,
    /// Manual intervention required.
    ManualIntervention,
}

impl std::fmt::Display for SuggestedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuggestedAction::Retry => write!(f, "retry"),
            SuggestedAction::RunCheck => write!(f, "run_check"),
            SuggestedAction::ResetConfig => write!(f, "reset_config"),
            SuggestedAction::CollectMoreData => write!(f, "collect_more_data"),
            SuggestedAction::FixInput => write!(f, "fix_input"),
            SuggestedAction::ManualIntervention => write!(f, "manual_intervention"),
        }
    }
}

/// Unified error type for Engine Health.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // Baseline errors (20-29)
    #[error("no usable baseline for vehicle {vehicle_id} in gear {gear}")]
    BaselineUnavailable { vehicle_id: VehicleId, gear: Gear },

    #[error(
        "baseline for vehicle {vehicle_id} in gear {gear} lacks valid statistics for: {}",
        format_metrics(.missing)
    )]
    InsufficientBaseline {
        vehicle_id: VehicleId,
        gear: Gear,
        missing: Vec<Metric>,
    },

    #[error("baseline persistence failed: {0}")]
    Persistence(String),

    // Sample errors (30-39)
    #[error("malformed sample: {0}")]
    MalformedSample(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

fn format_metrics(metrics: &[Metric]) -> String {
    metrics
        .iter()
        .map(Metric::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Baseline errors
    /// - 30-39: Sample errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidConfig(_) => 11,
            Error::BaselineUnavailable { .. } => 20,
            Error::InsufficientBaseline { .. } => 21,
            Error::Persistence(_) => 22,
            Error::MalformedSample(_) => 30,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::InvalidConfig(_) => ErrorCategory::Config,
            Error::BaselineUnavailable { .. }
            | Error::InsufficientBaseline { .. }
            | Error::Persistence(_) => ErrorCategory::Baseline,
            Error::MalformedSample(_) => ErrorCategory::Sample,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// True for the cold-start family: the key simply has not seen enough
    /// history yet. Never a verdict about the engine.
    pub fn is_cold_start(&self) -> bool {
        matches!(
            self,
            Error::BaselineUnavailable { .. } | Error::InsufficientBaseline { .. }
        )
    }

    /// Returns whether this error is potentially recoverable.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Config(_) => true,
            Error::InvalidConfig(_) => true,

            // More history resolves both
            Error::BaselineUnavailable { .. } => true,
            Error::InsufficientBaseline { .. } => true,
            Error::Persistence(_) => false,

            // The record itself is bad; resubmitting it unchanged won't help
            Error::MalformedSample(_) => false,

            Error::Io(_) => true,
            Error::Json(_) => false,
        }
    }

    /// Returns the suggested action for automated callers.
    pub fn suggested_action(&self) -> SuggestedAction {
        match self {
            Error::Config(_) => SuggestedAction::RunCheck,
            Error::InvalidConfig(_) => SuggestedAction::ResetConfig,
            Error::BaselineUnavailable { .. } => SuggestedAction::CollectMoreData,
            Error::InsufficientBaseline { .. } => SuggestedAction::CollectMoreData,
            Error::Persistence(_) => SuggestedAction::ManualIntervention,
            Error::MalformedSample(_) => SuggestedAction::FixInput,
            Error::Io(_) => SuggestedAction::Retry,
            Error::Json(_) => SuggestedAction::FixInput,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Config(_) => {
                "Run 'eh-core check' to validate configuration, or check syntax in engine.json."
            }
            Error::InvalidConfig(_) => {
                "Fix the reported field, or start from a preset with 'eh-core --preset standard config show'."
            }
            Error::BaselineUnavailable { .. } => {
                "Feed at least 10 historical samples for this vehicle and gear, then retry."
            }
            Error::InsufficientBaseline { .. } => {
                "Some metrics have too little history. Learn from more samples before evaluating."
            }
            Error::Persistence(_) => {
                "The baseline file is unreadable or from a newer version. Re-run 'eh-core learn' to regenerate it."
            }
            Error::MalformedSample(_) => {
                "Every sample needs vehicle_id, gear >= 1, and finite rpm, engine_temp, oil_pressure, vibration."
            }
            Error::Io(_) => "Check that the file exists and is readable, then retry.",
            Error::Json(_) => {
                "Invalid JSON in input. Check syntax with 'jq . <file>' or regenerate the file."
            }
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Config(_) => "Configuration Error",
            Error::InvalidConfig(_) => "Invalid Configuration",
            Error::BaselineUnavailable { .. } => "Not Enough Data Yet",
            Error::InsufficientBaseline { .. } => "Incomplete Baseline",
            Error::Persistence(_) => "Baseline File Error",
            Error::MalformedSample(_) => "Malformed Sample",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Parse Error",
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the error is potentially recoverable.
    pub recoverable: bool,

    /// Suggested action for automated callers.
    pub suggested_action: SuggestedAction,

    /// Additional structured context (e.g., vehicle id, gear).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::BaselineUnavailable { vehicle_id, gear } => {
                context.insert("vehicle_id".to_string(), serde_json::json!(vehicle_id));
                context.insert("gear".to_string(), serde_json::json!(gear));
            }
            Error::InsufficientBaseline {
                vehicle_id,
                gear,
                missing,
            } => {
                context.insert("vehicle_id".to_string(), serde_json::json!(vehicle_id));
                context.insert("gear".to_string(), serde_json::json!(gear));
                context.insert("missing".to_string(), serde_json::json!(missing));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            suggested_action: err.suggested_action(),
            context,
        }
    }
}

impl StructuredError {
    /// Add additional context to the error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}

/// Format an error for human-readable stderr output.
///
/// Output format:
/// ```text
/// ✗ [Headline]
///   Reason: [Error message]
///   Fix: [Remediation hint]
/// ```
pub fn format_error_human(err: &Error, use_color: bool) -> String {
    let (red, cyan, reset) = if use_color {
        ("\x1b[31m", "\x1b[36m", "\x1b[0m")
    } else {
        ("", "", "")
    };

    format!(
        "{red}✗{reset} {headline}\n  Reason: {message}\n  {cyan}Fix:{reset} {remediation}",
        red = red,
        cyan = cyan,
        reset = reset,
        headline = err.headline(),
        message = err,
        remediation = err.remediation()
    )
}
