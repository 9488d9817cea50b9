//! Engine health configuration types.
//!
//! Every field has a default, so a partial engine.json only needs the keys
//! it overrides.

use eh_common::Metric;
use eh_math::VarianceKind;
use serde::{Deserialize, Serialize};

use crate::validate::ValidationError;

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub learner: LearnerConfig,

    #[serde(default)]
    pub detector: DetectorThresholds,

    #[serde(default)]
    pub scoring: ScoringConfig,
}

fn default_schema_version() -> String {
    crate::CONFIG_SCHEMA_VERSION.to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            description: None,
            learner: LearnerConfig::default(),
            detector: DetectorThresholds::default(),
            scoring: ScoringConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ValidationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::from_str(&content)
    }

    /// Parse configuration from a JSON string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(json: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(json)
            .map_err(|e| ValidationError::ParseError(format!("Invalid JSON: {}", e)))
    }
}

/// Baseline learner settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerConfig {
    /// Samples required before a metric baseline may classify anything.
    #[serde(default = "default_min_samples")]
    pub min_samples: u64,

    /// Variance divisor convention, applied everywhere a std dev is derived.
    #[serde(default)]
    pub variance: VarianceKind,

    /// When set, batch learning keeps only the most recent N samples per key.
    #[serde(default)]
    pub window_size: Option<usize>,
}

fn default_min_samples() -> u64 {
    10
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            min_samples: default_min_samples(),
            variance: VarianceKind::Sample,
            window_size: None,
        }
    }
}

/// Dual-basis classification thresholds. All comparisons are inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorThresholds {
    #[serde(default = "default_warning_std")]
    pub warning_std: f64,

    #[serde(default = "default_critical_std")]
    pub critical_std: f64,

    #[serde(default = "default_warning_percent")]
    pub warning_percent: f64,

    #[serde(default = "default_critical_percent")]
    pub critical_percent: f64,

    /// Half-width of the reported expected range, in std devs.
    #[serde(default = "default_range_multiplier")]
    pub range_multiplier: f64,
}

fn default_warning_std() -> f64 {
    2.0
}
fn default_critical_std() -> f64 {
    3.5
}
fn default_warning_percent() -> f64 {
    20.0
}
fn default_critical_percent() -> f64 {
    40.0
}
fn default_range_multiplier() -> f64 {
    2.0
}

impl Default for DetectorThresholds {
    fn default() -> Self {
        Self {
            warning_std: default_warning_std(),
            critical_std: default_critical_std(),
            warning_percent: default_warning_percent(),
            critical_percent: default_critical_percent(),
            range_multiplier: default_range_multiplier(),
        }
    }
}

/// Risk scoring: per-metric weights, curve anchors, and status floors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ScoringConfig {
    #[serde(default)]
    pub weights: ScoringWeights,

    #[serde(default)]
    pub anchors: ScoreAnchors,
}

/// Composite weights. Must sum to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    #[serde(alias = "temp")]
    pub engine_temp: f64,
    pub rpm: f64,
    pub oil_pressure: f64,
    pub vibration: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            engine_temp: 0.30,
            rpm: 0.25,
            oil_pressure: 0.25,
            vibration: 0.20,
        }
    }
}

impl ScoringWeights {
    pub fn weight(&self, metric: Metric) -> f64 {
        match metric {
            Metric::EngineTemp => self.engine_temp,
            Metric::Rpm => self.rpm,
            Metric::OilPressure => self.oil_pressure,
            Metric::Vibration => self.vibration,
        }
    }

    pub fn sum(&self) -> f64 {
        Metric::ALL.iter().map(|m| self.weight(*m)).sum()
    }
}

/// Per-metric score at severity positions 0 (on the mean), 1 (Warning
/// boundary) and 2 (Critical boundary); the score reaches 0 at `zero_at`.
///
/// `warning` and `critical` also serve as the composite floors for
/// overall Normal and Warning status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreAnchors {
    #[serde(default = "default_anchor_normal")]
    pub normal: f64,

    #[serde(default = "default_anchor_warning")]
    pub warning: f64,

    #[serde(default = "default_anchor_critical")]
    pub critical: f64,

    #[serde(default = "default_zero_at")]
    pub zero_at: f64,
}

fn default_anchor_normal() -> f64 {
    100.0
}
fn default_anchor_warning() -> f64 {
    85.0
}
fn default_anchor_critical() -> f64 {
    60.0
}
fn default_zero_at() -> f64 {
    3.0
}

impl Default for ScoreAnchors {
    fn default() -> Self {
        Self {
            normal: default_anchor_normal(),
            warning: default_anchor_warning(),
            critical: default_anchor_critical(),
            zero_at: default_zero_at(),
        }
    }
}
