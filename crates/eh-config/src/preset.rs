//! Configuration presets for common fleet profiles.
//!
//! Provides pre-built configurations for:
//! - Standard: the documented defaults
//! - Sensitive: earlier warnings, longer warm-up
//! - Relaxed: tolerant of noisy sensors and naturally variable engines

use crate::engine::{DetectorThresholds, EngineConfig, LearnerConfig, ScoringConfig};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Available configuration presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetName {
    /// Documented default thresholds and weights
    Standard,
    /// Tighter thresholds, more history before judging
    Sensitive,
    /// Wider thresholds for noisy telemetry
    Relaxed,
}

impl PresetName {
    /// All available preset names.
    pub const ALL: &'static [PresetName] = &[
        PresetName::Standard,
        PresetName::Sensitive,
        PresetName::Relaxed,
    ];

    /// Get preset name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PresetName::Standard => "standard",
            PresetName::Sensitive => "sensitive",
            PresetName::Relaxed => "relaxed",
        }
    }

    /// Parse preset name from string.
    pub fn parse(s: &str) -> Option<PresetName> {
        match s.to_lowercase().as_str() {
            "standard" | "default" => Some(PresetName::Standard),
            "sensitive" | "strict" => Some(PresetName::Sensitive),
            "relaxed" | "noisy" => Some(PresetName::Relaxed),
            _ => None,
        }
    }

    /// Get a description of the preset.
    pub fn description(&self) -> &'static str {
        match self {
            PresetName::Standard => "2σ/20% warning, 3.5σ/40% critical, 10-sample warm-up",
            PresetName::Sensitive => {
                "1.5σ/15% warning, 3σ/30% critical, 20-sample warm-up for early detection"
            }
            PresetName::Relaxed => "2.5σ/25% warning, 4σ/50% critical, for noisy sensors",
        }
    }
}

impl fmt::Display for PresetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PresetName {
    type Err = PresetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PresetName::parse(s).ok_or_else(|| PresetError::UnknownPreset(s.to_string()))
    }
}

/// Errors related to preset operations.
#[derive(Debug, Clone)]
pub enum PresetError {
    /// Unknown preset name.
    UnknownPreset(String),
}

impl fmt::Display for PresetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresetError::UnknownPreset(name) => {
                write!(
                    f,
                    "Unknown preset '{}'. Available: {}",
                    name,
                    PresetName::ALL
                        .iter()
                        .map(|p| p.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
        }
    }
}

impl std::error::Error for PresetError {}

/// Get the configuration for a preset.
pub fn get_preset(name: PresetName) -> EngineConfig {
    match name {
        PresetName::Standard => standard_preset(),
        PresetName::Sensitive => sensitive_preset(),
        PresetName::Relaxed => relaxed_preset(),
    }
}

fn standard_preset() -> EngineConfig {
    EngineConfig {
        description: Some("Standard preset: documented defaults".to_string()),
        ..EngineConfig::default()
    }
}

fn sensitive_preset() -> EngineConfig {
    EngineConfig {
        description: Some("Sensitive preset: early warnings".to_string()),
        learner: LearnerConfig {
            min_samples: 20,
            ..LearnerConfig::default()
        },
        detector: DetectorThresholds {
            warning_std: 1.5,
            critical_std: 3.0,
            warning_percent: 15.0,
            critical_percent: 30.0,
            ..DetectorThresholds::default()
        },
        scoring: ScoringConfig::default(),
        ..EngineConfig::default()
    }
}

fn relaxed_preset() -> EngineConfig {
    EngineConfig {
        description: Some("Relaxed preset: noisy telemetry".to_string()),
        learner: LearnerConfig::default(),
        detector: DetectorThresholds {
            warning_std: 2.5,
            critical_std: 4.0,
            warning_percent: 25.0,
            critical_percent: 50.0,
            ..DetectorThresholds::default()
        },
        scoring: ScoringConfig::default(),
        ..EngineConfig::default()
    }
}

/// Summary entry for `config presets`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetInfo {
    pub name: String,
    pub description: String,
}

/// List all presets with descriptions.
pub fn list_presets() -> Vec<PresetInfo> {
    PresetName::ALL
        .iter()
        .map(|p| PresetInfo {
            name: p.as_str().to_string(),
            description: p.description().to_string(),
        })
        .collect()
}
