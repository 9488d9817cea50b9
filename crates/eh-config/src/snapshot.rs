//! Configuration snapshots for reproducible evaluations.
//!
//! A snapshot captures the exact configuration a run used, so a verdict can
//! be traced back to the thresholds that produced it.

use chrono::{DateTime, Utc};
use eh_math::VarianceKind;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::engine::EngineConfig;
use crate::resolve::ConfigPaths;

/// A frozen snapshot of configuration state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// When this snapshot was taken.
    pub timestamp: DateTime<Utc>,

    /// Schema version of the configuration.
    pub schema_version: String,

    /// SHA-256 of the raw file content, when loaded from a file.
    #[serde(default)]
    pub file_hash: Option<String>,

    /// SHA-256 of the effective configuration serialized as JSON.
    pub effective_hash: String,

    /// Path where the configuration was loaded from.
    #[serde(default)]
    pub path: Option<String>,

    /// Source of the configuration.
    pub source: String,

    /// Preset name, when one was selected.
    #[serde(default)]
    pub preset: Option<String>,

    /// Key configuration values for quick reference.
    pub summary: ConfigSummary,
}

/// Summary of key configuration values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub min_samples: u64,
    pub variance: VarianceKind,
    pub window_size: Option<usize>,
    pub warning_std: f64,
    pub critical_std: f64,
    pub warning_percent: f64,
    pub critical_percent: f64,
    pub weights: [f64; 4],
}

impl ConfigSnapshot {
    /// Create a snapshot of the effective configuration.
    pub fn new(
        config: &EngineConfig,
        paths: &ConfigPaths,
        raw_json: Option<&str>,
        preset: Option<&str>,
    ) -> Self {
        let effective = serde_json::to_string(config).unwrap_or_default();

        ConfigSnapshot {
            timestamp: Utc::now(),
            schema_version: config.schema_version.clone(),
            file_hash: raw_json.map(hash_content),
            effective_hash: hash_content(&effective),
            path: paths.engine.as_ref().map(|p| p.display().to_string()),
            source: paths.source.to_string(),
            preset: preset.map(str::to_string),
            summary: build_summary(config),
        }
    }

    /// Compare two snapshots by effective configuration.
    pub fn same_config(&self, other: &ConfigSnapshot) -> bool {
        self.effective_hash == other.effective_hash
    }
}

fn build_summary(config: &EngineConfig) -> ConfigSummary {
    let w = &config.scoring.weights;
    ConfigSummary {
        min_samples: config.learner.min_samples,
        variance: config.learner.variance,
        window_size: config.learner.window_size,
        warning_std: config.detector.warning_std,
        critical_std: config.detector.critical_std,
        warning_percent: config.detector.warning_percent,
        critical_percent: config.detector.critical_percent,
        weights: [w.engine_temp, w.rpm, w.oil_pressure, w.vibration],
    }
}

/// Compute SHA-256 hash of content, hex-encoded.
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
