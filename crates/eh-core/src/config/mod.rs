//! Configuration loading and validation for eh-core.
//!
//! This module handles:
//! - Loading engine.json
//! - Config resolution order (CLI > preset > env > XDG > system > defaults)
//! - Semantic validation (threshold ordering, weight sums)
//! - Config snapshot generation for evaluation output

pub use eh_config::preset::{get_preset, list_presets, PresetError, PresetInfo, PresetName};
pub use eh_config::validate::ValidationError;
pub use eh_config::{ConfigSnapshot, ConfigSource, EngineConfig, CONFIG_SCHEMA_VERSION};

use eh_config::resolve::{resolve_config, ConfigPaths};
use eh_config::validate::validate_engine;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::logging::{event_names, Stage};

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Invalid JSON in config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Semantic validation failed: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("I/O error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    UnknownPreset(#[from] PresetError),
}

impl From<ConfigError> for eh_common::Error {
    fn from(err: ConfigError) -> Self {
        let message = err.to_string();
        match err {
            ConfigError::ValidationError(_) => eh_common::Error::InvalidConfig(message),
            _ => eh_common::Error::Config(message),
        }
    }
}

/// Resolved configuration with provenance information.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The effective configuration.
    pub engine: EngineConfig,
    /// Where the file was found (if any) and how.
    pub paths: ConfigPaths,
    /// Raw file content, kept for hashing.
    raw: Option<String>,
    /// Preset name, when selected.
    pub preset: Option<PresetName>,
}

impl ResolvedConfig {
    /// Create a config snapshot for evaluation output.
    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot::new(
            &self.engine,
            &self.paths,
            self.raw.as_deref(),
            self.preset.map(|p| p.as_str()),
        )
    }

    /// Builtin defaults, no file involved.
    pub fn defaults() -> Self {
        ResolvedConfig {
            engine: EngineConfig::default(),
            paths: ConfigPaths::default(),
            raw: None,
            preset: None,
        }
    }
}

/// Configuration resolution options.
#[derive(Debug, Default)]
pub struct ConfigOptions {
    /// Explicit engine.json path (highest priority; must exist).
    pub config_path: Option<PathBuf>,
    /// Builtin preset, used when no explicit path is given.
    pub preset: Option<String>,
}

/// Load configuration with the standard resolution order.
///
/// Resolution order (highest to lowest priority):
/// 1. Explicit `--config` path
/// 2. `--preset` name
/// 3. ENGINE_HEALTH_CONFIG / ENGINE_HEALTH_CONFIG_DIR
/// 4. XDG config home (~/.config/engine-health/engine.json)
/// 5. /etc/engine-health/engine.json
/// 6. Built-in defaults
pub fn load_config(options: &ConfigOptions) -> Result<ResolvedConfig, ConfigError> {
    if let Some(path) = &options.config_path {
        if !path.exists() {
            return Err(ConfigError::NotFound { path: path.clone() });
        }
    }

    let resolved = match (&options.config_path, &options.preset) {
        (None, Some(name)) => {
            let preset: PresetName = name.parse()?;
            ResolvedConfig {
                engine: get_preset(preset),
                paths: ConfigPaths {
                    engine: None,
                    source: ConfigSource::Preset,
                },
                raw: None,
                preset: Some(preset),
            }
        }
        (explicit, _) => {
            let paths = resolve_config(explicit.as_deref());
            match &paths.engine {
                Some(path) => {
                    let (engine, raw) = load_engine_from_file(path)?;
                    ResolvedConfig {
                        engine,
                        paths,
                        raw: Some(raw),
                        preset: None,
                    }
                }
                None => {
                    tracing::debug!(
                        target: event_names::CONFIG_DEFAULT_USED,
                        stage = %Stage::Init,
                        "no engine.json found; using builtin defaults"
                    );
                    ResolvedConfig::defaults()
                }
            }
        }
    };

    validate_engine(&resolved.engine)?;

    tracing::info!(
        target: event_names::CONFIG_LOADED,
        stage = %Stage::Init,
        source = %resolved.paths.source,
        path = ?resolved.paths.engine,
        preset = ?resolved.preset.map(|p| p.as_str()),
        "configuration loaded"
    );

    Ok(resolved)
}

/// Load engine configuration from a specific file.
fn load_engine_from_file(path: &Path) -> Result<(EngineConfig, String), ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let engine: EngineConfig =
        serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok((engine, content))
}
