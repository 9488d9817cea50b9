//! Engine Health configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for engine.json (learner, detector, scoring)
//! - Built-in presets
//! - Config resolution (CLI → env → XDG → system → defaults)
//! - Semantic validation
//! - Config snapshots for reproducible evaluations

pub mod engine;
pub mod preset;
pub mod resolve;
pub mod snapshot;
pub mod validate;

pub use engine::{
    DetectorThresholds, EngineConfig, LearnerConfig, ScoreAnchors, ScoringConfig, ScoringWeights,
};
pub use preset::{get_preset, list_presets, PresetName};
pub use resolve::{resolve_config, ConfigPaths, ConfigSource};
pub use snapshot::ConfigSnapshot;
pub use validate::{validate_engine, ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
