//! Structured event names and pipeline stages for logging.
//!
//! Library code emits every event with `target: <event name>` and a `stage`
//! field, so JSONL consumers can filter on stable keys.

use serde::{Deserialize, Serialize};

/// Stages of the engine health pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup and configuration.
    Init,
    /// Baseline learning and publication.
    Learn,
    /// Per-metric deviation classification.
    Detect,
    /// Composite risk scoring.
    Score,
    /// Explanation rendering.
    Explain,
    /// Baseline export/import.
    Persist,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Learn => "learn",
            Stage::Detect => "detect",
            Stage::Score => "score",
            Stage::Explain => "explain",
            Stage::Persist => "persist",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names used in logging.
pub mod event_names {
    // Run lifecycle
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    // Learn stage
    pub const BASELINE_LEARNED: &str = "baseline.learned";
    pub const BASELINE_PUBLISHED: &str = "baseline.published";
    pub const BASELINE_SKIPPED_COLD_START: &str = "baseline.skipped_cold_start";
    pub const BASELINE_SAMPLE_REJECTED: &str = "baseline.sample_rejected";

    // Evaluate stages
    pub const EVALUATE_FINISHED: &str = "evaluate.finished";
    pub const EVALUATE_BASELINE_UNAVAILABLE: &str = "evaluate.baseline_unavailable";
    pub const EVALUATE_INSUFFICIENT_BASELINE: &str = "evaluate.insufficient_baseline";
    pub const DETECT_DEGENERATE_BASELINE: &str = "detect.degenerate_baseline";

    // Persistence
    pub const BASELINES_EXPORTED: &str = "baselines.exported";
    pub const BASELINES_IMPORTED: &str = "baselines.imported";

    // Config/init events
    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_DEFAULT_USED: &str = "config.default_used";
    pub const CONFIG_ERROR: &str = "config.error";
}
