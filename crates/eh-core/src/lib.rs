//! Engine Health core library.
//!
//! Learns what "normal" looks like for each vehicle in each gear, compares
//! live telemetry against it, and turns the comparison into a bounded safety
//! score with a readable explanation.

pub mod baseline;
pub mod config;
pub mod detect;
pub mod engine;
pub mod exit_codes;
pub mod explain;
pub mod logging;
pub mod output;
pub mod score;

pub use baseline::{BaselineSnapshot, BaselineStore, MetricBaseline};
pub use detect::{DeviationDetector, DeviationResult, Direction};
pub use engine::{EngineHealth, EngineStatus};
pub use explain::{Explainer, Explanation};
pub use score::{RiskScorer, ScoredAssessment};
