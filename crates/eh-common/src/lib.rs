//! Engine Health common types, IDs, and errors.
//!
//! This crate provides foundational types shared across eh-core modules:
//! - Vehicle identity and the `(vehicle, gear)` baseline key
//! - Monitored metrics and the severity ordering
//! - Telemetry samples with validation
//! - Common error types
//! - Output format specifications

pub mod error;
pub mod id;
pub mod metric;
pub mod output;
pub mod sample;

pub use error::{Error, Result};
pub use id::{BaselineKey, Gear, VehicleId};
pub use metric::{Metric, MetricStatus, Severity};
pub use output::OutputFormat;
pub use sample::TelemetrySample;
