//! Monitored metrics and severity ordering.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The four monitored engine metrics.
///
/// Declaration order (temp, rpm, oil pressure, vibration) is the fixed
/// tie-break order used when ranking metrics of equal severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    EngineTemp,
    Rpm,
    OilPressure,
    Vibration,
}

impl Metric {
    /// All metrics in declaration order.
    pub const ALL: [Metric; 4] = [
        Metric::EngineTemp,
        Metric::Rpm,
        Metric::OilPressure,
        Metric::Vibration,
    ];

    /// Stable machine name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::EngineTemp => "engine_temp",
            Metric::Rpm => "rpm",
            Metric::OilPressure => "oil_pressure",
            Metric::Vibration => "vibration",
        }
    }

    /// Human-facing name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Metric::EngineTemp => "Engine Temperature",
            Metric::Rpm => "RPM",
            Metric::OilPressure => "Oil Pressure",
            Metric::Vibration => "Vibration",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Metric::EngineTemp => "°C",
            Metric::Rpm => "rpm",
            Metric::OilPressure => "psi",
            Metric::Vibration => "g",
        }
    }

    pub fn parse(s: &str) -> Option<Metric> {
        match s.to_lowercase().as_str() {
            "engine_temp" | "temp" | "temperature" | "engine_temp_c" => Some(Metric::EngineTemp),
            "rpm" => Some(Metric::Rpm),
            "oil_pressure" | "oil" | "oil_pressure_psi" => Some(Metric::OilPressure),
            "vibration" => Some(Metric::Vibration),
            _ => None,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ordered classification: `Normal < Warning < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Severity {
    #[default]
    Normal,
    Warning,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Normal, Severity::Warning, Severity::Critical];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Normal => "Normal",
            Severity::Warning => "Warning",
            Severity::Critical => "Critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-metric verdict, including the no-baseline case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricStatus {
    Normal,
    Warning,
    Critical,
    /// No valid baseline; never fabricated into a score.
    Unknown,
}

impl MetricStatus {
    /// The severity, or `None` for `Unknown`.
    pub fn severity(&self) -> Option<Severity> {
        match self {
            MetricStatus::Normal => Some(Severity::Normal),
            MetricStatus::Warning => Some(Severity::Warning),
            MetricStatus::Critical => Some(Severity::Critical),
            MetricStatus::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, MetricStatus::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricStatus::Normal => "Normal",
            MetricStatus::Warning => "Warning",
            MetricStatus::Critical => "Critical",
            MetricStatus::Unknown => "Unknown",
        }
    }
}

impl From<Severity> for MetricStatus {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Normal => MetricStatus::Normal,
            Severity::Warning => MetricStatus::Warning,
            Severity::Critical => MetricStatus::Critical,
        }
    }
}

impl fmt::Display for MetricStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
