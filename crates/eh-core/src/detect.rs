//! Per-metric deviation detection.
//!
//! A live value is compared against its metric baseline on two independent
//! bases, distance in std devs and distance as a percentage of the mean.
//! Each basis is classified against its own thresholds and the more severe
//! verdict wins.

use eh_common::{BaselineKey, Error, Metric, MetricStatus, Result, Severity, TelemetrySample};
use eh_config::DetectorThresholds;
use eh_math::abs_ratio;
use serde::{Serialize, Serializer};

use crate::baseline::{BaselineSnapshot, MetricBaseline};
use crate::logging::{event_names, Stage};

/// Where the live value sits relative to the learned mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Above,
    Below,
    AtMean,
}

impl Direction {
    fn of(value: f64, mean: f64) -> Self {
        if value > mean {
            Direction::Above
        } else if value < mean {
            Direction::Below
        } else {
            Direction::AtMean
        }
    }

    /// "higher" / "lower" wording for explanations.
    pub fn comparative(&self) -> &'static str {
        match self {
            Direction::Above => "higher",
            Direction::Below => "lower",
            Direction::AtMean => "no different",
        }
    }
}

/// Comparison of one live metric value against its baseline.
///
/// Non-finite numbers (the degenerate and zero-mean cases, or `Unknown`
/// results) serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviationResult {
    pub metric: Metric,
    #[serde(serialize_with = "finite_or_null")]
    pub current_value: f64,
    #[serde(serialize_with = "finite_or_null")]
    pub expected_mean: f64,
    #[serde(serialize_with = "finite_or_null")]
    pub expected_range_min: f64,
    #[serde(serialize_with = "finite_or_null")]
    pub expected_range_max: f64,
    #[serde(serialize_with = "finite_or_null")]
    pub deviation_percent: f64,
    #[serde(serialize_with = "finite_or_null")]
    pub deviation_std: f64,
    pub direction: Direction,
    pub status: MetricStatus,
    /// Baseline std dev is 0.
    pub degenerate: bool,
    pub baseline_count: u64,
}

impl DeviationResult {
    /// A result for a metric without a usable baseline.
    pub fn unknown(metric: Metric, current_value: f64, baseline_count: u64) -> Self {
        DeviationResult {
            metric,
            current_value,
            expected_mean: f64::NAN,
            expected_range_min: f64::NAN,
            expected_range_max: f64::NAN,
            deviation_percent: f64::NAN,
            deviation_std: f64::NAN,
            direction: Direction::AtMean,
            status: MetricStatus::Unknown,
            degenerate: false,
            baseline_count,
        }
    }

    pub fn severity(&self) -> Option<Severity> {
        self.status.severity()
    }
}

fn finite_or_null<S: Serializer>(
    value: &f64,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_some(value)
    } else {
        serializer.serialize_none()
    }
}

/// Classifies live metric values against learned baselines.
#[derive(Debug, Clone)]
pub struct DeviationDetector {
    thresholds: DetectorThresholds,
    min_samples: u64,
}

impl DeviationDetector {
    pub fn new(thresholds: DetectorThresholds, min_samples: u64) -> Self {
        Self {
            thresholds,
            min_samples,
        }
    }

    pub fn thresholds(&self) -> &DetectorThresholds {
        &self.thresholds
    }

    /// Classify a std-multiple distance. Thresholds are inclusive.
    pub fn classify_std(&self, deviation_std: f64) -> Severity {
        classify(deviation_std, self.thresholds.warning_std, self.thresholds.critical_std)
    }

    /// Classify a percentage distance. Thresholds are inclusive.
    pub fn classify_percent(&self, deviation_percent: f64) -> Severity {
        classify(
            deviation_percent,
            self.thresholds.warning_percent,
            self.thresholds.critical_percent,
        )
    }

    /// Compare one value against its baseline.
    ///
    /// Fails with `BaselineUnavailable` when the baseline is missing or has
    /// fewer than the minimum samples.
    pub fn detect_metric(
        &self,
        key: &BaselineKey,
        metric: Metric,
        current_value: f64,
        baseline: Option<&MetricBaseline>,
    ) -> Result<DeviationResult> {
        let baseline = match baseline {
            Some(b) if b.is_valid(self.min_samples) => b,
            _ => {
                return Err(Error::BaselineUnavailable {
                    vehicle_id: key.vehicle_id.clone(),
                    gear: key.gear,
                })
            }
        };

        let mean = baseline.mean;
        let std_dev = baseline.std_dev;
        let diff = current_value - mean;

        let degenerate = baseline.is_degenerate();
        let deviation_std = abs_ratio(diff, std_dev);
        let deviation_percent = abs_ratio(diff, mean) * 100.0;

        if degenerate && diff != 0.0 {
            tracing::debug!(
                target: event_names::DETECT_DEGENERATE_BASELINE,
                stage = %Stage::Detect,
                vehicle_id = %key.vehicle_id,
                gear = key.gear,
                metric = %metric,
                mean,
                current_value,
                "constant baseline; any deviation is critical on the std basis"
            );
        }

        let severity = self
            .classify_std(deviation_std)
            .max(self.classify_percent(deviation_percent));

        let half_width = self.thresholds.range_multiplier * std_dev;
        Ok(DeviationResult {
            metric,
            current_value,
            expected_mean: mean,
            expected_range_min: mean - half_width,
            expected_range_max: mean + half_width,
            deviation_percent,
            deviation_std,
            direction: Direction::of(current_value, mean),
            status: severity.into(),
            degenerate,
            baseline_count: baseline.count,
        })
    }

    /// All four metrics of a sample against a snapshot, in declaration
    /// order. Metrics without a usable baseline come back `Unknown`.
    pub fn analyze_sample(
        &self,
        sample: &TelemetrySample,
        snapshot: &BaselineSnapshot,
    ) -> [DeviationResult; 4] {
        Metric::ALL.map(|metric| {
            let value = sample.value(metric);
            let baseline = snapshot.metric(metric);
            self.detect_metric(&snapshot.key, metric, value, Some(baseline))
                .unwrap_or_else(|_| DeviationResult::unknown(metric, value, baseline.count))
        })
    }
}

fn classify(value: f64, warning: f64, critical: f64) -> Severity {
    if value >= critical {
        Severity::Critical
    } else if value >= warning {
        Severity::Warning
    } else {
        Severity::Normal
    }
}
