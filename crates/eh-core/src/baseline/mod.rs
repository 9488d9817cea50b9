//! Per-(vehicle, gear) baselines: data model, learning, storage, persistence.
//!
//! A baseline is the sufficient statistics `(count, mean, M2)` of each
//! monitored metric, plus the std dev derived from them under the configured
//! variance convention. Snapshots are immutable once published; a refresh
//! publishes a whole new snapshot.

pub mod learner;
pub mod persist;
pub mod store;

pub use learner::{BaselineLearner, LearnMode, MetricAccumulator};
pub use persist::{BaselinePersistError, PersistedBaselines};
pub use store::{BaselineStore, StoreStats};

use chrono::{DateTime, Utc};
use eh_common::{BaselineKey, Metric};
use eh_math::{RunningStats, VarianceKind};
use serde::{Deserialize, Serialize};

/// Learned statistics for one metric within one key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricBaseline {
    /// Samples folded into the statistics.
    pub count: u64,
    pub mean: f64,
    pub std_dev: f64,
    /// Sum of squared differences from the mean; kept so later batches and
    /// single samples can be merged without the raw history.
    pub m2: f64,
}

impl MetricBaseline {
    /// Derive a baseline from an accumulator. The std dev is 0 while the
    /// variance is undefined (such a baseline is never valid anyway).
    pub fn from_stats(stats: &RunningStats, kind: VarianceKind) -> Self {
        MetricBaseline {
            count: stats.count(),
            mean: stats.mean(),
            std_dev: stats.std_dev(kind).unwrap_or(0.0),
            m2: stats.m2(),
        }
    }

    /// Build from summary moments, reconstructing M2 for the given
    /// convention.
    pub fn from_moments(count: u64, mean: f64, std_dev: f64, kind: VarianceKind) -> Self {
        let divisor = match kind {
            VarianceKind::Population => count as f64,
            VarianceKind::Sample => count.saturating_sub(1) as f64,
        };
        MetricBaseline {
            count,
            mean,
            std_dev,
            m2: std_dev * std_dev * divisor,
        }
    }

    /// Rebuild the accumulator, or `None` if the stored moments are not a
    /// reachable state.
    pub fn stats(&self) -> Option<RunningStats> {
        RunningStats::from_parts(self.count, self.mean, self.m2)
    }

    /// Usable for classification.
    pub fn is_valid(&self, min_samples: u64) -> bool {
        self.count >= min_samples
    }

    /// Constant history: every non-identical reading is maximally deviant on
    /// the std basis.
    pub fn is_degenerate(&self) -> bool {
        self.std_dev == 0.0
    }

    /// Every stored moment is a finite number.
    pub fn is_finite(&self) -> bool {
        self.mean.is_finite() && self.std_dev.is_finite() && self.m2.is_finite()
    }

    /// Structural sanity for data arriving from outside (imports): finite
    /// moments, and a std dev that is the one `m2` gives under `kind`.
    pub fn is_well_formed(&self, kind: VarianceKind) -> bool {
        if !self.is_finite() || self.std_dev < 0.0 {
            return false;
        }
        match self.stats() {
            Some(stats) => {
                let derived = stats.std_dev(kind).unwrap_or(0.0);
                eh_math::relative_eq(self.std_dev, derived, 1e-9)
            }
            None => false,
        }
    }

    /// The same statistics with the std dev re-derived under `kind`.
    pub fn rebased(&self, kind: VarianceKind) -> Option<Self> {
        self.stats().map(|stats| MetricBaseline::from_stats(&stats, kind))
    }
}

/// The four metric baselines for one key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricBaselines {
    pub engine_temp: MetricBaseline,
    pub rpm: MetricBaseline,
    pub oil_pressure: MetricBaseline,
    pub vibration: MetricBaseline,
}

impl MetricBaselines {
    pub fn get(&self, metric: Metric) -> &MetricBaseline {
        match metric {
            Metric::EngineTemp => &self.engine_temp,
            Metric::Rpm => &self.rpm,
            Metric::OilPressure => &self.oil_pressure,
            Metric::Vibration => &self.vibration,
        }
    }

    fn get_mut(&mut self, metric: Metric) -> &mut MetricBaseline {
        match metric {
            Metric::EngineTemp => &mut self.engine_temp,
            Metric::Rpm => &mut self.rpm,
            Metric::OilPressure => &mut self.oil_pressure,
            Metric::Vibration => &mut self.vibration,
        }
    }

    /// Build from a per-metric constructor, in declaration order.
    pub fn from_fn(mut f: impl FnMut(Metric) -> MetricBaseline) -> Self {
        MetricBaselines {
            engine_temp: f(Metric::EngineTemp),
            rpm: f(Metric::Rpm),
            oil_pressure: f(Metric::OilPressure),
            vibration: f(Metric::Vibration),
        }
    }
}

/// Immutable learned baseline for one `(vehicle, gear)` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineSnapshot {
    pub key: BaselineKey,
    /// Per-key publication counter; 0 until published.
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    /// Convention the std devs were derived with.
    pub variance: VarianceKind,
    pub metrics: MetricBaselines,
}

impl BaselineSnapshot {
    /// An unpublished snapshot.
    pub fn new(key: BaselineKey, variance: VarianceKind, metrics: MetricBaselines) -> Self {
        BaselineSnapshot {
            key,
            version: 0,
            published_at: None,
            variance,
            metrics,
        }
    }

    pub fn metric(&self, metric: Metric) -> &MetricBaseline {
        self.metrics.get(metric)
    }

    /// Metrics without enough history, in declaration order.
    pub fn invalid_metrics(&self, min_samples: u64) -> Vec<Metric> {
        Metric::ALL
            .into_iter()
            .filter(|m| !self.metric(*m).is_valid(min_samples))
            .collect()
    }

    /// Every metric is below the sample minimum.
    pub fn is_cold(&self, min_samples: u64) -> bool {
        self.invalid_metrics(min_samples).len() == Metric::ALL.len()
    }

    /// Every metric's moments are finite.
    pub fn is_finite(&self) -> bool {
        Metric::ALL.iter().all(|m| self.metric(*m).is_finite())
    }

    /// A copy whose std devs follow `kind`, or `None` if some metric's
    /// moments are not a reachable state.
    pub fn rebased(&self, kind: VarianceKind) -> Option<BaselineSnapshot> {
        let mut metrics = self.metrics.clone();
        for metric in Metric::ALL {
            let rebased = self.metric(metric).rebased(kind)?;
            *metrics.get_mut(metric) = rebased;
        }
        Some(BaselineSnapshot {
            variance: kind,
            metrics,
            ..self.clone()
        })
    }

    /// Samples behind this snapshot (the largest per-metric count).
    pub fn sample_count(&self) -> u64 {
        Metric::ALL
            .iter()
            .map(|m| self.metric(*m).count)
            .max()
            .unwrap_or(0)
    }
}
