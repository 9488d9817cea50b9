//! Baseline learning from historical telemetry.
//!
//! Batch learning validates every sample first and only then folds, so a bad
//! record can never leave a half-updated baseline behind. Incremental updates
//! and merges use the parallel combination formula, which makes batch and
//! one-at-a-time learning converge to the same moments.

use std::collections::BTreeMap;

use eh_common::{BaselineKey, Error, Metric, Result, TelemetrySample};
use eh_config::LearnerConfig;
use eh_math::{RunningStats, VarianceKind};
use serde::{Deserialize, Serialize};

use super::{BaselineSnapshot, MetricBaseline, MetricBaselines};
use crate::logging::{event_names, Stage};

/// How a batch relates to the statistics already published for its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearnMode {
    /// Build the snapshot from this batch alone.
    #[default]
    Replace,
    /// Fold this batch into the previous statistics.
    Merge,
}

/// Four running accumulators, one per metric.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricAccumulator {
    stats: [RunningStats; 4],
}

impl MetricAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulators for an existing snapshot, or `None` if its stored
    /// moments are not a reachable state.
    pub fn from_snapshot(snapshot: &BaselineSnapshot) -> Option<Self> {
        let mut acc = Self::new();
        for (slot, metric) in acc.stats.iter_mut().zip(Metric::ALL) {
            *slot = snapshot.metric(metric).stats()?;
        }
        Some(acc)
    }

    /// Fold one (already validated) sample.
    pub fn push(&mut self, sample: &TelemetrySample) {
        for (slot, metric) in self.stats.iter_mut().zip(Metric::ALL) {
            slot.push(sample.value(metric));
        }
    }

    pub fn merge(&self, other: &MetricAccumulator) -> MetricAccumulator {
        let mut merged = *self;
        for (slot, theirs) in merged.stats.iter_mut().zip(other.stats.iter()) {
            *slot = slot.merge(theirs);
        }
        merged
    }

    pub fn stats(&self, metric: Metric) -> &RunningStats {
        &self.stats[metric_index(metric)]
    }

    /// Samples folded in.
    pub fn count(&self) -> u64 {
        self.stats[0].count()
    }

    pub fn to_baselines(&self, kind: VarianceKind) -> MetricBaselines {
        MetricBaselines::from_fn(|metric| MetricBaseline::from_stats(self.stats(metric), kind))
    }
}

fn metric_index(metric: Metric) -> usize {
    match metric {
        Metric::EngineTemp => 0,
        Metric::Rpm => 1,
        Metric::OilPressure => 2,
        Metric::Vibration => 3,
    }
}

/// Builds baseline snapshots from samples.
#[derive(Debug, Clone, Default)]
pub struct BaselineLearner {
    config: LearnerConfig,
}

impl BaselineLearner {
    pub fn new(config: LearnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LearnerConfig {
        &self.config
    }

    /// Learn a snapshot for `key` from this batch alone.
    pub fn learn(
        &self,
        key: &BaselineKey,
        samples: &[TelemetrySample],
    ) -> Result<BaselineSnapshot> {
        let acc = self.accumulate(key, samples)?;
        self.finish(key, acc, acc.count())
    }

    /// Fold an accumulated batch into the previous snapshot's statistics.
    ///
    /// Constant time in the batch size, so it is cheap enough to run under
    /// the store's entry lock.
    pub fn merge_into(
        &self,
        previous: Option<&BaselineSnapshot>,
        key: &BaselineKey,
        batch: &MetricAccumulator,
    ) -> Result<BaselineSnapshot> {
        let acc = match previous {
            Some(prev) => previous_accumulator(prev)?.merge(batch),
            None => *batch,
        };
        self.finish(key, acc, batch.count())
    }

    /// Fold a single sample into the previous snapshot's statistics.
    ///
    /// No window applies here: the previous snapshot only carries sufficient
    /// statistics, not the samples behind them.
    pub fn fold(
        &self,
        previous: Option<&BaselineSnapshot>,
        sample: &TelemetrySample,
    ) -> Result<BaselineSnapshot> {
        sample.validate()?;
        let key = sample.key();
        let mut acc = match previous {
            Some(prev) => previous_accumulator(prev)?,
            None => MetricAccumulator::new(),
        };
        acc.push(sample);
        self.snapshot(&key, &acc)
    }

    /// Partition a heterogeneous batch by key, keeping input order within
    /// each key.
    pub fn group_by_key(
        samples: &[TelemetrySample],
    ) -> BTreeMap<BaselineKey, Vec<TelemetrySample>> {
        let mut groups: BTreeMap<BaselineKey, Vec<TelemetrySample>> = BTreeMap::new();
        for sample in samples {
            groups.entry(sample.key()).or_default().push(sample.clone());
        }
        groups
    }

    /// Validate the whole batch, apply the window, accumulate.
    pub fn accumulate(
        &self,
        key: &BaselineKey,
        samples: &[TelemetrySample],
    ) -> Result<MetricAccumulator> {
        for (idx, sample) in samples.iter().enumerate() {
            if let Err(err) = check_sample(key, sample) {
                tracing::warn!(
                    target: event_names::BASELINE_SAMPLE_REJECTED,
                    stage = %Stage::Learn,
                    vehicle_id = %key.vehicle_id,
                    gear = key.gear,
                    index = idx,
                    error = %err,
                    "sample rejected; batch not applied"
                );
                return Err(err);
            }
        }

        let mut acc = MetricAccumulator::new();
        for sample in self.windowed(samples) {
            acc.push(sample);
        }
        Ok(acc)
    }

    /// The samples batch learning folds: all of them, or the most recent
    /// `window_size` by timestamp.
    fn windowed<'a>(&self, samples: &'a [TelemetrySample]) -> Vec<&'a TelemetrySample> {
        let mut ordered: Vec<&TelemetrySample> = samples.iter().collect();
        if let Some(window) = self.config.window_size {
            if ordered.len() > window {
                ordered.sort_by_key(|s| s.timestamp);
                let skip = ordered.len() - window;
                ordered.drain(..skip);
            }
        }
        ordered
    }

    /// Build the snapshot, refusing statistics that overflowed while
    /// folding.
    fn snapshot(&self, key: &BaselineKey, acc: &MetricAccumulator) -> Result<BaselineSnapshot> {
        let snapshot = BaselineSnapshot::new(
            key.clone(),
            self.config.variance,
            acc.to_baselines(self.config.variance),
        );
        if let Some(metric) = Metric::ALL
            .into_iter()
            .find(|m| !snapshot.metric(*m).is_finite())
        {
            tracing::warn!(
                target: event_names::BASELINE_SAMPLE_REJECTED,
                stage = %Stage::Learn,
                vehicle_id = %key.vehicle_id,
                gear = key.gear,
                metric = %metric,
                "statistics overflowed; baseline not published"
            );
            return Err(Error::MalformedSample(format!(
                "{} values for {} are too large to accumulate",
                metric, key
            )));
        }
        Ok(snapshot)
    }

    fn finish(
        &self,
        key: &BaselineKey,
        acc: MetricAccumulator,
        batch: u64,
    ) -> Result<BaselineSnapshot> {
        let snapshot = self.snapshot(key, &acc)?;
        let count = snapshot.sample_count();
        if snapshot.is_cold(self.config.min_samples) {
            tracing::warn!(
                target: event_names::BASELINE_SKIPPED_COLD_START,
                stage = %Stage::Learn,
                vehicle_id = %key.vehicle_id,
                gear = key.gear,
                count,
                min_samples = self.config.min_samples,
                "not enough samples for a usable baseline"
            );
        } else {
            tracing::info!(
                target: event_names::BASELINE_LEARNED,
                stage = %Stage::Learn,
                vehicle_id = %key.vehicle_id,
                gear = key.gear,
                count,
                batch,
                "baseline learned"
            );
        }
        Ok(snapshot)
    }
}

fn check_sample(key: &BaselineKey, sample: &TelemetrySample) -> Result<()> {
    sample.validate()?;
    if sample.vehicle_id != key.vehicle_id || sample.gear != key.gear {
        return Err(Error::MalformedSample(format!(
            "sample for {} in batch for {}",
            sample.key(),
            key
        )));
    }
    Ok(())
}

fn previous_accumulator(previous: &BaselineSnapshot) -> Result<MetricAccumulator> {
    MetricAccumulator::from_snapshot(previous).ok_or_else(|| {
        Error::Persistence(format!(
            "stored statistics for {} are not a reachable state",
            previous.key
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn sample(vehicle: &str, gear: u8, i: i64, rpm: f64) -> TelemetrySample {
        TelemetrySample {
            vehicle_id: vehicle.into(),
            gear,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(i),
            rpm,
            engine_temp: 90.0 + (i % 3) as f64,
            oil_pressure: 40.0 - (i % 4) as f64,
            vibration: 0.5 + (i % 5) as f64 * 0.01,
            speed: 30.0,
        }
    }

    fn batch(n: i64) -> Vec<TelemetrySample> {
        (0..n).map(|i| sample("VH_01", 1, i, 1500.0 + (i * 37 % 101) as f64)).collect()
    }

    #[test]
    fn learns_sample_statistics() {
        let learner = BaselineLearner::default();
        let key = BaselineKey::new("VH_01", 1);
        let samples: Vec<_> = [1.0, 2.0, 3.0, 4.0]
            .iter()
            .enumerate()
            .map(|(i, v)| sample("VH_01", 1, i as i64, *v))
            .collect();
        let snap = learner.learn(&key, &samples).unwrap();
        let rpm = snap.metric(Metric::Rpm);
        assert_eq!(rpm.count, 4);
        assert!((rpm.mean - 2.5).abs() < 1e-12);
        assert!((rpm.std_dev - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn cold_start_snapshot_is_invalid_not_error() {
        let learner = BaselineLearner::default();
        let key = BaselineKey::new("VH_01", 1);
        let snap = learner.learn(&key, &batch(9)).unwrap();
        assert!(snap.is_cold(10));
        let snap = learner.learn(&key, &batch(10)).unwrap();
        assert!(snap.invalid_metrics(10).is_empty());
    }

    #[test]
    fn malformed_sample_rejects_whole_batch() {
        let learner = BaselineLearner::default();
        let key = BaselineKey::new("VH_01", 1);
        let mut samples = batch(12);
        samples[5].oil_pressure = f64::NAN;
        let err = learner.learn(&key, &samples).unwrap_err();
        assert!(matches!(err, Error::MalformedSample(_)));
    }

    #[test]
    fn foreign_key_rejected() {
        let learner = BaselineLearner::default();
        let key = BaselineKey::new("VH_01", 1);
        let mut samples = batch(12);
        samples.push(sample("VH_01", 2, 99, 1500.0));
        assert!(matches!(
            learner.learn(&key, &samples),
            Err(Error::MalformedSample(_))
        ));
    }

    #[test]
    fn incremental_matches_batch() {
        let learner = BaselineLearner::default();
        let key = BaselineKey::new("VH_01", 1);
        let samples = batch(25);
        let batch_snap = learner.learn(&key, &samples).unwrap();

        let mut current: Option<BaselineSnapshot> = None;
        for s in &samples {
            current = Some(learner.fold(current.as_ref(), s).unwrap());
        }
        let inc = current.unwrap();
        for metric in Metric::ALL {
            let a = batch_snap.metric(metric);
            let b = inc.metric(metric);
            assert_eq!(a.count, b.count);
            assert!(eh_math::relative_eq(a.mean, b.mean, 1e-9));
            assert!(eh_math::relative_eq(a.std_dev, b.std_dev, 1e-9));
        }
    }

    #[test]
    fn merge_mode_extends_previous() {
        let learner = BaselineLearner::default();
        let key = BaselineKey::new("VH_01", 1);
        let samples = batch(30);
        let (first, second) = samples.split_at(12);
        let prev = learner.learn(&key, first).unwrap();
        let batch = learner.accumulate(&key, second).unwrap();
        let merged = learner.merge_into(Some(&prev), &key, &batch).unwrap();
        let whole = learner.learn(&key, &samples).unwrap();
        assert_eq!(merged.sample_count(), 30);
        assert!(eh_math::relative_eq(
            merged.metric(Metric::Rpm).std_dev,
            whole.metric(Metric::Rpm).std_dev,
            1e-9
        ));
    }

    #[test]
    fn overflowing_batch_is_malformed() {
        let learner = BaselineLearner::default();
        let key = BaselineKey::new("VH_01", 1);
        let samples: Vec<_> = (0..12)
            .map(|i| sample("VH_01", 1, i, if i % 2 == 0 { 1e200 } else { -1e200 }))
            .collect();
        match learner.learn(&key, &samples) {
            Err(Error::MalformedSample(msg)) => assert!(msg.contains("rpm")),
            other => panic!("expected MalformedSample, got {:?}", other),
        }
    }

    #[test]
    fn overflowing_fold_is_malformed() {
        let learner = BaselineLearner::default();
        let first = learner.fold(None, &sample("VH_01", 1, 0, 1e200)).unwrap();
        assert!(first.is_finite());
        assert!(matches!(
            learner.fold(Some(&first), &sample("VH_01", 1, 1, -1e200)),
            Err(Error::MalformedSample(_))
        ));
    }

    #[test]
    fn window_keeps_most_recent() {
        let learner = BaselineLearner::new(LearnerConfig {
            window_size: Some(10),
            ..LearnerConfig::default()
        });
        let key = BaselineKey::new("VH_01", 1);
        let mut samples: Vec<_> = (0..20).map(|i| sample("VH_01", 1, i, i as f64)).collect();
        samples.reverse();
        let snap = learner.learn(&key, &samples).unwrap();
        let rpm = snap.metric(Metric::Rpm);
        assert_eq!(rpm.count, 10);
        assert!((rpm.mean - 14.5).abs() < 1e-12);
    }

    #[test]
    fn group_by_key_partitions() {
        let mut samples = batch(3);
        samples.push(sample("VH_02", 1, 0, 1.0));
        samples.push(sample("VH_01", 4, 0, 1.0));
        let groups = BaselineLearner::group_by_key(&samples);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[&BaselineKey::new("VH_01", 1)].len(), 3);
    }
}
