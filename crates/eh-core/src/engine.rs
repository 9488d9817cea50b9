//! The engine health service: learning and evaluation over a shared store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use eh_common::{BaselineKey, Error, Gear, Result, Severity, TelemetrySample, VehicleId};
use eh_config::EngineConfig;
use serde::Serialize;

use crate::baseline::{
    BaselineLearner, BaselineSnapshot, BaselineStore, LearnMode, PersistedBaselines,
};
use crate::detect::{DeviationDetector, DeviationResult};
use crate::explain::Explainer;
use crate::logging::{event_names, Stage};
use crate::score::{MetricScore, RiskScorer};

/// Result of one evaluation. Built fresh per call.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub vehicle_id: VehicleId,
    pub gear: Gear,
    pub timestamp: DateTime<Utc>,
    pub speed: f64,
    pub deviations: Vec<DeviationResult>,
    pub metric_scores: Vec<MetricScore>,
    pub engine_safety_score: f64,
    pub overall_status: Severity,
    pub explanation: String,
    pub recommendations: Vec<String>,
    pub baseline_version: u64,
}

/// Learns baselines and evaluates live samples against them.
///
/// Evaluation only reads shared state, so one instance can serve any number
/// of threads.
#[derive(Debug)]
pub struct EngineHealth {
    config: EngineConfig,
    store: BaselineStore,
    learner: BaselineLearner,
    detector: DeviationDetector,
    scorer: RiskScorer,
    explainer: Explainer,
}

impl EngineHealth {
    /// Build a service from a configuration. The configuration is validated
    /// first.
    pub fn new(config: EngineConfig) -> Result<Self> {
        eh_config::validate_engine(&config).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        let scorer = RiskScorer::new(&config.scoring, &config.detector)?;
        Ok(Self {
            learner: BaselineLearner::new(config.learner.clone()),
            detector: DeviationDetector::new(config.detector.clone(), config.learner.min_samples),
            scorer,
            explainer: Explainer::new(),
            store: BaselineStore::new(),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &BaselineStore {
        &self.store
    }

    /// Evaluate a live sample against the learned baseline for its key.
    pub fn evaluate(
        &self,
        vehicle_id: &VehicleId,
        gear: Gear,
        sample: &TelemetrySample,
    ) -> Result<EngineStatus> {
        sample.validate()?;
        let key = BaselineKey::new(vehicle_id.clone(), gear);
        if sample.key() != key {
            return Err(Error::MalformedSample(format!(
                "sample for {} evaluated as {}",
                sample.key(),
                key
            )));
        }

        let min_samples = self.config.learner.min_samples;
        let snapshot = match self.store.get(&key) {
            Some(snapshot) if !snapshot.is_cold(min_samples) => snapshot,
            found => {
                tracing::info!(
                    target: event_names::EVALUATE_BASELINE_UNAVAILABLE,
                    stage = %Stage::Detect,
                    vehicle_id = %key.vehicle_id,
                    gear = key.gear,
                    count = found.map_or(0, |s| s.sample_count()),
                    min_samples,
                    "not enough data yet"
                );
                return Err(Error::BaselineUnavailable {
                    vehicle_id: key.vehicle_id,
                    gear: key.gear,
                });
            }
        };

        let deviations = self.detector.analyze_sample(sample, &snapshot);
        let assessment = self.scorer.score(&key, &deviations).map_err(|err| {
            if let Error::InsufficientBaseline { missing, .. } = &err {
                tracing::info!(
                    target: event_names::EVALUATE_INSUFFICIENT_BASELINE,
                    stage = %Stage::Score,
                    vehicle_id = %key.vehicle_id,
                    gear = key.gear,
                    missing = ?missing,
                    "baseline incomplete"
                );
            }
            err
        })?;
        let explanation = self.explainer.explain(&assessment);

        let engine_safety_score = assessment.engine_safety_score();
        let overall_status = assessment.overall_status();
        tracing::info!(
            target: event_names::EVALUATE_FINISHED,
            stage = %Stage::Score,
            vehicle_id = %key.vehicle_id,
            gear = key.gear,
            score = engine_safety_score,
            status = %overall_status,
            baseline_version = snapshot.version,
            "evaluation finished"
        );

        let (deviations, metric_scores) = assessment.into_parts();
        Ok(EngineStatus {
            vehicle_id: key.vehicle_id,
            gear: key.gear,
            timestamp: sample.timestamp,
            speed: sample.speed,
            deviations,
            metric_scores,
            engine_safety_score,
            overall_status,
            explanation: explanation.text,
            recommendations: explanation.recommendations,
            baseline_version: snapshot.version,
        })
    }

    /// Learn a baseline for one key from a batch, replacing any previous one.
    ///
    /// An empty batch publishes nothing and returns `None`.
    pub fn learn(
        &self,
        vehicle_id: &VehicleId,
        gear: Gear,
        samples: &[TelemetrySample],
    ) -> Result<Option<Arc<BaselineSnapshot>>> {
        self.learn_with_mode(vehicle_id, gear, samples, LearnMode::Replace)
    }

    /// Learn a baseline for one key, replacing or merging.
    ///
    /// The batch is validated and accumulated before the store is touched;
    /// only the constant-time merge runs under the key's entry lock.
    pub fn learn_with_mode(
        &self,
        vehicle_id: &VehicleId,
        gear: Gear,
        samples: &[TelemetrySample],
        mode: LearnMode,
    ) -> Result<Option<Arc<BaselineSnapshot>>> {
        let key = BaselineKey::new(vehicle_id.clone(), gear);
        if samples.is_empty() {
            tracing::debug!(
                target: event_names::BASELINE_SKIPPED_COLD_START,
                stage = %Stage::Learn,
                vehicle_id = %key.vehicle_id,
                gear = key.gear,
                "empty batch; nothing published"
            );
            return Ok(None);
        }
        let published = match mode {
            LearnMode::Replace => {
                let snapshot = self.learner.learn(&key, samples)?;
                self.store.publish(snapshot)
            }
            LearnMode::Merge => {
                let batch = self.learner.accumulate(&key, samples)?;
                self.store
                    .update_with(&key, |prev| self.learner.merge_into(prev, &key, &batch))?
            }
        };
        Ok(Some(published))
    }

    /// Learn every key present in a heterogeneous batch.
    ///
    /// All samples are validated before anything is published.
    pub fn learn_batch(&self, samples: &[TelemetrySample]) -> Result<Vec<Arc<BaselineSnapshot>>> {
        for sample in samples {
            sample.validate()?;
        }
        let groups = BaselineLearner::group_by_key(samples);
        let mut learned = Vec::with_capacity(groups.len());
        for (key, group) in &groups {
            learned.push(self.learner.learn(key, group)?);
        }
        Ok(learned
            .into_iter()
            .map(|snapshot| self.store.publish(snapshot))
            .collect())
    }

    /// Fold one sample into the key's baseline and republish.
    pub fn update(
        &self,
        vehicle_id: &VehicleId,
        gear: Gear,
        sample: &TelemetrySample,
    ) -> Result<Arc<BaselineSnapshot>> {
        sample.validate()?;
        let key = BaselineKey::new(vehicle_id.clone(), gear);
        if sample.key() != key {
            return Err(Error::MalformedSample(format!(
                "sample for {} applied to {}",
                sample.key(),
                key
            )));
        }
        self.store
            .update_with(&key, |prev| self.learner.fold(prev, sample))
    }

    /// Serialize every current baseline.
    pub fn export_baselines(&self) -> Result<String> {
        let min_samples = self.config.learner.min_samples;
        let persisted = PersistedBaselines::from_store(&self.store, min_samples);
        let json = persisted.export_json()?;
        tracing::info!(
            target: event_names::BASELINES_EXPORTED,
            stage = %Stage::Persist,
            count = persisted.baseline_count(),
            total_observations = persisted.metadata.total_observations,
            "baselines exported"
        );
        Ok(json)
    }

    /// Load baselines and publish them. Std devs are re-derived from the
    /// stored M2 under this engine's variance convention. Returns the number
    /// imported.
    pub fn import_baselines(&self, json: &str) -> Result<usize> {
        let persisted = PersistedBaselines::import_json(json)?;
        Ok(persisted.publish_into(&self.store, self.config.learner.variance)?)
    }
}
