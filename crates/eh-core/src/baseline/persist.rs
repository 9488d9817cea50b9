//! Baseline export and import.
//!
//! Serializes the store's current snapshots to a versioned JSON document and
//! loads them back. Imported snapshots are published by replacement, so a
//! reader mid-evaluation keeps whatever it already holds.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use eh_math::VarianceKind;

use super::{BaselineSnapshot, BaselineStore};
use crate::logging::{event_names, Stage};

const CURRENT_SCHEMA_VERSION: u32 = 1;

/// On-disk format for persisted baselines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedBaselines {
    /// Schema version for backward compatibility.
    pub schema_version: u32,
    pub exported_at: DateTime<Utc>,
    pub snapshots: Vec<BaselineSnapshot>,
    #[serde(default)]
    pub metadata: BaselineMetadata,
}

/// Provenance metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BaselineMetadata {
    /// Samples behind all exported snapshots.
    pub total_observations: u64,
    /// Keys with every metric usable at export time.
    pub ready_keys: usize,
    /// Minimum sample count in force at export time.
    #[serde(default)]
    pub min_samples: Option<u64>,
    /// When this document was last imported.
    #[serde(default)]
    pub imported_at: Option<DateTime<Utc>>,
}

/// Error from baseline persistence operations.
#[derive(Debug, Error)]
pub enum BaselinePersistError {
    #[error("Schema version mismatch: expected {expected} or older, found {found}")]
    SchemaMismatch { expected: u32, found: u32 },

    #[error("Serialize error: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Deserialize error: {0}")]
    Deserialize(#[source] serde_json::Error),

    #[error("No baseline data to export")]
    NoData,

    #[error("Invalid snapshot for {key}: {reason}")]
    InvalidSnapshot { key: String, reason: String },
}

impl From<BaselinePersistError> for eh_common::Error {
    fn from(err: BaselinePersistError) -> Self {
        eh_common::Error::Persistence(err.to_string())
    }
}

impl PersistedBaselines {
    /// Capture the store's current snapshots.
    pub fn from_store(store: &BaselineStore, min_samples: u64) -> Self {
        let snapshots: Vec<BaselineSnapshot> = store
            .snapshots()
            .iter()
            .map(|s| s.as_ref().clone())
            .collect();
        let metadata = BaselineMetadata {
            total_observations: snapshots.iter().map(|s| s.sample_count()).sum(),
            ready_keys: snapshots
                .iter()
                .filter(|s| s.invalid_metrics(min_samples).is_empty())
                .count(),
            min_samples: Some(min_samples),
            imported_at: None,
        };
        PersistedBaselines {
            schema_version: CURRENT_SCHEMA_VERSION,
            exported_at: Utc::now(),
            snapshots,
            metadata,
        }
    }

    /// Export to a JSON string.
    pub fn export_json(&self) -> Result<String, BaselinePersistError> {
        if self.snapshots.is_empty() {
            return Err(BaselinePersistError::NoData);
        }
        serde_json::to_string_pretty(self).map_err(BaselinePersistError::Serialize)
    }

    /// Import from a JSON string, checking version and snapshot integrity.
    pub fn import_json(json: &str) -> Result<Self, BaselinePersistError> {
        let mut state: PersistedBaselines =
            serde_json::from_str(json).map_err(BaselinePersistError::Deserialize)?;

        if state.schema_version > CURRENT_SCHEMA_VERSION {
            return Err(BaselinePersistError::SchemaMismatch {
                expected: CURRENT_SCHEMA_VERSION,
                found: state.schema_version,
            });
        }

        let mut seen = BTreeSet::new();
        for snapshot in &state.snapshots {
            if !seen.insert(snapshot.key.clone()) {
                return Err(BaselinePersistError::InvalidSnapshot {
                    key: snapshot.key.to_string(),
                    reason: "duplicate key".to_string(),
                });
            }
            if !snapshot.key.vehicle_id.is_valid() || snapshot.key.gear == 0 {
                return Err(BaselinePersistError::InvalidSnapshot {
                    key: snapshot.key.to_string(),
                    reason: "invalid key".to_string(),
                });
            }
            for metric in eh_common::Metric::ALL {
                if !snapshot.metric(metric).is_well_formed(snapshot.variance) {
                    return Err(BaselinePersistError::InvalidSnapshot {
                        key: snapshot.key.to_string(),
                        reason: format!("{} statistics are not well formed", metric),
                    });
                }
            }
        }

        state.metadata.imported_at = Some(Utc::now());
        Ok(state)
    }

    /// Publish every snapshot into the store with its std devs re-derived
    /// under `variance`. Nothing is published unless every snapshot can be
    /// rebased. Returns the number published.
    pub fn publish_into(
        &self,
        store: &BaselineStore,
        variance: VarianceKind,
    ) -> Result<usize, BaselinePersistError> {
        let rebased = self
            .snapshots
            .iter()
            .map(|snapshot| {
                snapshot
                    .rebased(variance)
                    .ok_or_else(|| BaselinePersistError::InvalidSnapshot {
                        key: snapshot.key.to_string(),
                        reason: "statistics are not a reachable state".to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let converted = self
            .snapshots
            .iter()
            .filter(|s| s.variance != variance)
            .count();
        if converted > 0 {
            tracing::warn!(
                target: event_names::BASELINES_IMPORTED,
                stage = %Stage::Persist,
                converted,
                variance = ?variance,
                "imported baselines re-derived under the configured variance convention"
            );
        }

        let count = rebased.len();
        for snapshot in rebased {
            store.publish(snapshot);
        }
        tracing::info!(
            target: event_names::BASELINES_IMPORTED,
            stage = %Stage::Persist,
            count,
            "baselines imported"
        );
        Ok(count)
    }

    pub fn baseline_count(&self) -> usize {
        self.snapshots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::{MetricBaseline, MetricBaselines};
    use eh_common::{BaselineKey, Metric};

    fn snapshot(vehicle: &str, gear: u8, count: u64) -> BaselineSnapshot {
        BaselineSnapshot::new(
            BaselineKey::new(vehicle, gear),
            VarianceKind::Sample,
            MetricBaselines::from_fn(|_| {
                MetricBaseline::from_moments(count, 100.0, 5.0, VarianceKind::Sample)
            }),
        )
    }

    #[test]
    fn test_export_import_roundtrip() {
        let store = BaselineStore::new();
        store.publish(snapshot("VH_01", 1, 40));
        store.publish(snapshot("VH_02", 3, 4));

        let exported = PersistedBaselines::from_store(&store, 10);
        assert_eq!(exported.metadata.total_observations, 44);
        assert_eq!(exported.metadata.ready_keys, 1);
        let json = exported.export_json().unwrap();

        let imported = PersistedBaselines::import_json(&json).unwrap();
        assert_eq!(imported.baseline_count(), 2);
        assert!(imported.metadata.imported_at.is_some());

        let target = BaselineStore::new();
        assert_eq!(imported.publish_into(&target, VarianceKind::Sample).unwrap(), 2);
        let snap = target.get(&BaselineKey::new("VH_01", 1)).unwrap();
        assert_eq!(snap.metric(Metric::Rpm).count, 40);
        assert_eq!(snap.version, 1);
    }

    #[test]
    fn test_export_empty_fails() {
        let store = BaselineStore::new();
        let err = PersistedBaselines::from_store(&store, 10)
            .export_json()
            .unwrap_err();
        assert!(matches!(err, BaselinePersistError::NoData));
    }

    #[test]
    fn test_schema_version_check() {
        let store = BaselineStore::new();
        store.publish(snapshot("VH_01", 1, 40));
        let mut state = PersistedBaselines::from_store(&store, 10);
        state.schema_version = 999;
        let json = serde_json::to_string(&state).unwrap();
        match PersistedBaselines::import_json(&json).unwrap_err() {
            BaselinePersistError::SchemaMismatch {
                expected: 1,
                found: 999,
            } => {}
            other => panic!("Expected SchemaMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_duplicate_and_malformed() {
        let store = BaselineStore::new();
        store.publish(snapshot("VH_01", 1, 40));
        let mut state = PersistedBaselines::from_store(&store, 10);
        state.snapshots.push(state.snapshots[0].clone());
        let json = serde_json::to_string(&state).unwrap();
        assert!(matches!(
            PersistedBaselines::import_json(&json),
            Err(BaselinePersistError::InvalidSnapshot { .. })
        ));

        state.snapshots.pop();
        state.snapshots[0].metrics.vibration.std_dev = -2.0;
        let json = serde_json::to_string(&state).unwrap();
        assert!(matches!(
            PersistedBaselines::import_json(&json),
            Err(BaselinePersistError::InvalidSnapshot { .. })
        ));
    }

    #[test]
    fn test_rejects_std_dev_inconsistent_with_m2() {
        let store = BaselineStore::new();
        store.publish(snapshot("VH_01", 1, 40));
        let mut state = PersistedBaselines::from_store(&store, 10);
        state.snapshots[0].metrics.rpm.std_dev = 9.0;
        let json = serde_json::to_string(&state).unwrap();
        match PersistedBaselines::import_json(&json) {
            Err(BaselinePersistError::InvalidSnapshot { reason, .. }) => {
                assert!(reason.contains("rpm"));
            }
            other => panic!("Expected InvalidSnapshot, got {:?}", other),
        }

        // Right numbers, wrong label.
        let mut state = PersistedBaselines::from_store(&store, 10);
        state.snapshots[0].variance = VarianceKind::Population;
        let json = serde_json::to_string(&state).unwrap();
        assert!(PersistedBaselines::import_json(&json).is_err());
    }

    #[test]
    fn test_publish_converts_variance_convention() {
        let population = BaselineSnapshot::new(
            BaselineKey::new("VH_03", 2),
            VarianceKind::Population,
            MetricBaselines::from_fn(|_| {
                MetricBaseline::from_moments(16, 50.0, 4.0, VarianceKind::Population)
            }),
        );
        let store = BaselineStore::new();
        store.publish(population);
        let json = PersistedBaselines::from_store(&store, 10)
            .export_json()
            .unwrap();

        let imported = PersistedBaselines::import_json(&json).unwrap();
        let target = BaselineStore::new();
        imported.publish_into(&target, VarianceKind::Sample).unwrap();

        let snap = target.get(&BaselineKey::new("VH_03", 2)).unwrap();
        assert_eq!(snap.variance, VarianceKind::Sample);
        let rpm = snap.metric(Metric::Rpm);
        assert_eq!(rpm.m2, 256.0);
        assert!((rpm.std_dev - (256.0f64 / 15.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_garbage_is_deserialize_error() {
        assert!(matches!(
            PersistedBaselines::import_json("{not json"),
            Err(BaselinePersistError::Deserialize(_))
        ));
    }

    #[test]
    fn test_error_maps_to_persistence() {
        let err: eh_common::Error = BaselinePersistError::NoData.into();
        assert!(matches!(err, eh_common::Error::Persistence(_)));
    }
}
