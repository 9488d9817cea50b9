//! Concurrent baseline store.
//!
//! Maps each key to an `Arc<BaselineSnapshot>`. Readers clone the `Arc` and
//! keep reading that snapshot for as long as they hold it; publishing swaps
//! the `Arc` inside the key's entry. Writers for one key are serialized by
//! the entry lock, writers for different keys only contend when they hash to
//! the same shard.

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use eh_common::{BaselineKey, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::BaselineSnapshot;
use crate::logging::{event_names, Stage};

/// Key counts by readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StoreStats {
    pub keys: usize,
    /// Keys where every metric has enough history.
    pub ready: usize,
    /// Keys where some but not all metrics have enough history.
    pub partial: usize,
    /// Keys where no metric has enough history yet.
    pub cold: usize,
}

/// Publish-by-replacement store of immutable snapshots.
#[derive(Debug, Default)]
pub struct BaselineStore {
    entries: DashMap<BaselineKey, Arc<BaselineSnapshot>>,
}

impl BaselineStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot for a key.
    pub fn get(&self, key: &BaselineKey) -> Option<Arc<BaselineSnapshot>> {
        self.entries.get(key).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, key: &BaselineKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Publish a snapshot, replacing any previous one for its key. The
    /// version is assigned here.
    pub fn publish(&self, snapshot: BaselineSnapshot) -> Arc<BaselineSnapshot> {
        let key = snapshot.key.clone();
        match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                let version = occupied.get().version + 1;
                let published = Arc::new(stamp(snapshot, version));
                occupied.insert(Arc::clone(&published));
                log_published(&published);
                published
            }
            Entry::Vacant(vacant) => {
                let published = Arc::new(stamp(snapshot, 1));
                vacant.insert(Arc::clone(&published));
                log_published(&published);
                published
            }
        }
    }

    /// Read-modify-publish under the key's entry lock.
    ///
    /// `f` sees the current snapshot (if any) and returns its replacement.
    /// If `f` fails the entry is left untouched. `f` must not call back into
    /// this store.
    pub fn update_with<F>(&self, key: &BaselineKey, f: F) -> Result<Arc<BaselineSnapshot>>
    where
        F: FnOnce(Option<&BaselineSnapshot>) -> Result<BaselineSnapshot>,
    {
        match self.entries.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let next = f(Some(occupied.get().as_ref()))?;
                let version = occupied.get().version + 1;
                let published = Arc::new(stamp(next, version));
                occupied.insert(Arc::clone(&published));
                log_published(&published);
                Ok(published)
            }
            Entry::Vacant(vacant) => {
                let next = f(None)?;
                let published = Arc::new(stamp(next, 1));
                vacant.insert(Arc::clone(&published));
                log_published(&published);
                Ok(published)
            }
        }
    }

    pub fn remove(&self, key: &BaselineKey) -> Option<Arc<BaselineSnapshot>> {
        self.entries.remove(key).map(|(_, snapshot)| snapshot)
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<BaselineKey> {
        let mut keys: Vec<BaselineKey> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    /// All current snapshots, sorted by key.
    pub fn snapshots(&self) -> Vec<Arc<BaselineSnapshot>> {
        let mut snapshots: Vec<Arc<BaselineSnapshot>> =
            self.entries.iter().map(|e| Arc::clone(e.value())).collect();
        snapshots.sort_by(|a, b| a.key.cmp(&b.key));
        snapshots
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Readiness counts under the given sample minimum.
    pub fn stats(&self, min_samples: u64) -> StoreStats {
        let mut stats = StoreStats::default();
        for entry in self.entries.iter() {
            stats.keys += 1;
            match entry.value().invalid_metrics(min_samples).len() {
                0 => stats.ready += 1,
                n if n == eh_common::Metric::ALL.len() => stats.cold += 1,
                _ => stats.partial += 1,
            }
        }
        stats
    }
}

fn stamp(mut snapshot: BaselineSnapshot, version: u64) -> BaselineSnapshot {
    snapshot.version = version;
    snapshot.published_at = Some(Utc::now());
    snapshot
}

fn log_published(snapshot: &BaselineSnapshot) {
    tracing::debug!(
        target: event_names::BASELINE_PUBLISHED,
        stage = %Stage::Learn,
        vehicle_id = %snapshot.key.vehicle_id,
        gear = snapshot.key.gear,
        version = snapshot.version,
        count = snapshot.sample_count(),
        "baseline published"
    );
}
