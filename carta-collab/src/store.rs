//! Authoritative server-side feature store.
//!
//! One instance exists per server process and is owned exclusively by the
//! relay loop; every mutation happens on that single sequential path, so the
//! map needs no interior locking. Each client's local collection is a
//! disposable cache of this store, rebuilt from a snapshot on reconnect.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::feature::{Feature, FeatureId};
use crate::geometry::Geometry;

/// In-memory map from feature id to record: the single source of truth.
#[derive(Debug, Default)]
pub struct FeatureStore {
    features: HashMap<FeatureId, Feature>,
}

impl FeatureStore {
    pub fn new() -> Self {
        Self {
            features: HashMap::new(),
        }
    }

    /// Insert a new record, or replace the geometry of an existing one.
    ///
    /// Create confirmations and edits both land here; the store does not
    /// distinguish them. The identifier of an existing record is untouched.
    pub fn upsert(&mut self, id: FeatureId, geometry: Geometry) {
        match self.features.entry(id) {
            Entry::Occupied(mut entry) => entry.get_mut().geometry = geometry,
            Entry::Vacant(entry) => {
                let id = entry.key().clone();
                entry.insert(Feature::new(id, geometry));
            }
        }
    }

    /// Remove a record, returning it if it was present.
    ///
    /// An absent id is a no-op, not an error; duplicate or late delete
    /// messages are expected.
    pub fn remove(&mut self, id: &FeatureId) -> Option<Feature> {
        self.features.remove(id)
    }

    pub fn get(&self, id: &FeatureId) -> Option<&Feature> {
        self.features.get(id)
    }

    pub fn contains(&self, id: &FeatureId) -> bool {
        self.features.contains_key(id)
    }

    /// Clone out the full current set, in no particular order.
    ///
    /// Only used to bootstrap a newly joined connection.
    pub fn snapshot(&self) -> Vec<Feature> {
        self.features.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
