//! Feature records and identity assignment.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::geometry::Geometry;

/// Length of the random alphanumeric run at the front of a generated id.
const ID_RANDOM_LEN: usize = 15;

/// Opaque identifier for a drawn feature.
///
/// Assigned once, on the client that drew the feature, and never reassigned.
/// At most one record per id exists anywhere at any time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureId(String);

impl FeatureId {
    /// Generate a fresh identifier: a fixed-length run of random
    /// alphanumerics followed by the current Unix time in milliseconds.
    ///
    /// Needs no coordination: every client calls this independently, and
    /// the time suffix keeps ids from ever being recycled within a session.
    /// Practical uniqueness, not cryptographic.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let head: String = (0..ID_RANDOM_LEN)
            .map(|_| rng.sample(rand::distributions::Alphanumeric) as char)
            .collect();
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        Self(format!("{head}{millis}"))
    }

    /// Wrap an identifier that arrived off the wire or out of a store.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FeatureId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// The unit of exchange and storage: identifier plus geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: FeatureId,
    pub geometry: Geometry,
}

impl Feature {
    pub fn new(id: FeatureId, geometry: Geometry) -> Self {
        Self { id, geometry }
    }
}
