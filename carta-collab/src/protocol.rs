//! Wire protocol for feature synchronization.
//!
//! Three event kinds cover the whole vocabulary:
//!
//! | Event     | Payload          | Receiver action                        |
//! |-----------|------------------|----------------------------------------|
//! | `created` | id + geometry    | materialize iff the id is unknown      |
//! | `deleted` | id               | remove iff the id is known             |
//! | `edited`  | id + geometry    | replace geometry iff the id is known   |
//!
//! Frames are JSON text. Every event is self-describing and safe to deliver
//! twice or out of order relative to events for other ids: receivers always
//! check presence by id before acting. Events for the same id are ordered by
//! the relay's single sequential mutation path, so no sequence numbers are
//! carried.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::feature::{Feature, FeatureId};
use crate::geometry::Geometry;

/// Protocol errors.
#[derive(Debug, Clone, Error)]
pub enum ProtocolError {
    #[error("failed to encode event: {0}")]
    Encode(String),
    #[error("failed to decode event: {0}")]
    Decode(String),
    #[error("connection closed")]
    ConnectionClosed,
}

/// A synchronization event, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FeatureEvent {
    /// A feature was drawn.
    Created { id: FeatureId, geometry: Geometry },
    /// A feature was deleted.
    Deleted { id: FeatureId },
    /// A feature's geometry changed; its identity did not.
    Edited { id: FeatureId, geometry: Geometry },
}

impl FeatureEvent {
    pub fn created(id: FeatureId, geometry: Geometry) -> Self {
        Self::Created { id, geometry }
    }

    pub fn deleted(id: FeatureId) -> Self {
        Self::Deleted { id }
    }

    pub fn edited(id: FeatureId, geometry: Geometry) -> Self {
        Self::Edited { id, geometry }
    }

    /// Synthetic creation event, used to replay a stored record to a late
    /// joiner. Indistinguishable from a live `created` on the receiving end.
    pub fn from_snapshot(feature: Feature) -> Self {
        Self::Created {
            id: feature.id,
            geometry: feature.geometry,
        }
    }

    /// The feature id this event refers to.
    pub fn id(&self) -> &FeatureId {
        match self {
            Self::Created { id, .. } | Self::Deleted { id } | Self::Edited { id, .. } => id,
        }
    }

    /// Serialize to a JSON text frame.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    /// Deserialize from a JSON text frame.
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(frame).map_err(|e| ProtocolError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> FeatureId {
        FeatureId::from(s)
    }

    #[test]
    fn test_created_roundtrip() {
        let event = FeatureEvent::created(id("X"), Geometry::point(-0.1, 51.5));
        let frame = event.encode().unwrap();
        assert!(frame.contains(r#""event":"created""#));
        assert!(frame.contains(r#""type":"Point""#));

        let decoded = FeatureEvent::decode(&frame).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_deleted_roundtrip() {
        let event = FeatureEvent::deleted(id("X"));
        let frame = event.encode().unwrap();
        assert!(frame.contains(r#""event":"deleted""#));

        let decoded = FeatureEvent::decode(&frame).unwrap();
        assert_eq!(decoded, event);
        assert_eq!(decoded.id(), &id("X"));
    }

    #[test]
    fn test_edited_roundtrip() {
        let event = FeatureEvent::edited(
            id("X"),
            Geometry::line_string(vec![[0.0, 0.0], [1.0, 2.0]]),
        );
        let frame = event.encode().unwrap();
        assert!(frame.contains(r#""event":"edited""#));

        let decoded = FeatureEvent::decode(&frame).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_from_snapshot_is_a_created_event() {
        let feature = Feature::new(id("X"), Geometry::point(1.0, 1.0));
        let event = FeatureEvent::from_snapshot(feature);
        match event {
            FeatureEvent::Created { id: got, geometry } => {
                assert_eq!(got, id("X"));
                assert_eq!(geometry, Geometry::point(1.0, 1.0));
            }
            other => unreachable!("expected created, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(FeatureEvent::decode("not json at all").is_err());
    }

    #[test]
    fn test_decode_missing_id_fails() {
        let frame = r#"{"event":"created","geometry":{"type":"Point","coordinates":[0.0,0.0]}}"#;
        let err = FeatureEvent::decode(frame).unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[test]
    fn test_decode_unknown_event_fails() {
        let frame = r#"{"event":"renamed","id":"X"}"#;
        assert!(FeatureEvent::decode(frame).is_err());
    }

    #[test]
    fn test_decode_unparseable_geometry_fails() {
        let frame = r#"{"event":"created","id":"X","geometry":{"type":"Circle","coordinates":[0,0]}}"#;
        assert!(FeatureEvent::decode(frame).is_err());
    }

    #[test]
    fn test_id_accessor_over_all_variants() {
        let point = Geometry::point(0.0, 0.0);
        assert_eq!(FeatureEvent::created(id("a"), point.clone()).id(), &id("a"));
        assert_eq!(FeatureEvent::deleted(id("b")).id(), &id("b"));
        assert_eq!(FeatureEvent::edited(id("c"), point).id(), &id("c"));
    }
}
