//! Geometry model for drawn map features.
//!
//! The wire shape is a literal GeoJSON geometry object: a `type` tag plus
//! nested `coordinates` arrays in longitude/latitude order, so frames can be
//! consumed by any GeoJSON-speaking renderer without translation.
//!
//! There is no circle variant: a circle does not survive the interchange
//! round-trip (it degenerates to a point on the receiving end), so the
//! variant set stops at polygons and their multi forms.

use serde::{Deserialize, Serialize};

/// A single longitude/latitude pair.
pub type Position = [f64; 2];

/// Geometry of a drawn map feature, in GeoJSON form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Position },
    LineString { coordinates: Vec<Position> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPoint { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
}

/// Geometry type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum GeometryKind {
    Point = 0,
    LineString = 1,
    Polygon = 2,
    MultiPoint = 3,
    MultiLineString = 4,
    MultiPolygon = 5,
}

impl GeometryKind {
    /// Whether this kind is a single-position feature.
    ///
    /// Single-position features are moved as a whole on edit; every other
    /// kind is re-shaped point by point.
    pub fn is_point(&self) -> bool {
        matches!(self, GeometryKind::Point)
    }
}

impl Geometry {
    /// A point at the given longitude/latitude.
    pub fn point(lng: f64, lat: f64) -> Self {
        Geometry::Point {
            coordinates: [lng, lat],
        }
    }

    /// A line through the given positions.
    pub fn line_string(positions: Vec<Position>) -> Self {
        Geometry::LineString {
            coordinates: positions,
        }
    }

    /// A polygon from the given rings (outer ring first).
    pub fn polygon(rings: Vec<Vec<Position>>) -> Self {
        Geometry::Polygon {
            coordinates: rings,
        }
    }

    /// Classify this geometry.
    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Point { .. } => GeometryKind::Point,
            Geometry::LineString { .. } => GeometryKind::LineString,
            Geometry::Polygon { .. } => GeometryKind::Polygon,
            Geometry::MultiPoint { .. } => GeometryKind::MultiPoint,
            Geometry::MultiLineString { .. } => GeometryKind::MultiLineString,
            Geometry::MultiPolygon { .. } => GeometryKind::MultiPolygon,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_wire_shape() {
        let geom = Geometry::point(-122.41, 37.77);
        let json = serde_json::to_string(&geom).unwrap();
        assert_eq!(json, r#"{"type":"Point","coordinates":[-122.41,37.77]}"#);
    }

    #[test]
    fn test_line_string_roundtrip() {
        let geom = Geometry::line_string(vec![[0.0, 0.0], [1.0, 1.0], [2.0, 0.5]]);
        let json = serde_json::to_string(&geom).unwrap();
        let parsed: Geometry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, geom);
    }

    #[test]
    fn test_polygon_roundtrip() {
        let ring = vec![[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0], [0.0, 0.0]];
        let geom = Geometry::polygon(vec![ring]);
        let json = serde_json::to_string(&geom).unwrap();
        assert!(json.contains(r#""type":"Polygon""#));
        let parsed: Geometry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, geom);
    }

    #[test]
    fn test_multi_polygon_roundtrip() {
        let geom = Geometry::MultiPolygon {
            coordinates: vec![
                vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]],
                vec![vec![[5.0, 5.0], [6.0, 5.0], [6.0, 6.0], [5.0, 5.0]]],
            ],
        };
        let json = serde_json::to_string(&geom).unwrap();
        let parsed: Geometry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, geom);
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(Geometry::point(0.0, 0.0).kind(), GeometryKind::Point);
        assert_eq!(
            Geometry::line_string(vec![[0.0, 0.0]]).kind(),
            GeometryKind::LineString
        );
        assert_eq!(Geometry::polygon(vec![]).kind(), GeometryKind::Polygon);
        assert_eq!(
            Geometry::MultiPoint { coordinates: vec![] }.kind(),
            GeometryKind::MultiPoint
        );
    }

    #[test]
    fn test_is_point() {
        assert!(GeometryKind::Point.is_point());
        assert!(!GeometryKind::LineString.is_point());
        // Multi-points are re-shaped like paths, not moved as a whole.
        assert!(!GeometryKind::MultiPoint.is_point());
    }

    #[test]
    fn test_circle_is_not_a_geometry() {
        let json = r#"{"type":"Circle","coordinates":[0.0,0.0],"radius":10.0}"#;
        assert!(serde_json::from_str::<Geometry>(json).is_err());
    }

    #[test]
    fn test_unknown_type_rejected() {
        let json = r#"{"type":"Blob","coordinates":[]}"#;
        assert!(serde_json::from_str::<Geometry>(json).is_err());
    }
}
