//! Document and geometry types stored in spatial collections.
//!
//! Geometries serialize GeoJSON-style (`{"type": "Point", "coordinates": [lon, lat]}`),
//! which is also the persisted `location` shape of every document.

use crate::error::{GeodocError, Result};
use geo::{LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// An ordered `[longitude, latitude]` pair in degrees.
pub type Position = [f64; 2];

/// Opaque document identifier, assigned by the store on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; 16] {
        *self.0.as_bytes()
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for DocumentId {
    type Err = GeodocError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| GeodocError::Validation(format!("invalid document id '{}': {}", s, e)))
    }
}

/// The three geometry kinds a collection can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryKind {
    Point,
    MultiPoint,
    MultiPolygon,
}

impl GeometryKind {
    pub const ALL: [GeometryKind; 3] = [Self::Point, Self::MultiPoint, Self::MultiPolygon];

    /// Canonical type label written into every stored geometry.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Point => "Point",
            Self::MultiPoint => "MultiPoint",
            Self::MultiPolygon => "MultiPolygon",
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for GeometryKind {
    type Err = GeodocError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Point" => Ok(Self::Point),
            "MultiPoint" => Ok(Self::MultiPoint),
            "MultiPolygon" => Ok(Self::MultiPolygon),
            other => Err(GeodocError::Validation(format!(
                "unknown geometry type '{}'",
                other
            ))),
        }
    }
}

/// Kind-tagged coordinate structure.
///
/// MultiPolygon coordinates are polygons of linear rings of positions; the first
/// ring of each polygon is its exterior. Ring closure is not required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    MultiPoint(Vec<Position>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

impl Geometry {
    pub fn kind(&self) -> GeometryKind {
        match self {
            Self::Point(_) => GeometryKind::Point,
            Self::MultiPoint(_) => GeometryKind::MultiPoint,
            Self::MultiPolygon(_) => GeometryKind::MultiPolygon,
        }
    }

    /// Every position of the geometry, in storage order.
    pub fn positions(&self) -> Box<dyn Iterator<Item = Position> + '_> {
        match self {
            Self::Point(p) => Box::new(std::iter::once(*p)),
            Self::MultiPoint(points) => Box::new(points.iter().copied()),
            Self::MultiPolygon(polygons) => Box::new(
                polygons
                    .iter()
                    .flat_map(|rings| rings.iter())
                    .flat_map(|ring| ring.iter().copied()),
            ),
        }
    }

    /// Axis-aligned `(min, max)` corners in degrees, `None` for an empty geometry.
    pub fn bounding_box(&self) -> Option<(Position, Position)> {
        self.positions().fold(None, |acc, [x, y]| match acc {
            None => Some(([x, y], [x, y])),
            Some(([min_x, min_y], [max_x, max_y])) => Some((
                [min_x.min(x), min_y.min(y)],
                [max_x.max(x), max_y.max(y)],
            )),
        })
    }

    /// Planar `geo` view of a MultiPolygon geometry.
    pub fn to_multi_polygon(&self) -> Option<MultiPolygon<f64>> {
        let Self::MultiPolygon(polygons) = self else {
            return None;
        };

        let polygons = polygons
            .iter()
            .map(|rings| {
                let mut rings = rings.iter().map(|ring| LineString::from(ring.clone()));
                let exterior = rings.next().unwrap_or_else(|| LineString::new(Vec::new()));
                Polygon::new(exterior, rings.collect())
            })
            .collect();

        Some(MultiPolygon::new(polygons))
    }
}

/// A stored `{id, name, location}` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialDocument {
    pub id: DocumentId,
    pub name: String,
    pub location: Geometry,
}

impl SpatialDocument {
    pub fn kind(&self) -> GeometryKind {
        self.location.kind()
    }
}

/// Conjunctive selection used by filter-then-set updates.
///
/// Every supplied field must match; an empty filter matches nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentFilter {
    pub id: Option<DocumentId>,
    pub name: Option<String>,
    pub location: Option<Geometry>,
}

impl DocumentFilter {
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.name.is_none() && self.location.is_none()
    }

    pub fn matches(&self, doc: &SpatialDocument) -> bool {
        if self.is_empty() {
            return false;
        }
        self.id.is_none_or(|id| id == doc.id)
            && self.name.as_deref().is_none_or(|name| name == doc.name)
            && self
                .location
                .as_ref()
                .is_none_or(|location| *location == doc.location)
    }
}

/// Fields to replace on the matched document; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentPatch {
    pub name: Option<String>,
    pub location: Option<Geometry>,
}

impl DocumentPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.location.is_none()
    }

    pub fn apply(&self, doc: &mut SpatialDocument) {
        if let Some(name) = &self.name {
            doc.name = name.clone();
        }
        if let Some(location) = &self.location {
            doc.location = location.clone();
        }
    }
}

/// Per-kind document counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbStats {
    pub point_documents: usize,
    pub multi_point_documents: usize,
    pub multi_polygon_documents: usize,
}

impl DbStats {
    pub fn total(&self) -> usize {
        self.point_documents + self.multi_point_documents + self.multi_polygon_documents
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn square() -> Geometry {
        Geometry::MultiPolygon(vec![vec![vec![
            [0.0, 0.0],
            [1.0, 0.0],
            [1.0, 1.0],
            [0.0, 1.0],
            [0.0, 0.0],
        ]]])
    }

    #[test]
    fn test_geometry_serializes_geojson_style() {
        let point = Geometry::Point([77.59, 12.97]);
        assert_eq!(
            serde_json::to_value(&point).unwrap(),
            json!({"type": "Point", "coordinates": [77.59, 12.97]})
        );

        let parsed: Geometry =
            serde_json::from_value(json!({"type": "MultiPoint", "coordinates": [[1.0, 2.0]]}))
                .unwrap();
        assert_eq!(parsed, Geometry::MultiPoint(vec![[1.0, 2.0]]));
        assert_eq!(parsed.kind(), GeometryKind::MultiPoint);
    }

    #[test]
    fn test_document_id_round_trip() {
        let id = DocumentId::new();
        let parsed: DocumentId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert_eq!(DocumentId::from_bytes(id.to_bytes()), id);

        assert!(matches!(
            "not-an-id".parse::<DocumentId>(),
            Err(GeodocError::Validation(_))
        ));
    }

    #[test]
    fn test_kind_labels() {
        for kind in GeometryKind::ALL {
            assert_eq!(kind.label().parse::<GeometryKind>().unwrap(), kind);
        }
        assert!("Polygon".parse::<GeometryKind>().is_err());
    }

    #[test]
    fn test_bounding_box() {
        assert_eq!(
            square().bounding_box(),
            Some(([0.0, 0.0], [1.0, 1.0]))
        );
        assert_eq!(
            Geometry::MultiPoint(vec![[5.0, -3.0], [-2.0, 4.0]]).bounding_box(),
            Some(([-2.0, -3.0], [5.0, 4.0]))
        );
        assert_eq!(Geometry::MultiPoint(Vec::new()).bounding_box(), None);
    }

    #[test]
    fn test_to_multi_polygon() {
        let mp = square().to_multi_polygon().unwrap();
        assert_eq!(mp.0.len(), 1);
        assert!(mp.0[0].interiors().is_empty());
        assert!(Geometry::Point([0.0, 0.0]).to_multi_polygon().is_none());
    }

    #[test]
    fn test_filter_is_conjunctive() {
        let doc = SpatialDocument {
            id: DocumentId::new(),
            name: "A".to_string(),
            location: Geometry::Point([1.0, 2.0]),
        };

        let by_name = DocumentFilter {
            name: Some("A".to_string()),
            ..Default::default()
        };
        assert!(by_name.matches(&doc));

        let name_and_wrong_location = DocumentFilter {
            name: Some("A".to_string()),
            location: Some(Geometry::Point([3.0, 4.0])),
            ..Default::default()
        };
        assert!(!name_and_wrong_location.matches(&doc));

        assert!(!DocumentFilter::default().matches(&doc));
    }

    #[test]
    fn test_patch_only_touches_supplied_fields() {
        let mut doc = SpatialDocument {
            id: DocumentId::new(),
            name: "A".to_string(),
            location: Geometry::Point([1.0, 2.0]),
        };
        DocumentPatch {
            name: Some("B".to_string()),
            location: None,
        }
        .apply(&mut doc);

        assert_eq!(doc.name, "B");
        assert_eq!(doc.location, Geometry::Point([1.0, 2.0]));
    }
}
