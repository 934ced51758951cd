//! GeoJSON rendering of stored geometries and documents.

use crate::types::{Geometry, Position, SpatialDocument};
use geojson::{Feature, FeatureCollection, Value, feature::Id};
use serde_json::Map;

fn to_pair(position: &Position) -> Vec<f64> {
    vec![position[0], position[1]]
}

impl From<&Geometry> for geojson::Geometry {
    fn from(geometry: &Geometry) -> Self {
        let value = match geometry {
            Geometry::Point(p) => Value::Point(to_pair(p)),
            Geometry::MultiPoint(points) => {
                Value::MultiPoint(points.iter().map(to_pair).collect())
            }
            Geometry::MultiPolygon(polygons) => Value::MultiPolygon(
                polygons
                    .iter()
                    .map(|rings| {
                        rings
                            .iter()
                            .map(|ring| ring.iter().map(to_pair).collect())
                            .collect()
                    })
                    .collect(),
            ),
        };
        geojson::Geometry::new(value)
    }
}

impl SpatialDocument {
    /// GeoJSON feature with the document id as feature id and `name` as its only property.
    pub fn to_feature(&self) -> Feature {
        let mut properties = Map::new();
        properties.insert("name".to_string(), self.name.clone().into());

        Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::from(&self.location)),
            id: Some(Id::String(self.id.to_string())),
            properties: Some(properties),
            foreign_members: None,
        }
    }
}

/// Wraps documents into a FeatureCollection, preserving order.
pub fn to_feature_collection(documents: &[SpatialDocument]) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: documents.iter().map(SpatialDocument::to_feature).collect(),
        foreign_members: None,
    }
}
