//! Resolution pipelines.
//!
//! A [`Pipeline`] validates request input, turns it into collection queries and
//! maps empty results to errors. One generic pipeline serves all three geometry
//! kinds; the differences between kinds live in [`KindPolicy`].
//!
//! Search resolves in priority order and stops at the first non-empty answer:
//!
//! 1. name lookup, when a name is given
//! 2. exact match on the probe (structural equality, or containment for polygons)
//! 3. spherical-cap radius query around the probe

mod kind;

pub use kind::{ExactMatch, KindPolicy, MultiPointKind, MultiPolygonKind, NameMiss, PointKind};

use crate::collection::SpatialCollection;
use crate::compute::validation::{parse_geometry, validate_geometry, validate_probe, validate_radius};
use crate::error::{GeodocError, Result};
use crate::types::{DocumentFilter, DocumentId, DocumentPatch, Geometry, SpatialDocument};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Search input. Empty strings and empty coordinate lists count as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    pub name: Option<String>,
    pub coordinates: Option<Vec<f64>>,
    /// Meters; the pipeline default applies when absent.
    pub radius: Option<f64>,
}

impl SearchQuery {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn near(lon: f64, lat: f64) -> Self {
        Self {
            coordinates: Some(vec![lon, lat]),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_coordinates(mut self, coordinates: Vec<f64>) -> Self {
        self.coordinates = Some(coordinates);
        self
    }

    pub fn with_radius(mut self, radius_meters: f64) -> Self {
        self.radius = Some(radius_meters);
        self
    }
}

/// Filter-then-set update input.
///
/// Filter fields are conjoined. Coordinate payloads are raw JSON and validated
/// against the pipeline's geometry kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateQuery {
    pub filter_id: Option<String>,
    pub filter_name: Option<String>,
    pub filter_coordinates: Option<Value>,
    pub new_name: Option<String>,
    pub new_coordinates: Option<Value>,
}

impl UpdateQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter_id(mut self, id: impl ToString) -> Self {
        self.filter_id = Some(id.to_string());
        self
    }

    pub fn with_filter_name(mut self, name: impl Into<String>) -> Self {
        self.filter_name = Some(name.into());
        self
    }

    pub fn with_filter_coordinates(mut self, coordinates: Value) -> Self {
        self.filter_coordinates = Some(coordinates);
        self
    }

    pub fn with_new_name(mut self, name: impl Into<String>) -> Self {
        self.new_name = Some(name.into());
        self
    }

    pub fn with_new_coordinates(mut self, coordinates: Value) -> Self {
        self.new_coordinates = Some(coordinates);
        self
    }
}

/// Which search branch produced the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Name,
    Exact,
    Intersecting,
    Radius,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Name => "name",
            Self::Exact => "exact",
            Self::Intersecting => "intersecting",
            Self::Radius => "radius",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub documents: Vec<SpatialDocument>,
    pub resolution: Resolution,
}

fn present_str(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn present_value(value: &Option<Value>) -> Option<&Value> {
    value.as_ref().filter(|v| match v {
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        _ => true,
    })
}

/// Create/search/update orchestration for one geometry kind.
///
/// ```rust
/// use geodoc::{Geodoc, SearchQuery};
/// use serde_json::json;
///
/// let db = Geodoc::memory()?;
/// let points = db.points();
/// points.create("A", &json!([77.59, 12.97]))?;
///
/// let found = points.search(&SearchQuery::near(77.59, 12.97))?;
/// assert_eq!(found.documents[0].name, "A");
/// # Ok::<(), geodoc::GeodocError>(())
/// ```
pub struct Pipeline<K: KindPolicy> {
    collection: Arc<dyn SpatialCollection>,
    default_radius_meters: f64,
    _kind: PhantomData<K>,
}

impl<K: KindPolicy> Clone for Pipeline<K> {
    fn clone(&self) -> Self {
        Self {
            collection: Arc::clone(&self.collection),
            default_radius_meters: self.default_radius_meters,
            _kind: PhantomData,
        }
    }
}

impl<K: KindPolicy> fmt::Debug for Pipeline<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("kind", &K::KIND)
            .field("collection", &self.collection.name())
            .field("default_radius_meters", &self.default_radius_meters)
            .finish()
    }
}

impl<K: KindPolicy> Pipeline<K> {
    /// Binds a pipeline to a collection holding `K`'s geometry kind.
    pub fn new(collection: Arc<dyn SpatialCollection>, default_radius_meters: f64) -> Result<Self> {
        if collection.kind() != K::KIND {
            return Err(GeodocError::Store(format!(
                "collection '{}' holds {} documents, pipeline expects {}",
                collection.name(),
                collection.kind(),
                K::KIND
            )));
        }
        validate_radius(default_radius_meters)?;
        Ok(Self::from_parts(collection, default_radius_meters))
    }

    pub(crate) fn from_parts(
        collection: Arc<dyn SpatialCollection>,
        default_radius_meters: f64,
    ) -> Self {
        Self {
            collection,
            default_radius_meters,
            _kind: PhantomData,
        }
    }

    pub fn collection(&self) -> &Arc<dyn SpatialCollection> {
        &self.collection
    }

    pub fn default_radius_meters(&self) -> f64 {
        self.default_radius_meters
    }

    /// Validates `coordinates` as `K`'s geometry and stores a new document.
    pub fn create(&self, name: &str, coordinates: &Value) -> Result<DocumentId> {
        if name.is_empty() {
            return Err(GeodocError::Validation("name is required".to_string()));
        }
        let location = parse_geometry(K::KIND, coordinates)?;
        self.insert(name, location)
    }

    /// Stores an already-typed geometry, which must be of `K`'s kind.
    pub fn create_geometry(&self, name: &str, location: Geometry) -> Result<DocumentId> {
        if name.is_empty() {
            return Err(GeodocError::Validation("name is required".to_string()));
        }
        if location.kind() != K::KIND {
            return Err(GeodocError::Validation(format!(
                "expected a {} geometry, got {}",
                K::KIND,
                location.kind()
            )));
        }
        validate_geometry(&location)?;
        self.insert(name, location)
    }

    fn insert(&self, name: &str, location: Geometry) -> Result<DocumentId> {
        let id = self.collection.insert(name.to_string(), location)?;
        log::info!("Added {} document '{}' ({})", K::KIND, name, id);
        Ok(id)
    }

    /// Resolves a search by name, then exact match, then radius.
    ///
    /// All input is checked before the collection is consulted, so a malformed
    /// probe or radius fails even when the name alone would have matched.
    pub fn search(&self, query: &SearchQuery) -> Result<SearchOutcome> {
        let name = present_str(&query.name);
        let coordinates = query.coordinates.as_deref().filter(|c| !c.is_empty());

        if name.is_none() && coordinates.is_none() {
            return Err(GeodocError::BadRequest(
                "missing search criterion: either 'coordinates' or 'name' must be provided"
                    .to_string(),
            ));
        }

        let probe = coordinates.map(validate_probe).transpose()?;
        let radius = query.radius.unwrap_or(self.default_radius_meters);
        validate_radius(radius)?;

        if let Some(name) = name {
            let documents = self.collection.find_by_name(name)?;
            if !documents.is_empty() {
                log::debug!("{} search resolved by name '{}'", K::KIND, name);
                return Ok(SearchOutcome {
                    documents,
                    resolution: Resolution::Name,
                });
            }

            match (K::NAME_MISS, probe) {
                (NameMiss::FallThrough, Some(_)) => {
                    log::warn!(
                        "No {} document named '{}', falling back to coordinates",
                        K::KIND,
                        name
                    );
                }
                _ => {
                    return Err(GeodocError::NotFound(
                        "No matching document found for the given name".to_string(),
                    ));
                }
            }
        }

        let Some(probe) = probe else {
            return Err(GeodocError::NotFound(
                "No matching document found for the given name".to_string(),
            ));
        };

        let (documents, resolution) = match K::EXACT_MATCH {
            ExactMatch::Geometry => (
                self.collection.find_by_exact_geometry(probe)?,
                Resolution::Exact,
            ),
            ExactMatch::Intersecting => (
                self.collection.find_intersecting(probe)?,
                Resolution::Intersecting,
            ),
        };
        if !documents.is_empty() {
            log::debug!("{} search resolved by {} match", K::KIND, resolution);
            return Ok(SearchOutcome {
                documents,
                resolution,
            });
        }

        let documents = self.collection.find_within_radius(probe, radius)?;
        if documents.is_empty() {
            return Err(GeodocError::NotFound(format!(
                "no matching geometry within radius: {} meters of [{}, {}]",
                radius, probe[0], probe[1]
            )));
        }

        log::debug!(
            "{} search resolved by radius query ({} m, {} hits)",
            K::KIND,
            radius,
            documents.len()
        );
        Ok(SearchOutcome {
            documents,
            resolution: Resolution::Radius,
        })
    }

    /// Applies the update to the first document matching every supplied filter.
    pub fn update(&self, query: &UpdateQuery) -> Result<()> {
        let filter_id = present_str(&query.filter_id);
        let filter_name = present_str(&query.filter_name);
        let filter_coordinates = present_value(&query.filter_coordinates);

        if filter_coordinates.is_some() && !K::COORDINATE_FILTER {
            return Err(GeodocError::BadRequest(format!(
                "{} documents cannot be selected by coordinates; use filter_id or filter_name",
                K::KIND
            )));
        }
        if filter_id.is_none() && filter_name.is_none() && filter_coordinates.is_none() {
            let fields = if K::COORDINATE_FILTER {
                "filter_id, filter_name, or filter_coordinates"
            } else {
                "filter_id or filter_name"
            };
            return Err(GeodocError::BadRequest(format!(
                "At least one of {} must be provided to identify the document",
                fields
            )));
        }

        let new_name = present_str(&query.new_name);
        let new_coordinates = present_value(&query.new_coordinates);
        if new_name.is_none() && new_coordinates.is_none() {
            return Err(GeodocError::BadRequest(
                "At least one of new_name or new_coordinates must be provided to update"
                    .to_string(),
            ));
        }

        let filter = DocumentFilter {
            id: filter_id.map(str::parse).transpose()?,
            name: filter_name.map(str::to_string),
            location: filter_coordinates
                .map(|coords| parse_geometry(K::KIND, coords))
                .transpose()?,
        };
        let patch = DocumentPatch {
            name: new_name.map(str::to_string),
            location: new_coordinates
                .map(|coords| parse_geometry(K::KIND, coords))
                .transpose()?,
        };

        let matched = self.collection.update(&filter, &patch)?;
        if matched == 0 {
            return Err(GeodocError::NotFound(
                "No matching document found for the given criteria".to_string(),
            ));
        }

        log::info!("Updated {} document ({:?})", K::KIND, filter);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::MemoryCollection;
    use crate::types::GeometryKind;
    use serde_json::json;

    fn pipeline<K: KindPolicy>() -> Pipeline<K> {
        let collection = Arc::new(MemoryCollection::new(K::KIND.label(), K::KIND));
        Pipeline::new(collection, 1000.0).unwrap()
    }

    fn square(x: f64, y: f64) -> Value {
        json!([[[[x, y], [x + 1.0, y], [x + 1.0, y + 1.0], [x, y + 1.0], [x, y]]]])
    }

    #[test]
    fn test_new_rejects_mismatched_collection() {
        let collection = Arc::new(MemoryCollection::new("Point", GeometryKind::Point));
        let err = Pipeline::<MultiPointKind>::new(collection, 1000.0).unwrap_err();
        assert!(matches!(err, GeodocError::Store(_)));
    }

    #[test]
    fn test_create_then_exact_search() {
        let points = pipeline::<PointKind>();
        let id = points.create("A", &json!([77.59, 12.97])).unwrap();

        let outcome = points.search(&SearchQuery::near(77.59, 12.97)).unwrap();
        assert_eq!(outcome.resolution, Resolution::Exact);
        assert_eq!(outcome.documents.len(), 1);
        assert_eq!(outcome.documents[0].id, id);
    }

    #[test]
    fn test_create_rejects_bad_payload() {
        let points = pipeline::<PointKind>();
        assert!(matches!(
            points.create("A", &json!([77.59])),
            Err(GeodocError::Validation(_))
        ));
        assert!(matches!(
            points.create("", &json!([77.59, 12.97])),
            Err(GeodocError::Validation(_))
        ));
        assert!(points.collection().is_empty().unwrap());
    }

    #[test]
    fn test_create_geometry_checks_kind() {
        let points = pipeline::<PointKind>();
        let err = points
            .create_geometry("A", Geometry::MultiPoint(vec![[1.0, 1.0]]))
            .unwrap_err();
        assert!(matches!(err, GeodocError::Validation(_)));
        assert!(points.create_geometry("A", Geometry::Point([1.0, 1.0])).is_ok());
    }

    #[test]
    fn test_search_requires_criterion() {
        let points = pipeline::<PointKind>();
        let err = points.search(&SearchQuery::default()).unwrap_err();
        assert!(matches!(err, GeodocError::BadRequest(_)));

        let empty = SearchQuery {
            name: Some(String::new()),
            coordinates: Some(Vec::new()),
            radius: None,
        };
        assert!(matches!(
            points.search(&empty),
            Err(GeodocError::BadRequest(_))
        ));
    }

    #[test]
    fn test_search_by_name_short_circuits() {
        let points = pipeline::<PointKind>();
        points.create("A", &json!([1.0, 1.0])).unwrap();
        points.create("B", &json!([2.0, 2.0])).unwrap();

        // Name wins even though the probe would match B exactly
        let outcome = points
            .search(&SearchQuery::by_name("A").with_coordinates(vec![2.0, 2.0]))
            .unwrap();
        assert_eq!(outcome.resolution, Resolution::Name);
        assert_eq!(outcome.documents[0].name, "A");
    }

    #[test]
    fn test_point_name_miss_is_not_found() {
        let points = pipeline::<PointKind>();
        points.create("A", &json!([1.0, 1.0])).unwrap();

        let query = SearchQuery::by_name("missing").with_coordinates(vec![1.0, 1.0]);
        assert!(matches!(
            points.search(&query),
            Err(GeodocError::NotFound(_))
        ));
    }

    #[test]
    fn test_malformed_probe_is_bad_request() {
        let points = pipeline::<PointKind>();
        for coords in [vec![1.0], vec![1.0, 2.0, 3.0]] {
            let err = points
                .search(&SearchQuery::default().with_coordinates(coords))
                .unwrap_err();
            assert!(matches!(err, GeodocError::BadRequest(_)), "{:?}", err);
        }
    }

    #[test]
    fn test_invalid_radius_is_rejected() {
        let points = pipeline::<PointKind>();
        let err = points
            .search(&SearchQuery::near(0.0, 0.0).with_radius(-5.0))
            .unwrap_err();
        assert!(matches!(err, GeodocError::Validation(_)));
    }

    #[test]
    fn test_radius_fallback_and_not_found() {
        let points = pipeline::<PointKind>();
        points.create("A", &json!([77.59, 12.97])).unwrap();

        let outcome = points
            .search(&SearchQuery::near(77.595, 12.97).with_radius(1000.0))
            .unwrap();
        assert_eq!(outcome.resolution, Resolution::Radius);

        let err = points
            .search(&SearchQuery::near(0.0, 0.0).with_radius(10.0))
            .unwrap_err();
        assert!(matches!(err, GeodocError::NotFound(_)));
    }

    #[test]
    fn test_multi_point_element_match() {
        let routes = pipeline::<MultiPointKind>();
        routes
            .create("route", &json!([[1.0, 1.0], [2.0, 2.0], [3.0, 3.0]]))
            .unwrap();

        let outcome = routes.search(&SearchQuery::near(2.0, 2.0)).unwrap();
        assert_eq!(outcome.resolution, Resolution::Exact);
        assert_eq!(outcome.documents[0].name, "route");
    }

    #[test]
    fn test_multi_polygon_intersection_skips_radius() {
        let zones = pipeline::<MultiPolygonKind>();
        zones.create("zone", &square(0.0, 0.0)).unwrap();

        let inside = zones
            .search(&SearchQuery::near(0.5, 0.5).with_radius(1.0))
            .unwrap();
        assert_eq!(inside.resolution, Resolution::Intersecting);

        let outside = zones.search(&SearchQuery::near(5.0, 5.0).with_radius(1.0));
        assert!(matches!(outside, Err(GeodocError::NotFound(_))));
    }

    #[test]
    fn test_multi_polygon_name_miss_falls_through() {
        let zones = pipeline::<MultiPolygonKind>();
        zones.create("zone", &square(0.0, 0.0)).unwrap();

        let outcome = zones
            .search(&SearchQuery::by_name("missing").with_coordinates(vec![0.5, 0.5]))
            .unwrap();
        assert_eq!(outcome.resolution, Resolution::Intersecting);

        // Without coordinates there is nothing to fall through to
        let err = zones.search(&SearchQuery::by_name("missing")).unwrap_err();
        assert!(matches!(err, GeodocError::NotFound(_)));
    }

    #[test]
    fn test_update_requires_filter_and_values() {
        let points = pipeline::<PointKind>();
        points.create("A", &json!([1.0, 1.0])).unwrap();

        let no_filter = UpdateQuery::new().with_new_name("B");
        assert!(matches!(
            points.update(&no_filter),
            Err(GeodocError::BadRequest(_))
        ));

        let no_values = UpdateQuery::new().with_filter_name("A");
        assert!(matches!(
            points.update(&no_values),
            Err(GeodocError::BadRequest(_))
        ));

        let empty_strings = UpdateQuery::new()
            .with_filter_name("")
            .with_new_name("B");
        assert!(matches!(
            points.update(&empty_strings),
            Err(GeodocError::BadRequest(_))
        ));
    }

    #[test]
    fn test_update_by_coordinates_replaces_name_only() {
        let points = pipeline::<PointKind>();
        let id = points.create("A", &json!([1.0, 1.0])).unwrap();

        points
            .update(
                &UpdateQuery::new()
                    .with_filter_coordinates(json!([1.0, 1.0]))
                    .with_new_name("renamed"),
            )
            .unwrap();

        let doc = points.collection().get(&id).unwrap().unwrap();
        assert_eq!(doc.name, "renamed");
        assert_eq!(doc.location, Geometry::Point([1.0, 1.0]));
    }

    #[test]
    fn test_update_not_found_leaves_documents() {
        let points = pipeline::<PointKind>();
        let id = points.create("A", &json!([1.0, 1.0])).unwrap();

        let err = points
            .update(
                &UpdateQuery::new()
                    .with_filter_id(id)
                    .with_filter_name("B")
                    .with_new_coordinates(json!([5.0, 5.0])),
            )
            .unwrap_err();
        assert!(matches!(err, GeodocError::NotFound(_)));

        let doc = points.collection().get(&id).unwrap().unwrap();
        assert_eq!(doc.location, Geometry::Point([1.0, 1.0]));
    }

    #[test]
    fn test_update_invalid_filter_id() {
        let points = pipeline::<PointKind>();
        let err = points
            .update(
                &UpdateQuery::new()
                    .with_filter_id("not-a-uuid")
                    .with_new_name("B"),
            )
            .unwrap_err();
        assert!(matches!(err, GeodocError::Validation(_)));
    }

    #[test]
    fn test_multi_polygon_rejects_coordinate_filter() {
        let zones = pipeline::<MultiPolygonKind>();
        zones.create("zone", &square(0.0, 0.0)).unwrap();

        let err = zones
            .update(
                &UpdateQuery::new()
                    .with_filter_coordinates(square(0.0, 0.0))
                    .with_new_name("other"),
            )
            .unwrap_err();
        assert!(matches!(err, GeodocError::BadRequest(_)));
    }

    #[test]
    fn test_multi_polygon_update_geometry() {
        let zones = pipeline::<MultiPolygonKind>();
        zones.create("zone", &square(0.0, 0.0)).unwrap();

        zones
            .update(
                &UpdateQuery::new()
                    .with_filter_name("zone")
                    .with_new_coordinates(square(20.0, 20.0)),
            )
            .unwrap();

        let moved = zones.search(&SearchQuery::near(20.5, 20.5)).unwrap();
        assert_eq!(moved.resolution, Resolution::Intersecting);
        assert!(zones
            .search(&SearchQuery::near(0.5, 0.5).with_radius(1.0))
            .is_err());
    }
}
