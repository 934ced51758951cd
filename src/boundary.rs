//! Transport-neutral request/response boundary.
//!
//! Requests are plain serde types; each operation dispatches on the geometry
//! kind to the matching pipeline and folds every failure into an
//! [`ErrorResponse`] carrying its status category.

use crate::compute::geojson::to_feature_collection;
use crate::db::DB;
use crate::error::{ErrorCategory, GeodocError};
use crate::pipeline::{SearchQuery, UpdateQuery};
use crate::types::{GeometryKind, SpatialDocument};
use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRequest {
    pub name: String,
    pub coordinates: Value,
}

/// Body shape of a search reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// `{documents: [...]}` with the persisted record shape.
    #[default]
    Documents,
    /// A GeoJSON `FeatureCollection`.
    GeoJson,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    pub name: Option<String>,
    pub coordinates: Option<Vec<f64>>,
    pub radius: Option<f64>,
    pub format: ResponseFormat,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateRequest {
    pub filter_id: Option<String>,
    pub filter_name: Option<String>,
    pub filter_coordinates: Option<Value>,
    pub new_name: Option<String>,
    pub new_coordinates: Option<Value>,
}

impl From<SearchRequest> for SearchQuery {
    fn from(req: SearchRequest) -> Self {
        Self {
            name: req.name,
            coordinates: req.coordinates,
            radius: req.radius,
        }
    }
}

impl From<UpdateRequest> for UpdateQuery {
    fn from(req: UpdateRequest) -> Self {
        Self {
            filter_id: req.filter_id,
            filter_name: req.filter_name,
            filter_coordinates: req.filter_coordinates,
            new_name: req.new_name,
            new_coordinates: req.new_coordinates,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateResponse {
    pub id: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub documents: Vec<SpatialDocument>,
}

impl SearchResponse {
    pub fn to_feature_collection(&self) -> FeatureCollection {
        to_feature_collection(&self.documents)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateResponse {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: u16,
    pub category: ErrorCategory,
    pub detail: String,
}

impl From<GeodocError> for ErrorResponse {
    fn from(err: GeodocError) -> Self {
        let category = err.category();
        if category == ErrorCategory::ServerFault {
            log::error!("Request failed: {}", err);
        } else {
            log::debug!("Request rejected: {}", err);
        }
        Self {
            status: category.status_code(),
            category,
            detail: err.to_string(),
        }
    }
}

pub type BoundaryResult<T> = std::result::Result<T, ErrorResponse>;

/// Store a new document of `kind`.
pub fn create(db: &DB, kind: GeometryKind, req: &CreateRequest) -> BoundaryResult<CreateResponse> {
    let id = match kind {
        GeometryKind::Point => db.points().create(&req.name, &req.coordinates),
        GeometryKind::MultiPoint => db.multi_points().create(&req.name, &req.coordinates),
        GeometryKind::MultiPolygon => db.multi_polygons().create(&req.name, &req.coordinates),
    }?;

    Ok(CreateResponse {
        id: id.to_string(),
        message: format!("{} data has been added successfully", kind.label()),
    })
}

pub fn search(db: &DB, kind: GeometryKind, req: SearchRequest) -> BoundaryResult<SearchResponse> {
    let query = SearchQuery::from(req);
    let outcome = match kind {
        GeometryKind::Point => db.points().search(&query),
        GeometryKind::MultiPoint => db.multi_points().search(&query),
        GeometryKind::MultiPolygon => db.multi_polygons().search(&query),
    }?;

    Ok(SearchResponse {
        documents: outcome.documents,
    })
}

/// Same resolution as [`search`], rendered as GeoJSON features.
pub fn search_features(
    db: &DB,
    kind: GeometryKind,
    req: SearchRequest,
) -> BoundaryResult<FeatureCollection> {
    Ok(search(db, kind, req)?.to_feature_collection())
}

pub fn update(db: &DB, kind: GeometryKind, req: UpdateRequest) -> BoundaryResult<UpdateResponse> {
    let query = UpdateQuery::from(req);
    let updated = match kind {
        GeometryKind::Point => db.points().update(&query),
        GeometryKind::MultiPoint => db.multi_points().update(&query),
        GeometryKind::MultiPolygon => db.multi_polygons().update(&query),
    };
    updated?;

    Ok(UpdateResponse {
        message: format!("{} data has been updated successfully", kind.label()),
    })
}
