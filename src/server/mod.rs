//! HTTP boundary.
//!
//! Thin axum layer over [`crate::boundary`]: decode the request, call the
//! pipeline for the route's geometry kind, encode the response or error.

use crate::boundary::{
    self, CreateRequest, CreateResponse, ErrorResponse, ResponseFormat, SearchRequest,
    UpdateRequest, UpdateResponse,
};
use crate::db::DB;
use crate::error::GeodocError;
use crate::pipeline::{KindPolicy, MultiPointKind, MultiPolygonKind, PointKind};
use crate::types::DbStats;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Error body returned with 4xx/5xx statuses.
pub struct ApiError(ErrorResponse);

impl From<ErrorResponse> for ApiError {
    fn from(err: ErrorResponse) -> Self {
        Self(err)
    }
}

impl From<GeodocError> for ApiError {
    fn from(err: GeodocError) -> Self {
        Self(ErrorResponse::from(err))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::from(GeodocError::BadRequest(format!(
            "invalid request body: {}",
            rejection.body_text()
        )))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.0)).into_response()
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    stats: DbStats,
}

/// Routes for every geometry kind plus `/health`.
pub fn router(db: DB) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/addPoint", post(add::<PointKind>))
        .route("/getPoints", get(find::<PointKind>))
        .route("/updatePoint", put(modify::<PointKind>))
        .route("/addMultiPoint", post(add::<MultiPointKind>))
        .route("/getMultiPoints", get(find::<MultiPointKind>))
        .route("/updateMultiPoint", put(modify::<MultiPointKind>))
        .route("/addMultiPolygon", post(add::<MultiPolygonKind>))
        .route("/getMultiPolygon", get(find::<MultiPolygonKind>))
        .route("/updateMultiplePolygon", put(modify::<MultiPolygonKind>))
        .layer(TraceLayer::new_for_http())
        .with_state(db)
}

/// Serve until `shutdown` resolves, then close the database.
pub async fn run_server<F>(addr: SocketAddr, db: DB, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router(db.clone()))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Shutting down, closing database");
    db.close()?;
    Ok(())
}

async fn health(State(db): State<DB>) -> Result<Json<HealthResponse>, ApiError> {
    Ok(Json(HealthResponse {
        status: "ok",
        version: crate::VERSION,
        stats: db.stats()?,
    }))
}

async fn add<K: KindPolicy>(
    State(db): State<DB>,
    body: Result<Json<CreateRequest>, JsonRejection>,
) -> Result<Json<CreateResponse>, ApiError> {
    let Json(req) = body?;
    Ok(Json(boundary::create(&db, K::KIND, &req)?))
}

async fn find<K: KindPolicy>(
    State(db): State<DB>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let req = search_request(params)?;
    let response = match req.format {
        ResponseFormat::Documents => Json(boundary::search(&db, K::KIND, req)?).into_response(),
        ResponseFormat::GeoJson => {
            Json(boundary::search_features(&db, K::KIND, req)?).into_response()
        }
    };
    Ok(response)
}

async fn modify<K: KindPolicy>(
    State(db): State<DB>,
    body: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Json<UpdateResponse>, ApiError> {
    let Json(req) = body?;
    Ok(Json(boundary::update(&db, K::KIND, req)?))
}

/// Decode search parameters. `coordinates` may repeat
/// (`?coordinates=1&coordinates=2`) or be comma-separated (`?coordinates=1,2`).
/// `format=geojson` selects a FeatureCollection reply.
pub fn search_request(params: Vec<(String, String)>) -> Result<SearchRequest, GeodocError> {
    let mut req = SearchRequest::default();

    for (key, value) in params {
        match key.as_str() {
            "name" => req.name = Some(value),
            "coordinates" => {
                let coordinates = req.coordinates.get_or_insert_with(Vec::new);
                for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                    let number = part.parse::<f64>().map_err(|_| {
                        GeodocError::BadRequest(format!("coordinate '{}' is not a number", part))
                    })?;
                    coordinates.push(number);
                }
            }
            "radius" => {
                let radius = value.trim().parse::<f64>().map_err(|_| {
                    GeodocError::BadRequest(format!("radius '{}' is not a number", value))
                })?;
                req.radius = Some(radius);
            }
            "format" => {
                req.format = match value.trim() {
                    "documents" => ResponseFormat::Documents,
                    "geojson" => ResponseFormat::GeoJson,
                    other => {
                        return Err(GeodocError::BadRequest(format!(
                            "unknown response format '{}'",
                            other
                        )));
                    }
                };
            }
            _ => {}
        }
    }

    Ok(req)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_repeated_coordinates() {
        let req = search_request(params(&[
            ("coordinates", "77.59"),
            ("coordinates", "12.97"),
            ("radius", "250"),
        ]))
        .unwrap();
        assert_eq!(req.coordinates, Some(vec![77.59, 12.97]));
        assert_eq!(req.radius, Some(250.0));
    }

    #[test]
    fn test_comma_separated_coordinates() {
        let req = search_request(params(&[("coordinates", "77.59, 12.97"), ("name", "A")])).unwrap();
        assert_eq!(req.coordinates, Some(vec![77.59, 12.97]));
        assert_eq!(req.name.as_deref(), Some("A"));
    }

    #[test]
    fn test_non_numeric_values() {
        assert!(matches!(
            search_request(params(&[("coordinates", "east")])),
            Err(GeodocError::BadRequest(_))
        ));
        assert!(matches!(
            search_request(params(&[("radius", "far")])),
            Err(GeodocError::BadRequest(_))
        ));
    }

    #[test]
    fn test_response_format() {
        let req = search_request(params(&[("name", "A"), ("format", "geojson")])).unwrap();
        assert_eq!(req.format, ResponseFormat::GeoJson);
        assert_eq!(
            search_request(params(&[("name", "A")])).unwrap().format,
            ResponseFormat::Documents
        );
        assert!(matches!(
            search_request(params(&[("format", "xml")])),
            Err(GeodocError::BadRequest(_))
        ));
    }
}
