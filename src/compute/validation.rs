//! Geometry schema validators.
//!
//! Raw coordinate payloads arrive as untyped JSON. These checks confirm the
//! nesting depth and numeric leaves match the expected shape of a geometry kind
//! and that every position is a valid longitude/latitude pair. All checks are
//! pure and run before any store access.

use crate::compute::spatial::EARTH_CIRCUMFERENCE_METERS;
use crate::error::{GeodocError, Result};
use crate::types::{Geometry, GeometryKind, Position};
use serde_json::Value;

/// Validates a position has a finite longitude in [-180, 180] and latitude in [-90, 90].
///
/// # Examples
///
/// ```
/// use geodoc::validation::validate_position;
///
/// assert!(validate_position([77.5946, 12.9716]).is_ok());
/// assert!(validate_position([200.0, 0.0]).is_err());
/// assert!(validate_position([0.0, f64::NAN]).is_err());
/// ```
pub fn validate_position(position: Position) -> Result<()> {
    let [lon, lat] = position;

    if !lon.is_finite() {
        return Err(GeodocError::Validation(format!(
            "Longitude must be finite, got: {}",
            lon
        )));
    }
    if !lat.is_finite() {
        return Err(GeodocError::Validation(format!(
            "Latitude must be finite, got: {}",
            lat
        )));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(GeodocError::Validation(format!(
            "Longitude out of range [-180.0, 180.0]: {}",
            lon
        )));
    }
    if !(-90.0..=90.0).contains(&lat) {
        return Err(GeodocError::Validation(format!(
            "Latitude out of range [-90.0, 90.0]: {}",
            lat
        )));
    }

    Ok(())
}

/// Validates a search radius in meters.
///
/// ```
/// use geodoc::validation::validate_radius;
///
/// assert!(validate_radius(1000.0).is_ok());
/// assert!(validate_radius(0.0).is_err());
/// assert!(validate_radius(f64::INFINITY).is_err());
/// ```
pub fn validate_radius(radius: f64) -> Result<()> {
    if !radius.is_finite() {
        return Err(GeodocError::Validation(format!(
            "Radius must be finite, got: {}",
            radius
        )));
    }
    if radius <= 0.0 {
        return Err(GeodocError::Validation(format!(
            "Radius must be positive, got: {}",
            radius
        )));
    }
    if radius > EARTH_CIRCUMFERENCE_METERS {
        return Err(GeodocError::Validation(format!(
            "Radius {} exceeds Earth's circumference ({} meters)",
            radius, EARTH_CIRCUMFERENCE_METERS
        )));
    }
    Ok(())
}

/// Validates a search probe, which must be exactly `[longitude, latitude]`.
///
/// A probe of the wrong length is a malformed request rather than a malformed
/// geometry, so it is reported as `BadRequest`.
pub fn validate_probe(coordinates: &[f64]) -> Result<Position> {
    let &[lon, lat] = coordinates else {
        return Err(GeodocError::BadRequest(format!(
            "coordinate pair malformed: expected [longitude, latitude], got {} values",
            coordinates.len()
        )));
    };
    validate_position([lon, lat])?;
    Ok([lon, lat])
}

/// Parses and validates a raw coordinate payload for `kind`.
///
/// Point expects `[lon, lat]`, MultiPoint `[[lon, lat], ...]` and MultiPolygon
/// `[[[[lon, lat], ...], ...], ...]`. The returned geometry is tagged with the
/// kind's canonical label.
///
/// ```
/// use geodoc::validation::parse_geometry;
/// use geodoc::{Geometry, GeometryKind};
/// use serde_json::json;
///
/// let point = parse_geometry(GeometryKind::Point, &json!([77.59, 12.97])).unwrap();
/// assert_eq!(point, Geometry::Point([77.59, 12.97]));
///
/// // Wrong nesting depth
/// assert!(parse_geometry(GeometryKind::MultiPoint, &json!([77.59, 12.97])).is_err());
/// ```
pub fn parse_geometry(kind: GeometryKind, payload: &Value) -> Result<Geometry> {
    let geometry = match kind {
        GeometryKind::Point => Geometry::Point(parse_position(payload, kind, "coordinates")?),
        GeometryKind::MultiPoint => {
            let points = as_sequence(payload, kind, "coordinates")?
                .iter()
                .enumerate()
                .map(|(i, p)| parse_position(p, kind, &format!("position {}", i)))
                .collect::<Result<Vec<_>>>()?;
            Geometry::MultiPoint(points)
        }
        GeometryKind::MultiPolygon => {
            let polygons = as_sequence(payload, kind, "coordinates")?
                .iter()
                .enumerate()
                .map(|(p, polygon)| parse_polygon(polygon, p))
                .collect::<Result<Vec<_>>>()?;
            Geometry::MultiPolygon(polygons)
        }
    };

    validate_geometry(&geometry)?;
    Ok(geometry)
}

/// Validates an already-typed geometry: no empty sequences, every position in range.
pub fn validate_geometry(geometry: &Geometry) -> Result<()> {
    match geometry {
        Geometry::Point(position) => validate_position(*position),
        Geometry::MultiPoint(points) => {
            if points.is_empty() {
                return Err(GeodocError::Validation(
                    "MultiPoint coordinates must contain at least one position".to_string(),
                ));
            }
            for (idx, point) in points.iter().enumerate() {
                validate_position(*point).map_err(|e| {
                    GeodocError::Validation(format!("MultiPoint position {}: {}", idx, detail(e)))
                })?;
            }
            Ok(())
        }
        Geometry::MultiPolygon(polygons) => {
            if polygons.is_empty() {
                return Err(GeodocError::Validation(
                    "MultiPolygon coordinates must contain at least one polygon".to_string(),
                ));
            }
            for (p, rings) in polygons.iter().enumerate() {
                if rings.is_empty() {
                    return Err(GeodocError::Validation(format!(
                        "MultiPolygon polygon {} must contain at least one ring",
                        p
                    )));
                }
                for (r, ring) in rings.iter().enumerate() {
                    if ring.is_empty() {
                        return Err(GeodocError::Validation(format!(
                            "MultiPolygon polygon {}, ring {} must contain at least one position",
                            p, r
                        )));
                    }
                    for (idx, position) in ring.iter().enumerate() {
                        validate_position(*position).map_err(|e| {
                            GeodocError::Validation(format!(
                                "MultiPolygon polygon {}, ring {}, position {}: {}",
                                p,
                                r,
                                idx,
                                detail(e)
                            ))
                        })?;
                    }
                }
            }
            Ok(())
        }
    }
}

fn parse_polygon(value: &Value, polygon_idx: usize) -> Result<Vec<Vec<Position>>> {
    let kind = GeometryKind::MultiPolygon;
    as_sequence(value, kind, &format!("polygon {}", polygon_idx))?
        .iter()
        .enumerate()
        .map(|(r, ring)| -> Result<Vec<Position>> {
            as_sequence(ring, kind, &format!("polygon {}, ring {}", polygon_idx, r))?
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    parse_position(
                        p,
                        kind,
                        &format!("polygon {}, ring {}, position {}", polygon_idx, r, i),
                    )
                })
                .collect()
        })
        .collect()
}

fn as_sequence<'a>(value: &'a Value, kind: GeometryKind, path: &str) -> Result<&'a Vec<Value>> {
    value.as_array().ok_or_else(|| {
        GeodocError::Validation(format!(
            "{} {}: expected an array, found {}",
            kind,
            path,
            describe(value)
        ))
    })
}

fn parse_position(value: &Value, kind: GeometryKind, path: &str) -> Result<Position> {
    let items = as_sequence(value, kind, path)?;
    if items.len() != 2 {
        return Err(GeodocError::Validation(format!(
            "{} {}: expected [longitude, latitude], found {} values",
            kind,
            path,
            items.len()
        )));
    }

    let mut position = [0.0; 2];
    for (slot, item) in position.iter_mut().zip(items) {
        *slot = item.as_f64().ok_or_else(|| {
            GeodocError::Validation(format!(
                "{} {}: expected a number, found {}",
                kind,
                path,
                describe(item)
            ))
        })?;
    }
    Ok(position)
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn detail(err: GeodocError) -> String {
    match err {
        GeodocError::Validation(msg) => msg,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_positions() {
        assert!(validate_position([-74.0060, 40.7128]).is_ok());
        assert!(validate_position([180.0, 90.0]).is_ok());
        assert!(validate_position([-180.0, -90.0]).is_ok());
    }

    #[test]
    fn test_invalid_positions() {
        assert!(validate_position([180.1, 0.0]).is_err());
        assert!(validate_position([0.0, -90.1]).is_err());
        assert!(validate_position([f64::INFINITY, 0.0]).is_err());
        assert!(validate_position([0.0, f64::NAN]).is_err());
    }

    #[test]
    fn test_probe_length_is_bad_request() {
        assert!(matches!(
            validate_probe(&[1.0]),
            Err(GeodocError::BadRequest(_))
        ));
        assert!(matches!(
            validate_probe(&[1.0, 2.0, 3.0]),
            Err(GeodocError::BadRequest(_))
        ));
        assert!(matches!(
            validate_probe(&[500.0, 2.0]),
            Err(GeodocError::Validation(_))
        ));
        assert_eq!(validate_probe(&[1.0, 2.0]).unwrap(), [1.0, 2.0]);
    }

    #[test]
    fn test_point_shape() {
        assert_eq!(
            parse_geometry(GeometryKind::Point, &json!([18.891, 17.67687])).unwrap(),
            Geometry::Point([18.891, 17.67687])
        );
        // Integers are numbers too
        assert_eq!(
            parse_geometry(GeometryKind::Point, &json!([1, 2])).unwrap(),
            Geometry::Point([1.0, 2.0])
        );

        for bad in [
            json!([1.0]),
            json!([1.0, 2.0, 3.0]),
            json!([[1.0, 2.0]]),
            json!(["1.0", 2.0]),
            json!({"lon": 1.0, "lat": 2.0}),
            json!(null),
        ] {
            assert!(
                matches!(
                    parse_geometry(GeometryKind::Point, &bad),
                    Err(GeodocError::Validation(_))
                ),
                "accepted {}",
                bad
            );
        }
    }

    #[test]
    fn test_multi_point_shape() {
        let parsed =
            parse_geometry(GeometryKind::MultiPoint, &json!([[1.0, 2.0], [3.0, 4.0]])).unwrap();
        assert_eq!(parsed, Geometry::MultiPoint(vec![[1.0, 2.0], [3.0, 4.0]]));

        assert!(parse_geometry(GeometryKind::MultiPoint, &json!([1.0, 2.0])).is_err());
        assert!(parse_geometry(GeometryKind::MultiPoint, &json!([[1.0, 2.0], [3.0]])).is_err());
        assert!(parse_geometry(GeometryKind::MultiPoint, &json!([])).is_err());
    }

    #[test]
    fn test_multi_polygon_shape() {
        let payload = json!([[[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]]);
        let parsed = parse_geometry(GeometryKind::MultiPolygon, &payload).unwrap();
        assert_eq!(parsed.kind(), GeometryKind::MultiPolygon);

        // Three levels of nesting instead of four
        let shallow = json!([[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]]);
        assert!(parse_geometry(GeometryKind::MultiPolygon, &shallow).is_err());

        assert!(parse_geometry(GeometryKind::MultiPolygon, &json!([[]])).is_err());
        assert!(parse_geometry(GeometryKind::MultiPolygon, &json!([[[]]])).is_err());
    }

    #[test]
    fn test_error_names_offending_path() {
        let payload = json!([[[[0.0, 0.0], [1.0, 0.0]], [[0.0, 0.0], [1.0]]]]);
        let err = parse_geometry(GeometryKind::MultiPolygon, &payload).unwrap_err();
        assert!(err.to_string().contains("polygon 0, ring 1, position 1"));

        let payload = json!([[[[0.0, 0.0], [0.0, 95.0]]]]);
        let err = parse_geometry(GeometryKind::MultiPolygon, &payload).unwrap_err();
        assert!(err.to_string().contains("Latitude out of range"));
    }

    #[test]
    fn test_validate_radius() {
        assert!(validate_radius(1000.0).is_ok());
        assert!(validate_radius(0.1).is_ok());
        assert!(validate_radius(-1.0).is_err());
        assert!(validate_radius(f64::NAN).is_err());
        assert!(validate_radius(50_000_000.0).is_err());
    }
}
