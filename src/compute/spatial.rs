//! Spherical geometry predicates used by the collection queries.
//!
//! Distances are measured on a sphere of radius [`EARTH_RADIUS_METERS`], so a
//! radius in meters corresponds to an angular radius of `meters / 6378137`.
//! Polygon containment is evaluated planar in degree space, the same way the
//! stored coordinates are indexed.

use crate::types::{Geometry, Position};
use geo::{Closest, Distance, HaversineClosestPoint, HaversineMeasure, Intersects, Point};
use rstar::AABB;
use std::f64::consts::{FRAC_PI_2, PI};

/// Earth radius used to convert meters to angular distance.
pub const EARTH_RADIUS_METERS: f64 = 6_378_137.0;

/// Circumference of the sphere of radius [`EARTH_RADIUS_METERS`].
pub const EARTH_CIRCUMFERENCE_METERS: f64 = 2.0 * PI * EARTH_RADIUS_METERS;

// Padding for envelope edges so rounding never prunes a boundary hit.
const ENVELOPE_EPSILON_DEGREES: f64 = 1e-9;

/// Converts a distance in meters to radians of arc.
#[inline]
pub fn angular_radius(radius_meters: f64) -> f64 {
    radius_meters / EARTH_RADIUS_METERS
}

/// Great-circle angle in radians between two positions.
#[inline]
pub fn angular_distance(a: Position, b: Position) -> f64 {
    HaversineMeasure::new(1.0).distance(Point::from(a), Point::from(b))
}

/// Great-circle distance in meters between two positions.
#[inline]
pub fn distance_meters(a: Position, b: Position) -> f64 {
    angular_distance(a, b) * EARTH_RADIUS_METERS
}

/// Exact structural match of a probe against a stored geometry.
///
/// A Point matches when its pair equals the probe; a MultiPoint matches when any
/// member equals the probe. Polygons never match exactly, use [`intersects`].
pub fn matches_exactly(geometry: &Geometry, probe: Position) -> bool {
    match geometry {
        Geometry::Point(p) => *p == probe,
        Geometry::MultiPoint(points) => points.contains(&probe),
        Geometry::MultiPolygon(_) => false,
    }
}

/// True when the probe lies inside or on the boundary of the geometry.
pub fn intersects(geometry: &Geometry, probe: Position) -> bool {
    match geometry {
        Geometry::MultiPolygon(_) => geometry
            .to_multi_polygon()
            .is_some_and(|mp| mp.intersects(&Point::from(probe))),
        _ => matches_exactly(geometry, probe),
    }
}

/// The set of points within a fixed angular distance of a center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalCap {
    center: Position,
    angle: f64,
}

impl SphericalCap {
    pub fn new(center: Position, angle: f64) -> Self {
        Self { center, angle }
    }

    pub fn from_radius_meters(center: Position, radius_meters: f64) -> Self {
        Self::new(center, angular_radius(radius_meters))
    }

    pub fn center(&self) -> Position {
        self.center
    }

    /// Angular radius in radians.
    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn contains(&self, position: Position) -> bool {
        angular_distance(self.center, position) <= self.angle
    }

    /// Distance in meters from the center to the nearest part of `geometry`,
    /// or `None` when no part of it falls inside the cap.
    ///
    /// - Point: distance to the point.
    /// - MultiPoint: distance to the nearest member.
    /// - MultiPolygon: zero when a polygon covers the center, otherwise the
    ///   great-circle distance to the nearest boundary position.
    pub fn distance_to(&self, geometry: &Geometry) -> Option<f64> {
        let angle = match geometry {
            Geometry::Point(p) => angular_distance(self.center, *p),
            Geometry::MultiPoint(points) => points
                .iter()
                .map(|p| angular_distance(self.center, *p))
                .fold(f64::INFINITY, f64::min),
            Geometry::MultiPolygon(_) => {
                let mp = geometry.to_multi_polygon()?;
                let center = Point::from(self.center);
                if mp.intersects(&center) {
                    0.0
                } else {
                    match mp.haversine_closest_point(&center) {
                        Closest::Intersection(p) | Closest::SinglePoint(p) => {
                            angular_distance(self.center, [p.x(), p.y()])
                        }
                        Closest::Indeterminate => return None,
                    }
                }
            }
        };

        (angle.is_finite() && angle <= self.angle).then_some(angle * EARTH_RADIUS_METERS)
    }

    /// Degree-space box enclosing the cap, used to prune index candidates.
    ///
    /// Widens to the full longitude range when the cap reaches a pole or crosses
    /// the antimeridian.
    pub fn envelope(&self) -> AABB<[f64; 2]> {
        let [lon, lat] = self.center;
        let lat_span = self.angle.to_degrees() + ENVELOPE_EPSILON_DEGREES;
        let min_lat = (lat - lat_span).max(-90.0);
        let max_lat = (lat + lat_span).min(90.0);

        if self.angle >= FRAC_PI_2 || lat - lat_span <= -90.0 || lat + lat_span >= 90.0 {
            return AABB::from_corners([-180.0, min_lat], [180.0, max_lat]);
        }

        let ratio = (self.angle.sin() / lat.to_radians().cos()).clamp(-1.0, 1.0);
        let lon_span = ratio.asin().to_degrees() + ENVELOPE_EPSILON_DEGREES;
        let (min_lon, max_lon) = (lon - lon_span, lon + lon_span);

        if min_lon < -180.0 || max_lon > 180.0 {
            return AABB::from_corners([-180.0, min_lat], [180.0, max_lat]);
        }

        AABB::from_corners([min_lon, min_lat], [max_lon, max_lat])
    }
}
