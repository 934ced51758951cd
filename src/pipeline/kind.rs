//! Per-kind capabilities that parameterise the resolution pipeline.

use crate::types::GeometryKind;

/// How the coordinate branch looks for a direct hit before widening to a radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExactMatch {
    /// Stored coordinates equal the probe.
    Geometry,
    /// Stored area contains or touches the probe.
    Intersecting,
}

/// What a search does when a supplied name matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMiss {
    NotFound,
    /// Continue with the coordinate branch when coordinates were supplied.
    FallThrough,
}

/// Capability set of one geometry kind.
pub trait KindPolicy: Send + Sync + 'static {
    const KIND: GeometryKind;
    const EXACT_MATCH: ExactMatch;
    const NAME_MISS: NameMiss;
    /// Whether updates may select documents by their coordinates.
    const COORDINATE_FILTER: bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PointKind;

#[derive(Debug, Clone, Copy, Default)]
pub struct MultiPointKind;

#[derive(Debug, Clone, Copy, Default)]
pub struct MultiPolygonKind;

impl KindPolicy for PointKind {
    const KIND: GeometryKind = GeometryKind::Point;
    const EXACT_MATCH: ExactMatch = ExactMatch::Geometry;
    const NAME_MISS: NameMiss = NameMiss::NotFound;
    const COORDINATE_FILTER: bool = true;
}

impl KindPolicy for MultiPointKind {
    const KIND: GeometryKind = GeometryKind::MultiPoint;
    const EXACT_MATCH: ExactMatch = ExactMatch::Geometry;
    const NAME_MISS: NameMiss = NameMiss::NotFound;
    const COORDINATE_FILTER: bool = true;
}

impl KindPolicy for MultiPolygonKind {
    const KIND: GeometryKind = GeometryKind::MultiPolygon;
    const EXACT_MATCH: ExactMatch = ExactMatch::Intersecting;
    const NAME_MISS: NameMiss = NameMiss::FallThrough;
    const COORDINATE_FILTER: bool = false;
}
