//! Pure computation over geometries, independent of any store.
//!
//! - `validation`: shape and range checks for raw coordinate payloads
//! - `spatial`: spherical distance and containment predicates
//! - `geojson`: conversion to and from `geojson` types

pub mod geojson;
pub mod spatial;
pub mod validation;
