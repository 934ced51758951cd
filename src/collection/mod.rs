//! Spatial collection abstraction
//!
//! A collection holds the `{name, location}` documents of one geometry kind
//! behind a spatial index. The resolution pipelines only talk to this trait, so
//! the store client can be swapped without touching query policy.

use crate::error::Result;
use crate::types::{
    DocumentFilter, DocumentId, DocumentPatch, Geometry, GeometryKind, Position, SpatialDocument,
};

mod index;
mod memory;

pub use index::{GeometryIndex, IndexedGeometry};
pub use memory::MemoryCollection;

/// Persistence and spatial indexing for one geometry kind's documents.
///
/// Every operation is atomic at single-document granularity. Finds return
/// documents in insertion order unless stated otherwise.
pub trait SpatialCollection: Send + Sync {
    /// Collection name, also used as the snapshot file stem.
    fn name(&self) -> &str;

    /// The only geometry kind this collection accepts.
    fn kind(&self) -> GeometryKind;

    /// Append a new document and return its assigned id.
    fn insert(&self, name: String, location: Geometry) -> Result<DocumentId>;

    fn get(&self, id: &DocumentId) -> Result<Option<SpatialDocument>>;

    /// Exact match on the name field.
    fn find_by_name(&self, name: &str) -> Result<Vec<SpatialDocument>>;

    /// Documents whose coordinates structurally equal the probe (a Point equal
    /// to it, or a MultiPoint with a member equal to it).
    fn find_by_exact_geometry(&self, probe: Position) -> Result<Vec<SpatialDocument>>;

    /// Documents whose geometry contains or touches the probe.
    fn find_intersecting(&self, probe: Position) -> Result<Vec<SpatialDocument>>;

    /// Documents with some part inside the spherical cap of `radius_meters`
    /// around `center`. Point collections return nearest first.
    fn find_within_radius(
        &self,
        center: Position,
        radius_meters: f64,
    ) -> Result<Vec<SpatialDocument>>;

    /// Apply `patch` to the first document matching `filter`.
    ///
    /// Returns the number of documents matched (0 or 1).
    fn update(&self, filter: &DocumentFilter, patch: &DocumentPatch) -> Result<usize>;

    /// All documents in insertion order.
    fn documents(&self) -> Result<Vec<SpatialDocument>>;

    fn len(&self) -> Result<usize>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn close(&self) -> Result<()>;

    fn is_closed(&self) -> bool;
}
