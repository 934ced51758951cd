//! R*-tree over document bounding boxes.
//!
//! The index only prunes: every candidate it yields still has to pass the exact
//! predicate of the query that asked for it.

use crate::types::{DocumentId, Geometry, Position};
use rstar::{AABB, RTree, RTreeObject};

/// Bounding box of one stored geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedGeometry {
    pub min: Position,
    pub max: Position,
    pub id: DocumentId,
}

impl IndexedGeometry {
    pub fn new(id: DocumentId, geometry: &Geometry) -> Option<Self> {
        let (min, max) = geometry.bounding_box()?;
        Some(Self { min, max, id })
    }
}

impl RTreeObject for IndexedGeometry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.min, self.max)
    }
}

#[derive(Default)]
pub struct GeometryIndex {
    tree: RTree<IndexedGeometry>,
}

impl GeometryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-load from existing documents (snapshot restore).
    pub fn bulk_load<'a>(entries: impl IntoIterator<Item = (DocumentId, &'a Geometry)>) -> Self {
        let items = entries
            .into_iter()
            .filter_map(|(id, geometry)| IndexedGeometry::new(id, geometry))
            .collect();
        Self {
            tree: RTree::bulk_load(items),
        }
    }

    pub fn insert(&mut self, id: DocumentId, geometry: &Geometry) {
        match IndexedGeometry::new(id, geometry) {
            Some(entry) => self.tree.insert(entry),
            None => log::warn!("Geometry of document {} is empty, not indexed", id),
        }
    }

    pub fn remove(&mut self, id: DocumentId, geometry: &Geometry) -> bool {
        IndexedGeometry::new(id, geometry)
            .and_then(|entry| self.tree.remove(&entry))
            .is_some()
    }

    /// Documents whose bounding box intersects `envelope`.
    pub fn candidates(&self, envelope: &AABB<[f64; 2]>) -> impl Iterator<Item = DocumentId> + '_ {
        self.tree
            .locate_in_envelope_intersecting(envelope)
            .map(|entry| entry.id)
    }

    /// Documents whose bounding box covers `position`.
    pub fn covering(&self, position: Position) -> impl Iterator<Item = DocumentId> + '_ {
        self.tree
            .locate_in_envelope_intersecting(&AABB::from_point(position))
            .map(|entry| entry.id)
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
