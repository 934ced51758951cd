//! In-memory spatial collection.
//!
//! Documents, the name index and the R*-tree live behind one lock, so an insert
//! or update is visible to readers either completely or not at all.

use super::SpatialCollection;
use super::index::GeometryIndex;
use crate::compute::spatial::{self, SphericalCap};
use crate::error::{GeodocError, Result};
use crate::types::{
    DocumentFilter, DocumentId, DocumentPatch, Geometry, GeometryKind, Position, SpatialDocument,
};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone)]
struct StoredDocument {
    seq: u64,
    document: SpatialDocument,
}

#[derive(Default)]
struct CollectionState {
    documents: FxHashMap<DocumentId, StoredDocument>,
    by_name: FxHashMap<String, SmallVec<[DocumentId; 4]>>,
    index: GeometryIndex,
    next_seq: u64,
}

impl CollectionState {
    fn push(&mut self, document: SpatialDocument) {
        let seq = self.next_seq;
        self.next_seq += 1;

        self.by_name
            .entry(document.name.clone())
            .or_default()
            .push(document.id);
        self.index.insert(document.id, &document.location);
        self.documents
            .insert(document.id, StoredDocument { seq, document });
    }

    fn unlink_name(&mut self, name: &str, id: DocumentId) {
        if let Some(ids) = self.by_name.get_mut(name) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.by_name.remove(name);
            }
        }
    }

    /// Resolve ids to documents, ordered by insertion.
    fn collect_ordered(
        &self,
        ids: impl IntoIterator<Item = DocumentId>,
        predicate: impl Fn(&SpatialDocument) -> bool,
    ) -> Vec<SpatialDocument> {
        let mut hits: Vec<&StoredDocument> = ids
            .into_iter()
            .filter_map(|id| self.documents.get(&id))
            .filter(|stored| predicate(&stored.document))
            .collect();
        hits.sort_by_key(|stored| stored.seq);
        hits.into_iter().map(|stored| stored.document.clone()).collect()
    }

    /// First document in insertion order matching the filter.
    fn first_match(&self, filter: &DocumentFilter) -> Option<DocumentId> {
        if let Some(id) = filter.id {
            return self
                .documents
                .get(&id)
                .filter(|stored| filter.matches(&stored.document))
                .map(|stored| stored.document.id);
        }

        let candidates: Vec<DocumentId> = if let Some(name) = &filter.name {
            self.by_name
                .get(name)
                .map(|ids| ids.to_vec())
                .unwrap_or_default()
        } else if let Some((min, max)) = filter.location.as_ref().and_then(Geometry::bounding_box)
        {
            self.index
                .candidates(&rstar::AABB::from_corners(min, max))
                .collect()
        } else {
            self.documents.keys().copied().collect()
        };

        candidates
            .into_iter()
            .filter_map(|id| self.documents.get(&id))
            .filter(|stored| filter.matches(&stored.document))
            .min_by_key(|stored| stored.seq)
            .map(|stored| stored.document.id)
    }
}

/// Spatial collection held entirely in memory.
///
/// ```rust
/// use geodoc::{Geometry, GeometryKind, MemoryCollection, SpatialCollection};
///
/// let points = MemoryCollection::new("Point", GeometryKind::Point);
/// let id = points.insert("A".to_string(), Geometry::Point([77.59, 12.97]))?;
/// let hits = points.find_by_exact_geometry([77.59, 12.97])?;
/// assert_eq!(hits[0].id, id);
/// # Ok::<(), geodoc::GeodocError>(())
/// ```
pub struct MemoryCollection {
    name: String,
    kind: GeometryKind,
    state: RwLock<CollectionState>,
    closed: AtomicBool,
}

impl MemoryCollection {
    pub fn new(name: impl Into<String>, kind: GeometryKind) -> Self {
        Self {
            name: name.into(),
            kind,
            state: RwLock::new(CollectionState::default()),
            closed: AtomicBool::new(false),
        }
    }

    /// Rebuild a collection from previously stored documents, keeping their ids
    /// and order.
    pub fn from_documents(
        name: impl Into<String>,
        kind: GeometryKind,
        documents: Vec<SpatialDocument>,
    ) -> Result<Self> {
        let collection = Self::new(name, kind);
        for doc in &documents {
            collection.check_kind(&doc.location)?;
        }

        {
            let mut state = collection.state.write();
            state.index = GeometryIndex::bulk_load(documents.iter().map(|d| (d.id, &d.location)));
            for (seq, document) in documents.into_iter().enumerate() {
                state
                    .by_name
                    .entry(document.name.clone())
                    .or_default()
                    .push(document.id);
                state.documents.insert(
                    document.id,
                    StoredDocument {
                        seq: seq as u64,
                        document,
                    },
                );
            }
            state.next_seq = state.documents.len() as u64;
        }

        Ok(collection)
    }

    #[inline]
    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(GeodocError::DatabaseClosed);
        }
        Ok(())
    }

    fn check_kind(&self, location: &Geometry) -> Result<()> {
        if location.kind() != self.kind {
            return Err(GeodocError::Store(format!(
                "collection '{}' stores {} geometries, got {}",
                self.name,
                self.kind,
                location.kind()
            )));
        }
        Ok(())
    }
}

impl SpatialCollection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> GeometryKind {
        self.kind
    }

    fn insert(&self, name: String, location: Geometry) -> Result<DocumentId> {
        self.ensure_open()?;
        self.check_kind(&location)?;

        let id = DocumentId::new();
        self.state.write().push(SpatialDocument { id, name, location });
        Ok(id)
    }

    fn get(&self, id: &DocumentId) -> Result<Option<SpatialDocument>> {
        self.ensure_open()?;
        Ok(self
            .state
            .read()
            .documents
            .get(id)
            .map(|stored| stored.document.clone()))
    }

    fn find_by_name(&self, name: &str) -> Result<Vec<SpatialDocument>> {
        self.ensure_open()?;
        let state = self.state.read();
        let Some(ids) = state.by_name.get(name) else {
            return Ok(Vec::new());
        };
        Ok(state.collect_ordered(ids.iter().copied(), |_| true))
    }

    fn find_by_exact_geometry(&self, probe: Position) -> Result<Vec<SpatialDocument>> {
        self.ensure_open()?;
        let state = self.state.read();
        Ok(state.collect_ordered(state.index.covering(probe), |doc| {
            spatial::matches_exactly(&doc.location, probe)
        }))
    }

    fn find_intersecting(&self, probe: Position) -> Result<Vec<SpatialDocument>> {
        self.ensure_open()?;
        let state = self.state.read();
        Ok(state.collect_ordered(state.index.covering(probe), |doc| {
            spatial::intersects(&doc.location, probe)
        }))
    }

    fn find_within_radius(
        &self,
        center: Position,
        radius_meters: f64,
    ) -> Result<Vec<SpatialDocument>> {
        self.ensure_open()?;
        let cap = SphericalCap::from_radius_meters(center, radius_meters);
        let state = self.state.read();

        let mut hits: Vec<(f64, &StoredDocument)> = state
            .index
            .candidates(&cap.envelope())
            .filter_map(|id| state.documents.get(&id))
            .filter_map(|stored| {
                cap.distance_to(&stored.document.location)
                    .map(|distance| (distance, stored))
            })
            .collect();

        if self.kind == GeometryKind::Point {
            hits.sort_by(|(da, a), (db, b)| {
                da.partial_cmp(db)
                    .unwrap_or(CmpOrdering::Equal)
                    .then(a.seq.cmp(&b.seq))
            });
        } else {
            hits.sort_by_key(|(_, stored)| stored.seq);
        }

        Ok(hits
            .into_iter()
            .map(|(_, stored)| stored.document.clone())
            .collect())
    }

    fn update(&self, filter: &DocumentFilter, patch: &DocumentPatch) -> Result<usize> {
        self.ensure_open()?;
        if let Some(location) = &patch.location {
            self.check_kind(location)?;
        }

        let mut state = self.state.write();
        let Some(id) = state.first_match(filter) else {
            return Ok(0);
        };

        let Some(previous) = state.documents.get(&id).map(|s| s.document.clone()) else {
            return Ok(0);
        };
        let mut updated = previous.clone();
        patch.apply(&mut updated);

        if updated.name != previous.name {
            state.unlink_name(&previous.name, id);
            state.by_name.entry(updated.name.clone()).or_default().push(id);
        }
        if updated.location != previous.location {
            state.index.remove(id, &previous.location);
            state.index.insert(id, &updated.location);
        }
        if let Some(stored) = state.documents.get_mut(&id) {
            stored.document = updated;
        }

        Ok(1)
    }

    fn documents(&self) -> Result<Vec<SpatialDocument>> {
        self.ensure_open()?;
        let state = self.state.read();
        Ok(state.collect_ordered(state.documents.keys().copied(), |_| true))
    }

    fn len(&self) -> Result<usize> {
        self.ensure_open()?;
        Ok(self.state.read().documents.len())
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
