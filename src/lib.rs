//! Geometry-aware document store.
//!
//! Documents are `{name, location}` records whose location is a Point,
//! MultiPoint or MultiPolygon. Each kind lives in its own spatially indexed
//! collection and is reached through a resolution pipeline that answers
//! searches by name, then by exact geometry (or containment for polygons),
//! then by a radius query around the probe.
//!
//! ```rust
//! use geodoc::{Geodoc, Resolution, SearchQuery};
//! use serde_json::json;
//!
//! let db = Geodoc::memory()?;
//! let points = db.points();
//! points.create("A", &json!([77.59, 12.97]))?;
//!
//! let hit = points.search(&SearchQuery::near(77.59, 12.97))?;
//! assert_eq!(hit.resolution, Resolution::Exact);
//!
//! let miss = points.search(&SearchQuery::near(0.0, 0.0).with_radius(10.0));
//! assert!(miss.is_err());
//! # Ok::<(), geodoc::GeodocError>(())
//! ```

pub mod boundary;
pub mod builder;
pub mod collection;
pub mod compute;
pub mod config;
pub mod db;
pub mod error;
pub mod pipeline;
pub mod storage;
pub mod types;

#[cfg(feature = "server")]
pub mod server;

pub use builder::DBBuilder;
pub use db::DB;
pub use error::{ErrorCategory, GeodocError, Result};

pub type Geodoc = DB;

pub use compute::{spatial, validation};

pub use collection::{MemoryCollection, SpatialCollection};

pub use config::{CollectionNames, Config, PersistenceConfig};

pub use pipeline::{
    KindPolicy, MultiPointKind, MultiPolygonKind, Pipeline, PointKind, Resolution, SearchOutcome,
    SearchQuery, UpdateQuery,
};

pub use types::{
    DbStats, DocumentFilter, DocumentId, DocumentPatch, Geometry, GeometryKind, Position,
    SpatialDocument,
};

#[cfg(feature = "snapshot")]
pub use storage::SnapshotFile;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {
    pub use crate::{DBBuilder, Geodoc, GeodocError, Result};

    pub use crate::{Config, Geometry, GeometryKind, SpatialDocument};

    pub use crate::{Resolution, SearchOutcome, SearchQuery, UpdateQuery};

    pub use crate::{MemoryCollection, SpatialCollection};
}
