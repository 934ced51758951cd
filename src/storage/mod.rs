//! On-disk persistence for collections.
//!
//! Collections live in memory; a data directory holds one snapshot file per
//! collection, loaded on open and rewritten on close.

#[cfg(feature = "snapshot")]
mod snapshot;

#[cfg(feature = "snapshot")]
pub use snapshot::{SNAPSHOT_EXTENSION, SnapshotFile};
