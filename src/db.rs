//! Database handle owning one collection per geometry kind.
//!
//! `DB` wires collections, pipelines and configuration together and owns the
//! open/close lifecycle. With a data directory, each collection is restored from
//! its snapshot on open and written back on close.

use crate::collection::{MemoryCollection, SpatialCollection};
use crate::config::Config;
use crate::error::{GeodocError, Result};
use crate::pipeline::{MultiPointKind, MultiPolygonKind, Pipeline, PointKind};
use crate::types::{DbStats, GeometryKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(feature = "snapshot")]
use crate::storage::SnapshotFile;

const MEMORY_PATH: &str = ":memory:";

/// Geometry document database.
///
/// Cheap to clone; clones share the same collections.
#[derive(Clone)]
pub struct DB {
    points: Arc<MemoryCollection>,
    multi_points: Arc<MemoryCollection>,
    multi_polygons: Arc<MemoryCollection>,
    data_dir: Option<PathBuf>,
    closed: Arc<AtomicBool>,
    config: Config,
}

impl DB {
    /// Open or create a database in the given directory. Use ":memory:" for
    /// a database without persistence.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, Config::default())
    }

    pub fn builder() -> crate::builder::DBBuilder {
        crate::builder::DBBuilder::new()
    }

    /// Open or create a database with custom configuration.
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: Config) -> Result<Self> {
        config
            .validate()
            .map_err(|e| GeodocError::Validation(format!("invalid configuration: {}", e)))?;

        let path = path.as_ref();
        if path.to_str() == Some(MEMORY_PATH) {
            return Ok(Self::assemble(
                MemoryCollection::new(&config.collections.point, GeometryKind::Point),
                MemoryCollection::new(&config.collections.multi_point, GeometryKind::MultiPoint),
                MemoryCollection::new(
                    &config.collections.multi_polygon,
                    GeometryKind::MultiPolygon,
                ),
                None,
                config,
            ));
        }

        std::fs::create_dir_all(path)?;
        let points = Self::restore(path, &config.collections.point, GeometryKind::Point)?;
        let multi_points =
            Self::restore(path, &config.collections.multi_point, GeometryKind::MultiPoint)?;
        let multi_polygons = Self::restore(
            path,
            &config.collections.multi_polygon,
            GeometryKind::MultiPolygon,
        )?;

        log::info!(
            "Opened database at {} ({} points, {} multi-points, {} multi-polygons)",
            path.display(),
            points.len()?,
            multi_points.len()?,
            multi_polygons.len()?
        );

        Ok(Self::assemble(
            points,
            multi_points,
            multi_polygons,
            Some(path.to_path_buf()),
            config,
        ))
    }

    /// Create an in-memory database with default configuration.
    pub fn memory() -> Result<Self> {
        Self::open(MEMORY_PATH)
    }

    /// Create an in-memory database with custom configuration.
    pub fn memory_with_config(config: Config) -> Result<Self> {
        Self::open_with_config(MEMORY_PATH, config)
    }

    fn assemble(
        points: MemoryCollection,
        multi_points: MemoryCollection,
        multi_polygons: MemoryCollection,
        data_dir: Option<PathBuf>,
        config: Config,
    ) -> Self {
        Self {
            points: Arc::new(points),
            multi_points: Arc::new(multi_points),
            multi_polygons: Arc::new(multi_polygons),
            data_dir,
            closed: Arc::new(AtomicBool::new(false)),
            config,
        }
    }

    #[cfg(feature = "snapshot")]
    fn restore(dir: &Path, name: &str, kind: GeometryKind) -> Result<MemoryCollection> {
        let documents = SnapshotFile::for_collection(dir, name).load()?;
        MemoryCollection::from_documents(name, kind, documents)
    }

    #[cfg(not(feature = "snapshot"))]
    fn restore(_dir: &Path, name: &str, kind: GeometryKind) -> Result<MemoryCollection> {
        log::warn!(
            "Snapshot support disabled, collection '{}' starts empty",
            name
        );
        Ok(MemoryCollection::new(name, kind))
    }

    pub fn points(&self) -> Pipeline<PointKind> {
        Pipeline::from_parts(self.points.clone(), self.config.default_radius_meters)
    }

    pub fn multi_points(&self) -> Pipeline<MultiPointKind> {
        Pipeline::from_parts(self.multi_points.clone(), self.config.default_radius_meters)
    }

    pub fn multi_polygons(&self) -> Pipeline<MultiPolygonKind> {
        Pipeline::from_parts(
            self.multi_polygons.clone(),
            self.config.default_radius_meters,
        )
    }

    /// The collection that stores `kind`.
    pub fn collection(&self, kind: GeometryKind) -> Arc<dyn SpatialCollection> {
        match kind {
            GeometryKind::Point => self.points.clone(),
            GeometryKind::MultiPoint => self.multi_points.clone(),
            GeometryKind::MultiPolygon => self.multi_polygons.clone(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Directory holding snapshots, `None` for in-memory databases.
    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// Write every collection to its snapshot file. No-op in memory.
    pub fn snapshot(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(GeodocError::DatabaseClosed);
        }
        let Some(dir) = &self.data_dir else {
            return Ok(());
        };
        self.write_snapshots(dir)
    }

    #[cfg(feature = "snapshot")]
    fn write_snapshots(&self, dir: &Path) -> Result<()> {
        for collection in [&self.points, &self.multi_points, &self.multi_polygons] {
            let documents = collection.documents()?;
            SnapshotFile::for_collection(dir, collection.name()).save(&documents)?;
        }
        log::debug!("Snapshot written to {}", dir.display());
        Ok(())
    }

    #[cfg(not(feature = "snapshot"))]
    fn write_snapshots(&self, _dir: &Path) -> Result<()> {
        Ok(())
    }

    /// Close the database. Snapshots are written first when configured.
    ///
    /// Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(());
        }
        if self.config.persistence.snapshot_on_close {
            self.snapshot()?;
        }
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        self.points.close()?;
        self.multi_points.close()?;
        self.multi_polygons.close()?;
        log::info!("Database closed");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        if self.closed.load(Ordering::Acquire) {
            return Err(GeodocError::DatabaseClosed);
        }
        Ok(DbStats {
            point_documents: self.points.len()?,
            multi_point_documents: self.multi_points.len()?,
            multi_polygon_documents: self.multi_polygons.len()?,
        })
    }
}

impl std::fmt::Debug for DB {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DB")
            .field("data_dir", &self.data_dir)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
