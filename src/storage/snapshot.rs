//! Snapshot files for collection contents.
//!
//! Layout: magic bytes, a version byte, then the bincode-encoded record list in
//! insertion order. Writes go to a `.tmp` sibling that is fsynced and renamed
//! over the previous snapshot.

use crate::error::{GeodocError, Result};
use crate::types::{DocumentId, Geometry, Position, SpatialDocument};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

const SNAPSHOT_MAGIC: &[u8] = b"GEODOC_SNAPSHOT";
const SNAPSHOT_VERSION: u8 = 1;

pub const SNAPSHOT_EXTENSION: &str = "snapshot";

// bincode needs an externally tagged enum; `Geometry` itself is adjacently tagged.
#[derive(Serialize, Deserialize)]
enum StoredCoordinates {
    Point(Position),
    MultiPoint(Vec<Position>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

#[derive(Serialize, Deserialize)]
struct SnapshotRecord {
    id: [u8; 16],
    name: String,
    location: StoredCoordinates,
}

impl From<&SpatialDocument> for SnapshotRecord {
    fn from(doc: &SpatialDocument) -> Self {
        let location = match &doc.location {
            Geometry::Point(p) => StoredCoordinates::Point(*p),
            Geometry::MultiPoint(points) => StoredCoordinates::MultiPoint(points.clone()),
            Geometry::MultiPolygon(polygons) => StoredCoordinates::MultiPolygon(polygons.clone()),
        };
        Self {
            id: doc.id.to_bytes(),
            name: doc.name.clone(),
            location,
        }
    }
}

impl From<SnapshotRecord> for SpatialDocument {
    fn from(record: SnapshotRecord) -> Self {
        let location = match record.location {
            StoredCoordinates::Point(p) => Geometry::Point(p),
            StoredCoordinates::MultiPoint(points) => Geometry::MultiPoint(points),
            StoredCoordinates::MultiPolygon(polygons) => Geometry::MultiPolygon(polygons),
        };
        Self {
            id: DocumentId::from_bytes(record.id),
            name: record.name,
            location,
        }
    }
}

/// Snapshot of a single collection.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// `<dir>/<collection>.snapshot`
    pub fn for_collection<P: AsRef<Path>>(dir: P, collection: &str) -> Self {
        Self::new(
            dir.as_ref()
                .join(format!("{}.{}", collection, SNAPSHOT_EXTENSION)),
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Documents in stored order; a missing or empty file yields none.
    pub fn load(&self) -> Result<Vec<SpatialDocument>> {
        if !self.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        if file.metadata()?.len() == 0 {
            return Ok(Vec::new());
        }

        let mut reader = BufReader::new(file);

        let mut magic = vec![0u8; SNAPSHOT_MAGIC.len()];
        reader.read_exact(&mut magic)?;
        if magic != SNAPSHOT_MAGIC {
            return Err(GeodocError::InvalidFormat(format!(
                "{} is not a snapshot file",
                self.path.display()
            )));
        }

        let mut version = [0u8; 1];
        reader.read_exact(&mut version)?;
        if version[0] != SNAPSHOT_VERSION {
            return Err(GeodocError::InvalidFormat(format!(
                "unsupported snapshot version {}",
                version[0]
            )));
        }

        let records: Vec<SnapshotRecord> = bincode::deserialize_from(&mut reader)?;
        log::debug!(
            "Loaded {} documents from {}",
            records.len(),
            self.path.display()
        );
        Ok(records.into_iter().map(SpatialDocument::from).collect())
    }

    pub fn save(&self, documents: &[SpatialDocument]) -> Result<()> {
        let temp_path = self.temp_path();

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        let mut writer = BufWriter::new(file);

        writer.write_all(SNAPSHOT_MAGIC)?;
        writer.write_all(&[SNAPSHOT_VERSION])?;

        let records: Vec<SnapshotRecord> = documents.iter().map(SnapshotRecord::from).collect();
        bincode::serialize_into(&mut writer, &records)?;

        writer.flush()?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        drop(file);

        std::fs::rename(&temp_path, &self.path)?;
        self.sync_parent_dir()?;

        log::debug!(
            "Wrote {} documents to {}",
            documents.len(),
            self.path.display()
        );
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        if let Some(name) = temp.file_name() {
            let mut new_name = name.to_string_lossy().into_owned();
            new_name.push_str(".tmp");
            temp.set_file_name(new_name);
        }
        temp
    }

    fn sync_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            File::open(parent)?.sync_all()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Vec<SpatialDocument> {
        vec![
            SpatialDocument {
                id: DocumentId::new(),
                name: "A".to_string(),
                location: Geometry::Point([77.59, 12.97]),
            },
            SpatialDocument {
                id: DocumentId::new(),
                name: "zone".to_string(),
                location: Geometry::MultiPolygon(vec![vec![
                    vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 0.0]],
                    vec![[2.0, 2.0], [3.0, 2.0], [3.0, 3.0], [2.0, 2.0]],
                ]]),
            },
        ]
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let snapshot = SnapshotFile::for_collection(dir.path(), "Point");
        assert_eq!(snapshot.path(), dir.path().join("Point.snapshot"));

        let docs = sample();
        snapshot.save(&docs).unwrap();
        assert!(snapshot.exists());
        assert!(!snapshot.temp_path().exists());

        assert_eq!(snapshot.load().unwrap(), docs);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let snapshot = SnapshotFile::for_collection(dir.path(), "MultiPoints");
        assert!(snapshot.load().unwrap().is_empty());
    }

    #[test]
    fn test_overwrite_replaces_contents() {
        let dir = TempDir::new().unwrap();
        let snapshot = SnapshotFile::for_collection(dir.path(), "Point");
        snapshot.save(&sample()).unwrap();
        snapshot.save(&[]).unwrap();
        assert!(snapshot.load().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_foreign_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bogus.snapshot");
        std::fs::write(&path, b"definitely not a snapshot file").unwrap();

        let err = SnapshotFile::new(&path).load().unwrap_err();
        assert!(matches!(err, GeodocError::InvalidFormat(_)));
    }
}
