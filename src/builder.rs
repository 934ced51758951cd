//! Database builder
//!
//! Chooses between an in-memory database and one persisted to a data directory.

use crate::config::Config;
use crate::db::DB;
use crate::error::Result;
use std::path::PathBuf;

/// Builder for database configuration with an optional data directory.
#[derive(Debug)]
pub struct DBBuilder {
    path: Option<PathBuf>,
    config: Config,
}

impl DBBuilder {
    /// Create a new builder with default in-memory configuration.
    pub fn new() -> Self {
        Self {
            path: None,
            config: Config::default(),
        }
    }

    /// Directory for collection snapshots.
    pub fn path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Keep everything in memory.
    pub fn in_memory(mut self) -> Self {
        self.path = None;
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Radius used by searches that do not supply one.
    pub fn default_radius(mut self, radius_meters: f64) -> Self {
        self.config.default_radius_meters = radius_meters;
        self
    }

    pub fn build(self) -> Result<DB> {
        match self.path {
            Some(path) => DB::open_with_config(path, self.config),
            None => DB::memory_with_config(self.config),
        }
    }
}

impl Default for DBBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_default_is_memory() {
        let db = DBBuilder::new().build().unwrap();
        assert!(db.data_dir().is_none());
        db.points().create("A", &json!([0.0, 0.0])).unwrap();
    }

    #[test]
    fn test_builder_with_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let db = DBBuilder::new().path(dir.path()).build().unwrap();
        assert_eq!(db.data_dir(), Some(dir.path()));
    }

    #[test]
    fn test_builder_in_memory_overrides_path() {
        let db = DBBuilder::new()
            .path("/nonexistent/geodoc")
            .in_memory()
            .build()
            .unwrap();
        assert!(db.data_dir().is_none());
    }

    #[test]
    fn test_builder_default_radius_is_validated() {
        assert!(DBBuilder::new().default_radius(0.0).build().is_err());
        let db = DBBuilder::new().default_radius(250.0).build().unwrap();
        assert_eq!(db.config().default_radius_meters, 250.0);
    }
}
