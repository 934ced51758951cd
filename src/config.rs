//! Database configuration.
//!
//! Configuration is plain serde data so it can be loaded from JSON (or TOML with
//! the `toml` feature) by whatever process owns the database.

use crate::compute::spatial::EARTH_CIRCUMFERENCE_METERS;
use serde::de::Error;
use serde::{Deserialize, Serialize};

/// Database configuration
///
/// # Example
///
/// ```rust
/// use geodoc::Config;
///
/// let json = r#"{ "default_radius_meters": 250.0 }"#;
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.default_radius_meters, 250.0);
/// assert_eq!(config.collections.point, "Point");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Radius used by searches that do not supply one.
    #[serde(default = "Config::default_radius_meters")]
    pub default_radius_meters: f64,

    #[serde(default)]
    pub collections: CollectionNames,

    #[serde(default)]
    pub persistence: PersistenceConfig,
}

/// Collection name per geometry kind; also the snapshot file stem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionNames {
    #[serde(default = "CollectionNames::default_point")]
    pub point: String,
    #[serde(default = "CollectionNames::default_multi_point")]
    pub multi_point: String,
    #[serde(default = "CollectionNames::default_multi_polygon")]
    pub multi_polygon: String,
}

impl CollectionNames {
    fn default_point() -> String {
        "Point".to_string()
    }

    fn default_multi_point() -> String {
        "MultiPoints".to_string()
    }

    fn default_multi_polygon() -> String {
        "MultiplePolygon".to_string()
    }

    fn iter(&self) -> impl Iterator<Item = &str> {
        [
            self.point.as_str(),
            self.multi_point.as_str(),
            self.multi_polygon.as_str(),
        ]
        .into_iter()
    }
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self {
            point: Self::default_point(),
            multi_point: Self::default_multi_point(),
            multi_polygon: Self::default_multi_polygon(),
        }
    }
}

/// Configuration for on-disk snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersistenceConfig {
    /// Write every collection to its snapshot file when the database closes.
    #[serde(default = "PersistenceConfig::default_snapshot_on_close")]
    pub snapshot_on_close: bool,
}

impl PersistenceConfig {
    const fn default_snapshot_on_close() -> bool {
        true
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            snapshot_on_close: Self::default_snapshot_on_close(),
        }
    }
}

impl Config {
    const fn default_radius_meters() -> f64 {
        1000.0
    }

    pub fn with_default_radius(mut self, radius_meters: f64) -> Self {
        assert!(
            radius_meters.is_finite() && radius_meters > 0.0,
            "Default radius must be positive and finite"
        );
        self.default_radius_meters = radius_meters;
        self
    }

    pub fn with_collections(mut self, collections: CollectionNames) -> Self {
        self.collections = collections;
        self
    }

    pub fn with_persistence(mut self, persistence: PersistenceConfig) -> Self {
        self.persistence = persistence;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        let radius = self.default_radius_meters;
        if !radius.is_finite() || radius <= 0.0 {
            return Err(format!(
                "Default radius must be positive and finite, got: {}",
                radius
            ));
        }
        if radius > EARTH_CIRCUMFERENCE_METERS {
            return Err(format!(
                "Default radius {} exceeds Earth's circumference",
                radius
            ));
        }

        let mut seen = Vec::with_capacity(3);
        for name in self.collections.iter() {
            if name.trim().is_empty() {
                return Err("Collection names must not be empty".to_string());
            }
            if name.contains(['/', '\\']) || name == "." || name == ".." {
                return Err(format!("Collection name '{}' is not a valid file stem", name));
            }
            if seen.contains(&name) {
                return Err(format!("Collection name '{}' is used twice", name));
            }
            seen.push(name);
        }

        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: Config = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(Error::custom(e));
        }
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        let config: Config = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_radius_meters: Self::default_radius_meters(),
            collections: CollectionNames::default(),
            persistence: PersistenceConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.default_radius_meters, 1000.0);
        assert_eq!(config.collections.multi_point, "MultiPoints");
        assert_eq!(config.collections.multi_polygon, "MultiplePolygon");
        assert!(config.persistence.snapshot_on_close);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_round_trip() {
        let config = Config::default().with_default_radius(42.0);
        let json = config.to_json().unwrap();
        let parsed = Config::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(Config::from_json(r#"{"default_radius_meters": -5.0}"#).is_err());
        assert!(Config::from_json(r#"{"default_radius_meters": 1e12}"#).is_err());
        assert!(Config::from_json(r#"{"unknown_field": true}"#).is_err());
        assert!(
            Config::from_json(r#"{"collections": {"point": "Same", "multi_point": "Same"}}"#)
                .is_err()
        );
        assert!(Config::from_json(r#"{"collections": {"point": "../escape"}}"#).is_err());
    }

    #[test]
    #[should_panic(expected = "Default radius must be positive")]
    fn test_with_default_radius_panics_on_zero() {
        let _ = Config::default().with_default_radius(0.0);
    }

    #[cfg(feature = "toml")]
    #[test]
    fn test_toml_round_trip() {
        let config = Config::default();
        let toml_str = config.to_toml().unwrap();
        assert_eq!(Config::from_toml(&toml_str).unwrap(), config);
    }
}
