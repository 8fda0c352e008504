//! Reference geometry used to infer the venue from lap-boundary positions.

use std::path::Path;

use gt7_telemetry_errors::{ConfigError, ErrorContext, ResultExt};
use serde::{Deserialize, Serialize};

pub const DEFAULT_VENUES_YAML: &str = include_str!("venues.yaml");

/// Axis-aligned box around a layout, world metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_z: f64,
    pub max_z: f64,
}

impl Bounds {
    pub fn contains(&self, x: f64, z: f64) -> bool {
        (self.min_x..=self.max_x).contains(&x) && (self.min_z..=self.max_z).contains(&z)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Venue {
    pub name: String,
    /// `(x, z)` on the last tick before the line
    pub start: [f64; 2],
    /// `(x, z)` on the first tick after the line
    pub end: [f64; 2],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VenueTable {
    #[serde(default)]
    pub venues: Vec<Venue>,
}

impl VenueTable {
    /// Parse a table from YAML text.
    ///
    /// # Errors
    ///
    /// Returns the YAML error when the text does not describe a venue table.
    pub fn from_yaml_str(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    /// Load a table from a YAML file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] when the file cannot be read, [`ConfigError::Parse`]
    /// when it is not a venue table.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text).map_context(
            ErrorContext::new("deserialize venue table").with("format", "yaml"),
            |message| ConfigError::parse(path, message),
        )
    }

    pub fn len(&self) -> usize {
        self.venues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.venues.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Venue> {
        self.venues.iter()
    }
}

/// The table compiled into the binary.
///
/// # Errors
///
/// Only fails if the embedded YAML is malformed.
pub fn load_default_venues() -> Result<VenueTable, serde_yaml::Error> {
    VenueTable::from_yaml_str(DEFAULT_VENUES_YAML)
}
