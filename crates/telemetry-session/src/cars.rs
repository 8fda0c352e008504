//! Car id to display name lookup.

use std::collections::HashMap;
use std::path::Path;

use gt7_telemetry_errors::{ConfigError, ErrorContext, ResultExt};

/// Read-only car-name table, loaded from a YAML map of `id: name`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CarTable {
    names: HashMap<i32, String>,
}

impl CarTable {
    pub fn new(names: HashMap<i32, String>) -> Self {
        Self { names }
    }

    /// # Errors
    ///
    /// Returns the YAML error when the text is not an `id: name` map.
    pub fn from_yaml_str(text: &str) -> Result<Self, serde_yaml::Error> {
        Ok(Self::new(serde_yaml::from_str(text)?))
    }

    /// # Errors
    ///
    /// [`ConfigError::Io`] or [`ConfigError::Parse`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text).map_context(
            ErrorContext::new("deserialize car table").with("format", "yaml"),
            |message| ConfigError::parse(path, message),
        )
    }

    pub fn get(&self, car_code: i32) -> Option<&str> {
        self.names.get(&car_code).map(String::as_str)
    }

    /// Display name for `car_code`; unknown ids render as the number.
    pub fn lookup(&self, car_code: i32) -> String {
        self.get(car_code)
            .map_or_else(|| car_code.to_string(), str::to_string)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_and_unknown() -> Result<(), Box<dyn std::error::Error>> {
        let table = CarTable::from_yaml_str("3383: Mazda RX-Vision GT3 Concept\n1246: Honda NSX '17\n")?;
        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup(3383), "Mazda RX-Vision GT3 Concept");
        assert_eq!(table.lookup(42), "42");
        assert!(CarTable::default().is_empty());
        Ok(())
    }
}
