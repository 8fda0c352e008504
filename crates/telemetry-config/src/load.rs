//! Reading and validating `config.yml`.

use std::io::ErrorKind;
use std::path::Path;

use gt7_telemetry_errors::{ConfigError, ErrorContext, ResultExt};
use tracing::{debug, info};

use crate::model::{LoggerConfig, parse_ip};

impl LoggerConfig {
    /// Parse YAML text. `path` is only used in error messages.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for malformed YAML or wrongly typed fields.
    pub fn from_yaml_str(text: &str, path: &Path) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_context(
            ErrorContext::new("deserialize logger config").with("format", "yaml"),
            |message| ConfigError::parse(path, message),
        )
    }

    /// Load and validate the file at `path`. A missing file yields the
    /// defaults.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file exists but cannot be read,
    /// [`ConfigError::Parse`] or [`ConfigError::Invalid`] for bad content.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = match std::fs::read_to_string(path) {
            Ok(text) => {
                debug!(path = %path.display(), "Loaded config file");
                Self::from_yaml_str(&text, path)?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "Config file not found, using defaults");
                Self::default()
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the logger cannot run with.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::invalid("port", "must be non-zero"));
        }
        if self.sampling_frequency_hz == 0 {
            return Err(ConfigError::invalid("sampling_frequency_hz", "must be non-zero"));
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(ConfigError::invalid("heartbeat_interval_ms", "must be non-zero"));
        }
        if self.receive_timeout_ms == 0 {
            return Err(ConfigError::invalid("receive_timeout_ms", "must be non-zero"));
        }
        parse_ip("listen_address", &self.listen_address)?;
        if let Some(address) = self.playstation_address.as_deref()
            && !address.trim().is_empty()
        {
            parse_ip("playstation_address", address)?;
        }
        if self.file_template.trim().is_empty() {
            return Err(ConfigError::invalid("file_template", "must not be empty"));
        }
        if !(-90.0..=90.0).contains(&self.origin.latitude) {
            return Err(ConfigError::invalid("origin.latitude", "must be within [-90, 90]"));
        }
        if !(-180.0..=180.0).contains(&self.origin.longitude) {
            return Err(ConfigError::invalid("origin.longitude", "must be within [-180, 180]"));
        }
        Ok(())
    }

    /// Render as YAML, e.g. to seed a new config file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] if serialization fails.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_context(
            ErrorContext::new("serialize logger config").with("format", "yaml"),
            |message| ConfigError::parse("<memory>", message),
        )
    }
}
