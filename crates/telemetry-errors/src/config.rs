//! Configuration loading and validation errors.

use std::path::PathBuf;

use crate::common::ErrorSeverity;

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file exists but could not be read
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// Path of the file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML for the expected model
    #[error("Failed to parse config file {path}: {message}")]
    Parse {
        /// Path of the file
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// A configuration value is outside its valid domain
    #[error("Invalid config value for '{field}': {reason}")]
    Invalid {
        /// Field name
        field: String,
        /// Why the value was rejected
        reason: String,
    },
}

impl ConfigError {
    /// Get the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Error
    }

    /// Create a parse error for the file at `path`.
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ConfigError::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an invalid-value error.
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_display() {
        let err = ConfigError::invalid("port", "must be non-zero");
        assert_eq!(
            err.to_string(),
            "Invalid config value for 'port': must be non-zero"
        );
    }
}
