//! Error types for gt7-logger

use gt7_telemetry_errors::{ConfigError, ListenerError, SinkError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Listener failed: {0}")]
    Listener(#[from] ListenerError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("No session database configured (set database_path or pass --database)")]
    NoDatabase,

    #[error("Built-in venue table is invalid: {0}")]
    VenueTable(#[from] serde_yaml::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::NoDatabase => 4,
            CliError::Listener(_) => 5,
            CliError::Sink(_) => 6,
            _ => 1,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CliError::Config(_) => "config",
            CliError::Listener(_) => "listener",
            CliError::Sink(_) => "sink",
            CliError::NoDatabase => "no_database",
            CliError::VenueTable(_) => "venue_table",
            CliError::Task(_) => "task",
            CliError::Io(_) => "io",
            CliError::Json(_) => "json",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_exit_with_validation_code() {
        let err = CliError::from(ConfigError::invalid("port", "must be non-zero"));
        assert_eq!(err.exit_code(), 4);
        assert_eq!(err.kind(), "config");
        assert_eq!(err.to_string(), "Invalid config value for 'port': must be non-zero");
    }

    #[test]
    fn listener_and_sink_errors_have_distinct_codes() {
        assert_eq!(CliError::from(ListenerError::ThreadPanicked).exit_code(), 5);
        assert_eq!(CliError::from(SinkError::database("locked")).exit_code(), 6);
        assert_eq!(CliError::NoDatabase.exit_code(), 4);
    }
}
