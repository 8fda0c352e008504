//! Downstream sink errors.
//!
//! Sink failures (disk full, database error, broadcast send error) are caught
//! and logged at the sink boundary. They never abort ingestion or other sinks.

use crate::common::ErrorSeverity;

/// Errors raised while delivering a sample to a downstream sink.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// File system failure in the raw-log writer
    #[error("Sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Database insert or schema failure
    #[error("Database error: {0}")]
    Database(String),

    /// A sample could not be serialized for broadcast
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A background task serving the sink failed or panicked
    #[error("Sink task failed: {0}")]
    Task(String),

    /// The sink's delivery path has been closed
    #[error("Sink '{0}' is closed")]
    Closed(String),
}

impl SinkError {
    /// Get the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            SinkError::Io(_) => ErrorSeverity::Error,
            SinkError::Database(_) => ErrorSeverity::Error,
            SinkError::Serialization(_) => ErrorSeverity::Warning,
            SinkError::Task(_) => ErrorSeverity::Error,
            SinkError::Closed(_) => ErrorSeverity::Info,
        }
    }

    /// Create a database error with a message.
    pub fn database(msg: impl Into<String>) -> Self {
        SinkError::Database(msg.into())
    }

    /// Create a serialization error with a message.
    pub fn serialization(msg: impl Into<String>) -> Self {
        SinkError::Serialization(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_error_display() {
        assert_eq!(
            SinkError::Closed("csv".to_string()).to_string(),
            "Sink 'csv' is closed"
        );
        assert!(SinkError::database("locked").to_string().contains("locked"));
    }

    #[test]
    fn test_sink_error_from_io() {
        let err: SinkError = std::io::Error::other("disk full").into();
        assert!(matches!(err, SinkError::Io(_)));
        assert_eq!(err.severity(), ErrorSeverity::Error);
    }
}
