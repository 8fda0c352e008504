//! Common error types and utilities used across all telemetry crates.
//!
//! This module provides the top-level error enum that can wrap all sub-errors,
//! along with error classification and severity levels.

use core::fmt;

use crate::{ConfigError, DecodeError, ListenerError, SinkError};

/// Top-level error type that can wrap all telemetry sub-errors.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Datagram decode errors
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Socket and listener thread errors
    #[error("Listener error: {0}")]
    Listener(#[from] ListenerError),

    /// Downstream sink errors
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl TelemetryError {
    /// Get the error category for classification.
    pub fn category(&self) -> ErrorCategory {
        match self {
            TelemetryError::Decode(_) => ErrorCategory::Decode,
            TelemetryError::Listener(_) => ErrorCategory::Network,
            TelemetryError::Sink(_) => ErrorCategory::Sink,
            TelemetryError::Config(_) => ErrorCategory::Config,
            TelemetryError::Io(_) => ErrorCategory::IO,
            TelemetryError::Other(_) => ErrorCategory::Other,
        }
    }

    /// Get the error severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TelemetryError::Decode(e) => e.severity(),
            TelemetryError::Listener(e) => e.severity(),
            TelemetryError::Sink(e) => e.severity(),
            TelemetryError::Config(e) => e.severity(),
            TelemetryError::Io(_) => ErrorSeverity::Error,
            TelemetryError::Other(_) => ErrorSeverity::Error,
        }
    }

    /// Check if this error is recoverable.
    pub fn is_recoverable(&self) -> bool {
        self.severity() < ErrorSeverity::Critical
    }

    /// Create a generic error with a message.
    pub fn other(msg: impl Into<String>) -> Self {
        TelemetryError::Other(msg.into())
    }
}

impl From<std::io::Error> for TelemetryError {
    fn from(e: std::io::Error) -> Self {
        TelemetryError::Io(e)
    }
}

/// Error category for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCategory {
    /// Packet decode errors
    Decode = 0,
    /// Socket errors
    Network = 1,
    /// Downstream sink errors
    Sink = 2,
    /// Configuration errors
    Config = 3,
    /// I/O errors
    IO = 4,
    /// Other errors
    Other = 255,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Decode => write!(f, "Decode"),
            ErrorCategory::Network => write!(f, "Network"),
            ErrorCategory::Sink => write!(f, "Sink"),
            ErrorCategory::Config => write!(f, "Config"),
            ErrorCategory::IO => write!(f, "IO"),
            ErrorCategory::Other => write!(f, "Other"),
        }
    }
}

/// Error severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ErrorSeverity {
    /// Informational, no action required
    Info = 0,
    /// Warning, may require attention
    Warning = 1,
    /// Error, operation failed
    Error = 2,
    /// Critical, the owning component cannot continue
    Critical = 3,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Structured context attached to an error message.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation that was being performed
    pub operation: String,
    /// Additional context key-value pairs
    pub context: Vec<(String, String)>,
}

impl ErrorContext {
    /// Create a new error context for an operation.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            context: Vec::new(),
        }
    }

    /// Add a context key-value pair.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.push((key.into(), value.into()));
        self
    }

    /// Render `err` prefixed with this context.
    pub fn describe(&self, err: impl fmt::Display) -> String {
        format!("{self}: {err}")
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "operation: {}", self.operation)?;
        for (key, value) in &self.context {
            write!(f, ", {key}: {value}")?;
        }
        Ok(())
    }
}

/// Extension trait for adding context to results.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, ctx: ErrorContext) -> Result<T, TelemetryError>;

    /// Add context with an operation name.
    fn with_context(self, operation: impl Into<String>) -> Result<T, TelemetryError>;

    /// Add context, then build a domain error from the rendered message.
    fn map_context<E2>(self, ctx: ErrorContext, wrap: impl FnOnce(String) -> E2) -> Result<T, E2>;
}

impl<T, E: fmt::Display> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, ctx: ErrorContext) -> Result<T, TelemetryError> {
        self.map_context(ctx, TelemetryError::Other)
    }

    fn with_context(self, operation: impl Into<String>) -> Result<T, TelemetryError> {
        self.context(ErrorContext::new(operation))
    }

    fn map_context<E2>(self, ctx: ErrorContext, wrap: impl FnOnce(String) -> E2) -> Result<T, E2> {
        self.map_err(|e| wrap(ctx.describe(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::Decode.to_string(), "Decode");
        assert_eq!(ErrorCategory::Network.to_string(), "Network");
        assert_eq!(ErrorCategory::Sink.to_string(), "Sink");
    }

    #[test]
    fn test_error_severity_ordering() {
        assert!(ErrorSeverity::Critical > ErrorSeverity::Error);
        assert!(ErrorSeverity::Error > ErrorSeverity::Warning);
        assert!(ErrorSeverity::Warning > ErrorSeverity::Info);
    }

    #[test]
    fn test_error_context() {
        let ctx = ErrorContext::new("load_config")
            .with("path", "config.yml")
            .with("format", "yaml");
        assert_eq!(
            ctx.to_string(),
            "operation: load_config, path: config.yml, format: yaml"
        );
    }

    #[test]
    fn test_telemetry_error_category() {
        let err: TelemetryError = DecodeError::truncated(296, 4).into();
        assert_eq!(err.category(), ErrorCategory::Decode);
        assert!(err.is_recoverable());

        let err: TelemetryError = ListenerError::ThreadPanicked.into();
        assert_eq!(err.category(), ErrorCategory::Network);
        assert!(!err.is_recoverable());
    }
}
