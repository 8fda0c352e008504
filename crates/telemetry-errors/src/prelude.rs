//! Prelude module for convenient error handling imports.
//!
//! # Example
//!
//! ```
//! use gt7_telemetry_errors::prelude::*;
//!
//! fn port(value: u16) -> Result<u16> {
//!     if value == 0 {
//!         return Err(ConfigError::invalid("port", "must be non-zero").into());
//!     }
//!     Ok(value)
//! }
//!
//! assert!(port(0).is_err());
//! ```

pub use crate::{
    DecodeResult, Result,
    common::{ErrorCategory, ErrorContext, ErrorSeverity, ResultExt, TelemetryError},
    config::ConfigError,
    decode::DecodeError,
    listener::ListenerError,
    sink::SinkError,
};
