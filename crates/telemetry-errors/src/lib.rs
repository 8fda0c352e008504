//! Centralized error types for the GT7 telemetry logger.
//!
//! Errors are split by the concern that produces them:
//!
//! - [`decode`]: per-datagram decode failures. Non-fatal; the packet is dropped.
//! - [`listener`]: socket and thread failures. Fatal to the listener thread.
//! - [`sink`]: failures at a downstream sink boundary. Logged, never propagated
//!   into ingestion.
//! - [`config`]: configuration loading and validation.
//! - [`common`]: the top-level [`TelemetryError`], classification helpers and
//!   [`ErrorContext`] for annotating failures with the operation in progress.
//!
//! # Hot path
//!
//! [`DecodeError`] is `Copy` and carries only numeric payload, so producing one
//! once per datagram never allocates.
//!
//! # Example
//!
//! ```
//! use gt7_telemetry_errors::prelude::*;
//!
//! fn check_len(buf: &[u8]) -> Result<()> {
//!     if buf.len() < 296 {
//!         return Err(DecodeError::truncated(296, buf.len()).into());
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_len(&[0u8; 10]).is_err());
//! ```

#![deny(clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod common;
pub mod config;
pub mod decode;
pub mod listener;
pub mod prelude;
pub mod sink;

pub use common::{ErrorCategory, ErrorContext, ErrorSeverity, ResultExt, TelemetryError};
pub use config::ConfigError;
pub use decode::DecodeError;
pub use listener::ListenerError;
pub use sink::SinkError;

/// A specialized `Result` type for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// A specialized `Result` type for the per-datagram decode path.
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;
