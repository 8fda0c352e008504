//! Configuration for the GT7 telemetry logger.
//!
//! A single YAML file (`config.yml` by default) where every field is
//! optional. [`LoggerConfig`] converts itself into the listener and session
//! configurations the runtime needs.

#![deny(static_mut_refs)]

pub mod load;
pub mod model;

pub use model::{
    DEFAULT_FILE_TEMPLATE, DEFAULT_HEARTBEAT_INTERVAL_MS, DEFAULT_LISTEN_ADDRESS, DEFAULT_LOG_DIR,
    DEFAULT_RECEIVE_TIMEOUT_MS, LoggerConfig,
};

/// Default config file name, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.yml";
