//! Concrete consumers of the telemetry stream.
//!
//! - [`raw_log`]: one MoTeC CSV file per recording
//! - [`database`]: SQLite session history
//! - [`live`]: JSON samples on a broadcast channel

#![deny(static_mut_refs)]

pub mod database;
pub mod live;
pub mod raw_log;

pub use database::{DatabaseSink, SessionDatabase, SessionRecord, StoredSession};
pub use live::{DEFAULT_LIVE_CAPACITY, LiveBroadcaster};
pub use raw_log::{
    DEFAULT_FILE_TEMPLATE, MotecCsvWriter, RawLogConfig, RecordedLog, render_file_name,
    render_header,
};
