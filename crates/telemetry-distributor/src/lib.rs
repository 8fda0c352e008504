//! Fan-out of the state machine's output to every sink.
//!
//! The state machine writes into a [`DistributorHandle`] (a
//! [`LogSink`](gt7_telemetry_core::LogSink)) from the receive thread. A
//! single dispatcher task clones each message into one unbounded queue per
//! [`TelemetrySink`](gt7_telemetry_core::TelemetrySink), and each sink drains
//! its own queue on its own task. Every sink sees every message, in order.

#![deny(static_mut_refs)]

pub mod distributor;
pub mod handle;

pub use distributor::{
    DEFAULT_HIGH_WATER_MARK, Distributor, DistributorConfig, DistributorReport, QueueDepth,
    SinkReport,
};
pub use handle::DistributorHandle;
