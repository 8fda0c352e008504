//! Core telemetry types shared by the decoder, session state machine,
//! distributor and sinks.
//!
//! ## Modules
//! - `channels` - Fixed channel schema (`Channel`, `ChannelSchema`, `UnitSystem`)
//! - `sample` - Emitted values (`ChannelSample`, `LapMarker`, `Sample`)
//! - `event` - Recording metadata (`SessionEvent`)
//! - `message` - The value passed through the distributor (`TelemetryMessage`)
//! - `sink` - Boundary contracts (`LogSink`, `TelemetrySink`)

#![deny(static_mut_refs)]

use std::time::{SystemTime, UNIX_EPOCH};

pub mod channels;
pub mod event;
pub mod message;
pub mod sample;
pub mod sink;

pub use channels::{CHANNEL_COUNT, Channel, ChannelSchema, ChannelSpec, UnitSystem};
pub use event::SessionEvent;
pub use message::TelemetryMessage;
pub use sample::{ChannelSample, ChannelValues, LapMarker, Sample};
pub use sink::{LogSink, TelemetrySink};

/// Default UDP port the console broadcasts on.
pub const DEFAULT_PORT: u16 = 33740;

/// Receive buffer bound for a single datagram.
pub const MAX_DATAGRAM_SIZE: usize = 4096;

/// Nominal sampling frequency of the telemetry stream.
pub const DEFAULT_SAMPLING_FREQUENCY_HZ: u32 = 60;

/// Wall-clock time in seconds since the Unix epoch.
///
/// Used to stamp datagrams on receipt; clocks before the epoch map to 0.
pub fn telemetry_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_now_is_after_2020() {
        assert!(telemetry_now() > 1_577_836_800.0);
    }
}
