use std::sync::Arc;

use crate::channels::ChannelSchema;
use crate::event::SessionEvent;
use crate::sample::Sample;

/// Message carried from the state machine to every sink.
///
/// All lifecycle calls travel on the same ordered stream as the samples, so
/// each sink observes `SessionStarted`, then samples and laps, then
/// `SessionEnded` for every recording.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryMessage {
    SessionStarted {
        schema: Arc<ChannelSchema>,
        event: SessionEvent,
    },
    Sample(Sample),
    EventUpdated(SessionEvent),
    SessionEnded,
}

impl TelemetryMessage {
    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            TelemetryMessage::SessionStarted { .. } => "session_started",
            TelemetryMessage::Sample(Sample::Channels(_)) => "channels",
            TelemetryMessage::Sample(Sample::Lap(_)) => "lap",
            TelemetryMessage::EventUpdated(_) => "event_updated",
            TelemetryMessage::SessionEnded => "session_ended",
        }
    }
}

impl From<Sample> for TelemetryMessage {
    fn from(sample: Sample) -> Self {
        TelemetryMessage::Sample(sample)
    }
}
