use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use gt7_telemetry_core::{
    ChannelSample, ChannelSchema, LapMarker, LogSink, Sample, SessionEvent, TelemetryMessage,
};
use tokio::sync::mpsc;
use tracing::warn;

/// Commands accepted by the dispatcher.
#[derive(Debug)]
pub(crate) enum Command {
    Deliver(TelemetryMessage),
    Close,
}

/// Ingress side of a [`Distributor`](crate::Distributor).
///
/// Sending never blocks or awaits, so the handle can be driven directly from
/// the receive thread. Messages sent after the distributor has closed are
/// dropped.
#[derive(Debug, Clone)]
pub struct DistributorHandle {
    tx: mpsc::UnboundedSender<Command>,
    closed_warned: Arc<AtomicBool>,
}

impl DistributorHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Command>) -> Self {
        Self {
            tx,
            closed_warned: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Queue a message for every sink. Returns `false` once the distributor
    /// has stopped accepting messages.
    pub fn publish(&self, message: TelemetryMessage) -> bool {
        let kind = message.kind();
        if self.tx.send(Command::Deliver(message)).is_ok() {
            return true;
        }
        if !self.closed_warned.swap(true, Ordering::Relaxed) {
            warn!(kind, "Distributor closed, dropping telemetry");
        }
        false
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl LogSink for DistributorHandle {
    fn new_log(&mut self, schema: &Arc<ChannelSchema>, event: &SessionEvent) {
        self.publish(TelemetryMessage::SessionStarted {
            schema: Arc::clone(schema),
            event: event.clone(),
        });
    }

    fn add_samples(&mut self, sample: ChannelSample) {
        self.publish(Sample::Channels(sample).into());
    }

    fn add_lap(&mut self, marker: LapMarker) {
        self.publish(Sample::Lap(marker).into());
    }

    fn update_event(&mut self, event: &SessionEvent) {
        self.publish(TelemetryMessage::EventUpdated(event.clone()));
    }

    fn save_log(&mut self) {
        self.publish(TelemetryMessage::SessionEnded);
    }
}
