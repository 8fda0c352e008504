//! Boundary contracts between the state machine and downstream consumers.

use std::sync::Arc;

use async_trait::async_trait;
use gt7_telemetry_errors::SinkError;

use crate::channels::ChannelSchema;
use crate::event::SessionEvent;
use crate::message::TelemetryMessage;
use crate::sample::{ChannelSample, LapMarker};

/// Raw-log lifecycle driven synchronously from the receive thread.
///
/// Per recording the calls arrive as `new_log`, then any mix of
/// `add_samples`/`add_lap`/`update_event`, then `save_log`. Implementations
/// must not block, and every call must be a no-op when no log is active.
pub trait LogSink {
    fn new_log(&mut self, schema: &Arc<ChannelSchema>, event: &SessionEvent);

    fn add_samples(&mut self, sample: ChannelSample);

    fn add_lap(&mut self, marker: LapMarker);

    fn update_event(&mut self, event: &SessionEvent);

    fn save_log(&mut self);
}

impl<T: LogSink + ?Sized> LogSink for Box<T> {
    fn new_log(&mut self, schema: &Arc<ChannelSchema>, event: &SessionEvent) {
        (**self).new_log(schema, event);
    }

    fn add_samples(&mut self, sample: ChannelSample) {
        (**self).add_samples(sample);
    }

    fn add_lap(&mut self, marker: LapMarker) {
        (**self).add_lap(marker);
    }

    fn update_event(&mut self, event: &SessionEvent) {
        (**self).update_event(event);
    }

    fn save_log(&mut self) {
        (**self).save_log();
    }
}

/// A downstream consumer fed by the distributor.
///
/// Each sink runs on its own task and sees every message in order. Errors
/// are logged by the caller and never stop delivery.
#[async_trait]
pub trait TelemetrySink: Send + 'static {
    /// Name used in logs and queue metrics.
    fn name(&self) -> &str;

    /// Handle one message.
    ///
    /// # Errors
    ///
    /// Returns a [`SinkError`] when the sink's own I/O fails.
    async fn deliver(&mut self, message: &TelemetryMessage) -> Result<(), SinkError>;

    /// Called once after the final message when the stream is drained.
    ///
    /// # Errors
    ///
    /// Returns a [`SinkError`] when flushing fails.
    async fn close(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::Sample;

    #[derive(Default)]
    struct Counting {
        seen: Vec<&'static str>,
    }

    #[async_trait]
    impl TelemetrySink for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        async fn deliver(&mut self, message: &TelemetryMessage) -> Result<(), SinkError> {
            self.seen.push(message.kind());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_default_close_is_ok() -> Result<(), Box<dyn std::error::Error>> {
        let mut sink = Counting::default();
        sink.deliver(&TelemetryMessage::Sample(Sample::Lap(LapMarker {
            timestamp: 1.0,
            lap: 0,
            lap_time: 90.0,
        })))
        .await?;
        sink.deliver(&TelemetryMessage::SessionEnded).await?;
        sink.close().await?;
        assert_eq!(sink.seen, vec!["lap", "session_ended"]);
        Ok(())
    }

    #[derive(Default)]
    struct Calls(Vec<&'static str>);

    impl LogSink for Calls {
        fn new_log(&mut self, _: &Arc<ChannelSchema>, _: &SessionEvent) {
            self.0.push("new_log");
        }
        fn add_samples(&mut self, _: ChannelSample) {
            self.0.push("add_samples");
        }
        fn add_lap(&mut self, _: LapMarker) {
            self.0.push("add_lap");
        }
        fn update_event(&mut self, _: &SessionEvent) {
            self.0.push("update_event");
        }
        fn save_log(&mut self) {
            self.0.push("save_log");
        }
    }

    #[test]
    fn test_boxed_log_sink_forwards() {
        let mut boxed: Box<Calls> = Box::default();
        boxed.new_log(&Arc::new(ChannelSchema::default()), &SessionEvent::default());
        boxed.save_log();
        assert_eq!(boxed.0, vec!["new_log", "save_log"]);
    }
}
