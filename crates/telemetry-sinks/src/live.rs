use std::sync::Arc;

use async_trait::async_trait;
use gt7_telemetry_core::{ChannelSchema, Sample, TelemetryMessage, TelemetrySink};
use gt7_telemetry_errors::SinkError;
use tokio::sync::broadcast;
use tracing::trace;

pub const DEFAULT_LIVE_CAPACITY: usize = 256;

/// Publishes every channel sample as a JSON object on an in-process
/// broadcast channel. Subscribers that fall behind lose the oldest samples.
#[derive(Debug)]
pub struct LiveBroadcaster {
    tx: broadcast::Sender<String>,
    schema: Arc<ChannelSchema>,
}

impl LiveBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            schema: Arc::new(ChannelSchema::default()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    /// Sender side, for transports that need to subscribe later.
    pub fn sender(&self) -> broadcast::Sender<String> {
        self.tx.clone()
    }
}

impl Default for LiveBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_LIVE_CAPACITY)
    }
}

#[async_trait]
impl TelemetrySink for LiveBroadcaster {
    fn name(&self) -> &str {
        "live"
    }

    async fn deliver(&mut self, message: &TelemetryMessage) -> Result<(), SinkError> {
        match message {
            TelemetryMessage::SessionStarted { schema, .. } => {
                self.schema = Arc::clone(schema);
            }
            TelemetryMessage::Sample(Sample::Channels(sample)) => {
                let payload = serde_json::to_string(&sample.to_json(&self.schema))
                    .map_err(|e| SinkError::serialization(e.to_string()))?;
                if self.tx.send(payload).is_err() {
                    trace!("No live subscribers");
                }
            }
            _ => {}
        }
        Ok(())
    }
}
