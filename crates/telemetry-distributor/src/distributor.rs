//! One dispatch step feeding one unbounded queue per sink.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use gt7_telemetry_core::{TelemetryMessage, TelemetrySink};
use gt7_telemetry_errors::{ErrorContext, ResultExt, SinkError};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::handle::{Command, DistributorHandle};

/// Queue depth at which a sink is reported as falling behind (about one
/// minute of samples at 60 Hz).
pub const DEFAULT_HIGH_WATER_MARK: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistributorConfig {
    pub high_water_mark: usize,
}

impl Default for DistributorConfig {
    fn default() -> Self {
        Self {
            high_water_mark: DEFAULT_HIGH_WATER_MARK,
        }
    }
}

/// Queue depth of one sink at the time of the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueDepth {
    pub sink: String,
    pub depth: usize,
}

/// Per-sink delivery counters returned when the distributor stops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkReport {
    pub sink: String,
    pub delivered: u64,
    pub failed: u64,
    /// Stopped by `shutdown` before the queue was drained
    pub cancelled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistributorReport {
    pub dispatched: u64,
    pub sinks: Vec<SinkReport>,
}

struct SinkQueue {
    name: String,
    tx: mpsc::UnboundedSender<TelemetryMessage>,
    depth: Arc<AtomicUsize>,
}

struct Worker {
    name: String,
    depth: Arc<AtomicUsize>,
    task: JoinHandle<SinkReport>,
}

/// Replicates every message to every registered sink.
///
/// Each sink runs on its own task behind its own queue, so a slow sink only
/// grows its own backlog.
pub struct Distributor {
    control: mpsc::UnboundedSender<Command>,
    dispatcher: JoinHandle<u64>,
    workers: Vec<Worker>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Distributor {
    /// Spawn the dispatcher and one task per sink on the current runtime.
    pub fn spawn(
        sinks: Vec<Box<dyn TelemetrySink>>,
        config: DistributorConfig,
    ) -> (Self, DistributorHandle) {
        let (shutdown_tx, _) = broadcast::channel(1);
        let (control, ingress) = mpsc::unbounded_channel();

        let mut queues = Vec::with_capacity(sinks.len());
        let mut workers = Vec::with_capacity(sinks.len());
        for sink in sinks {
            let name = sink.name().to_string();
            let (tx, rx) = mpsc::unbounded_channel();
            let depth = Arc::new(AtomicUsize::new(0));
            let task = tokio::spawn(run_sink(
                sink,
                rx,
                Arc::clone(&depth),
                shutdown_tx.subscribe(),
            ));
            queues.push(SinkQueue {
                name: name.clone(),
                tx,
                depth: Arc::clone(&depth),
            });
            workers.push(Worker { name, depth, task });
        }

        info!(sinks = workers.len(), "Distributor started");
        let dispatcher = tokio::spawn(dispatch(
            ingress,
            queues,
            config.high_water_mark,
            shutdown_tx.subscribe(),
        ));

        let handle = DistributorHandle::new(control.clone());
        (
            Self {
                control,
                dispatcher,
                workers,
                shutdown_tx,
            },
            handle,
        )
    }

    /// New ingress handle.
    pub fn handle(&self) -> DistributorHandle {
        DistributorHandle::new(self.control.clone())
    }

    pub fn sink_names(&self) -> Vec<&str> {
        self.workers.iter().map(|w| w.name.as_str()).collect()
    }

    pub fn queue_depths(&self) -> Vec<QueueDepth> {
        self.workers
            .iter()
            .map(|w| QueueDepth {
                sink: w.name.clone(),
                depth: w.depth.load(Ordering::Relaxed),
            })
            .collect()
    }

    /// Stop accepting messages, deliver everything already queued, then
    /// close each sink.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Task`] if a task panicked.
    pub async fn close(self) -> Result<DistributorReport, SinkError> {
        info!("Draining distributor");
        if self.control.send(Command::Close).is_err() {
            debug!("Dispatcher already stopped");
        }
        self.join().await
    }

    /// Cancel every task at its next suspension point without draining.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Task`] if a task panicked.
    pub async fn shutdown(self) -> Result<DistributorReport, SinkError> {
        info!("Cancelling distributor");
        if let Err(e) = self.shutdown_tx.send(()) {
            debug!(error = %e, "No distributor task was listening for shutdown");
        }
        self.join().await
    }

    async fn join(self) -> Result<DistributorReport, SinkError> {
        let dispatched = self
            .dispatcher
            .await
            .map_context(ErrorContext::new("join dispatcher"), SinkError::Task)?;

        let mut sinks = Vec::with_capacity(self.workers.len());
        for worker in self.workers {
            let report = worker
                .task
                .await
                .map_context(
                    ErrorContext::new("join sink worker").with("sink", worker.name.as_str()),
                    SinkError::Task,
                )?;
            sinks.push(report);
        }
        info!(dispatched, "Distributor stopped");
        Ok(DistributorReport { dispatched, sinks })
    }
}

async fn dispatch(
    mut ingress: mpsc::UnboundedReceiver<Command>,
    queues: Vec<SinkQueue>,
    high_water_mark: usize,
    mut shutdown: broadcast::Receiver<()>,
) -> u64 {
    let mut dispatched = 0u64;
    loop {
        let command = tokio::select! {
            biased;
            _ = shutdown.recv() => break,
            command = ingress.recv() => command,
        };
        let Some(Command::Deliver(message)) = command else {
            break;
        };

        for queue in &queues {
            let depth = queue.depth.fetch_add(1, Ordering::Relaxed) + 1;
            if depth == high_water_mark {
                warn!(sink = %queue.name, depth, "Sink queue above high-water mark");
            }
            if queue.tx.send(message.clone()).is_err() {
                queue.depth.fetch_sub(1, Ordering::Relaxed);
                debug!(sink = %queue.name, "Sink task gone, message dropped");
            }
        }
        dispatched += 1;
    }
    ingress.close();
    debug!(dispatched, "Dispatcher exiting");
    dispatched
}

async fn run_sink(
    mut sink: Box<dyn TelemetrySink>,
    mut rx: mpsc::UnboundedReceiver<TelemetryMessage>,
    depth: Arc<AtomicUsize>,
    mut shutdown: broadcast::Receiver<()>,
) -> SinkReport {
    let mut report = SinkReport {
        sink: sink.name().to_string(),
        ..SinkReport::default()
    };

    loop {
        let message = tokio::select! {
            biased;
            _ = shutdown.recv() => {
                info!(sink = %report.sink, "Sink cancelled");
                report.cancelled = true;
                return report;
            }
            message = rx.recv() => message,
        };
        let Some(message) = message else {
            break;
        };
        depth.fetch_sub(1, Ordering::Relaxed);

        let outcome = tokio::select! {
            biased;
            _ = shutdown.recv() => {
                info!(sink = %report.sink, kind = message.kind(), "Sink cancelled mid-delivery");
                report.cancelled = true;
                return report;
            }
            outcome = sink.deliver(&message) => outcome,
        };
        match outcome {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                report.failed += 1;
                error!(
                    sink = %report.sink,
                    kind = message.kind(),
                    severity = %e.severity(),
                    error = %e,
                    "Sink delivery failed"
                );
            }
        }
    }

    if let Err(e) = sink.close().await {
        error!(sink = %report.sink, error = %e, "Sink close failed");
    }
    debug!(sink = %report.sink, delivered = report.delivered, "Sink drained");
    report
}
