//! Fan-out behaviour: replication, isolation of slow sinks, drain and cancel.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gt7_telemetry_core::{
    CHANNEL_COUNT, ChannelSample, ChannelSchema, LapMarker, LogSink, SessionEvent,
    TelemetryMessage, TelemetrySink, UnitSystem,
};
use gt7_telemetry_distributor::{Distributor, DistributorConfig, DistributorHandle};
use gt7_telemetry_errors::SinkError;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

type TestResult = Result<(), Box<dyn std::error::Error>>;
type Seen = Arc<Mutex<Vec<TelemetryMessage>>>;

struct CollectingSink {
    name: String,
    seen: Seen,
    closed: Arc<Mutex<bool>>,
    gate: Option<Arc<Semaphore>>,
    fail_samples: bool,
}

impl CollectingSink {
    fn new(name: &str) -> (Self, Seen) {
        let seen = Seen::default();
        let sink = Self {
            name: name.to_string(),
            seen: Arc::clone(&seen),
            closed: Arc::default(),
            gate: None,
            fail_samples: false,
        };
        (sink, seen)
    }
}

#[async_trait]
impl TelemetrySink for CollectingSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&mut self, message: &TelemetryMessage) -> Result<(), SinkError> {
        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| SinkError::Closed(e.to_string()))?;
            permit.forget();
        }
        self.seen.lock().push(message.clone());
        if self.fail_samples && matches!(message, TelemetryMessage::Sample(_)) {
            return Err(SinkError::database("insert failed"));
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        *self.closed.lock() = true;
        Ok(())
    }
}

fn drive_session(handle: &mut DistributorHandle, samples: usize) {
    let schema = Arc::new(ChannelSchema::new(UnitSystem::Metric));
    handle.new_log(&schema, &SessionEvent::default());
    for i in 0..samples {
        let mut values = [0.0; CHANNEL_COUNT];
        values[2] = i as f64;
        handle.add_samples(ChannelSample::new(i as f64, values));
    }
    handle.add_lap(LapMarker {
        timestamp: samples as f64,
        lap: 1,
        lap_time: 92.5,
    });
    handle.save_log();
}

async fn wait_for(seen: &Seen, count: usize) -> TestResult {
    tokio::time::timeout(Duration::from_secs(5), async {
        while seen.lock().len() < count {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await?;
    Ok(())
}

#[tokio::test]
async fn every_sink_sees_every_message_in_order() -> TestResult {
    let (csv, csv_seen) = CollectingSink::new("csv");
    let (db, db_seen) = CollectingSink::new("database");
    let (live, live_seen) = CollectingSink::new("live");
    let csv_closed = Arc::clone(&csv.closed);

    let (distributor, mut handle) = Distributor::spawn(
        vec![Box::new(csv), Box::new(db), Box::new(live)],
        DistributorConfig::default(),
    );
    assert_eq!(distributor.sink_names(), vec!["csv", "database", "live"]);

    drive_session(&mut handle, 100);
    let report = distributor.close().await?;

    assert_eq!(report.dispatched, 103);
    for seen in [&csv_seen, &db_seen, &live_seen] {
        let seen = seen.lock();
        assert_eq!(seen.len(), 103);
        assert_eq!(seen[0].kind(), "session_started");
        assert_eq!(seen[101].kind(), "lap");
        assert_eq!(seen[102].kind(), "session_ended");
        for (i, message) in seen[1..101].iter().enumerate() {
            let TelemetryMessage::Sample(sample) = message else {
                return Err(format!("unexpected {}", message.kind()).into());
            };
            assert_eq!(sample.timestamp(), i as f64);
        }
    }
    assert!(*csv_closed.lock());
    assert!(report.sinks.iter().all(|s| s.delivered == 103 && !s.cancelled));
    Ok(())
}

#[tokio::test]
async fn slow_sink_does_not_hold_back_others() -> TestResult {
    let gate = Arc::new(Semaphore::new(0));
    let (mut slow, slow_seen) = CollectingSink::new("slow");
    slow.gate = Some(Arc::clone(&gate));
    let (fast, fast_seen) = CollectingSink::new("fast");

    let (distributor, mut handle) =
        Distributor::spawn(vec![Box::new(slow), Box::new(fast)], DistributorConfig::default());

    drive_session(&mut handle, 10);
    wait_for(&fast_seen, 13).await?;
    assert!(slow_seen.lock().is_empty());

    let depths = distributor.queue_depths();
    assert_eq!(depths[0].sink, "slow");
    assert!(depths[0].depth >= 12);
    assert_eq!(depths[1].depth, 0);

    gate.add_permits(64);
    let report = distributor.close().await?;
    assert_eq!(slow_seen.lock().len(), 13);
    assert_eq!(report.sinks[0].delivered, 13);
    Ok(())
}

#[tokio::test]
async fn failing_sink_keeps_receiving() -> TestResult {
    let (mut flaky, flaky_seen) = CollectingSink::new("flaky");
    flaky.fail_samples = true;
    let (steady, steady_seen) = CollectingSink::new("steady");

    let (distributor, mut handle) =
        Distributor::spawn(vec![Box::new(flaky), Box::new(steady)], DistributorConfig::default());
    drive_session(&mut handle, 5);
    let report = distributor.close().await?;

    assert_eq!(flaky_seen.lock().len(), 8);
    assert_eq!(steady_seen.lock().len(), 8);
    assert_eq!(report.sinks[0].failed, 6);
    assert_eq!(report.sinks[0].delivered, 2);
    assert_eq!(report.sinks[1].failed, 0);
    Ok(())
}

#[tokio::test]
async fn shutdown_cancels_without_draining() -> TestResult {
    let gate = Arc::new(Semaphore::new(0));
    let (mut stuck, stuck_seen) = CollectingSink::new("stuck");
    stuck.gate = Some(gate);
    let stuck_closed = Arc::clone(&stuck.closed);

    let (distributor, mut handle) =
        Distributor::spawn(vec![Box::new(stuck)], DistributorConfig::default());
    drive_session(&mut handle, 50);

    let report = tokio::time::timeout(Duration::from_secs(5), distributor.shutdown()).await??;
    assert!(report.sinks[0].cancelled);
    assert!(stuck_seen.lock().is_empty());
    assert!(!*stuck_closed.lock());
    Ok(())
}

#[tokio::test]
async fn publishing_after_close_is_dropped() -> TestResult {
    let (sink, seen) = CollectingSink::new("only");
    let (distributor, mut handle) =
        Distributor::spawn(vec![Box::new(sink)], DistributorConfig::default());
    let spare = distributor.handle();

    drive_session(&mut handle, 1);
    distributor.close().await?;

    assert!(handle.is_closed());
    assert!(!spare.publish(TelemetryMessage::SessionEnded));
    handle.save_log();
    assert_eq!(seen.lock().len(), 4);
    Ok(())
}

#[tokio::test]
async fn distributor_without_sinks_still_counts() -> TestResult {
    let (distributor, mut handle) = Distributor::spawn(Vec::new(), DistributorConfig::default());
    drive_session(&mut handle, 3);
    let report = distributor.close().await?;
    assert_eq!(report.dispatched, 6);
    assert!(report.sinks.is_empty());
    Ok(())
}
