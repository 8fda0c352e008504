//! `gt7-logger run`: record telemetry until Ctrl-C or a fatal listener error.
//!
//! Wiring: config → sinks → distributor → state machine → listener. On the
//! way out the listener is stopped first, the active log is saved through the
//! state machine, and only then is the distributor drained.

use std::sync::Arc;
use std::time::Duration;

use gt7_telemetry_config::LoggerConfig;
use gt7_telemetry_core::TelemetrySink;
use gt7_telemetry_distributor::{Distributor, DistributorConfig, DistributorReport};
use gt7_telemetry_protocol::UdpListener;
use gt7_telemetry_session::{
    CarTable, Equirectangular, LiveSnapshot, SessionStateMachine, VenueTable,
    load_default_venues,
};
use gt7_telemetry_sinks::{
    DatabaseSink, LiveBroadcaster, MotecCsvWriter, RawLogConfig, SessionDatabase,
};
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::CliError;

/// How often the listener thread is checked for a fatal exit.
const LISTENER_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// How often the latest snapshot is logged while packets arrive.
const STATUS_INTERVAL: Duration = Duration::from_secs(10);

pub async fn execute(config: LoggerConfig) -> Result<(), CliError> {
    let venues = match &config.venue_table_path {
        Some(path) => VenueTable::load(path)?,
        None => load_default_venues()?,
    };
    let cars = match &config.car_table_path {
        Some(path) => CarTable::load(path)?,
        None => CarTable::default(),
    };
    info!(venues = venues.len(), cars = cars.len(), "Lookup tables loaded");

    let (sinks, live) = build_sinks(&config)?;
    let (distributor, handle) = Distributor::spawn(sinks, DistributorConfig::default());
    let live_task = live.map(|rx| tokio::spawn(forward_live(rx)));

    let mut machine = SessionStateMachine::new(config.session_config(), handle)
        .with_venues(Arc::new(venues))
        .with_cars(Arc::new(cars))
        .with_projection(Box::new(Equirectangular::new(config.origin)));
    let mut snapshots = machine.watch_snapshots();
    let speed_unit = config.units().speed_unit();

    let listener = match config
        .listener_config()
        .map_err(CliError::from)
        .and_then(|lc| UdpListener::start(lc, machine).map_err(CliError::from))
    {
        Ok(listener) => listener,
        Err(e) => {
            finish_distributor(distributor, live_task).await;
            return Err(e);
        }
    };
    info!(
        address = %listener.local_addr(),
        log_dir = %config.log_dir.display(),
        "Recording GT7 telemetry, press Ctrl-C to stop"
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut poll = tokio::time::interval(LISTENER_POLL_INTERVAL);
    let mut status = tokio::time::interval(STATUS_INTERVAL);
    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                match result {
                    Ok(()) => info!("Interrupted, stopping"),
                    Err(e) => error!(error = %e, "Failed to wait for Ctrl-C, stopping"),
                }
                break;
            }
            _ = poll.tick() => {
                if listener.is_finished() {
                    break;
                }
            }
            _ = status.tick() => log_snapshot(&mut snapshots, speed_unit),
        }
    }

    // Joining the receive thread blocks for up to one receive timeout.
    let fatal = match tokio::task::spawn_blocking(move || listener.stop()).await {
        Ok(Ok(exit)) => {
            let mut machine = exit.handler;
            machine.finish();
            let stats = machine.stats();
            info!(
                packets = stats.packets,
                synthesized = stats.synthesized,
                samples = stats.samples,
                laps = stats.laps,
                sessions = stats.sessions,
                "Session summary"
            );
            exit.error.map(CliError::from)
        }
        Ok(Err(e)) => Some(CliError::from(e)),
        Err(e) => Some(CliError::from(e)),
    };

    finish_distributor(distributor, live_task).await;
    match fatal {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

type LiveReceiver = broadcast::Receiver<String>;

fn build_sinks(
    config: &LoggerConfig,
) -> Result<(Vec<Box<dyn TelemetrySink>>, Option<LiveReceiver>), CliError> {
    let mut sinks: Vec<Box<dyn TelemetrySink>> = vec![Box::new(MotecCsvWriter::new(RawLogConfig {
        log_dir: config.log_dir.clone(),
        file_template: config.file_template.clone(),
        sampling_frequency_hz: config.sampling_frequency_hz,
    }))];

    if let Some(path) = &config.database_path {
        let db = SessionDatabase::open(path)?;
        sinks.push(Box::new(DatabaseSink::new(Arc::new(db))));
    }

    let mut live = None;
    if config.broadcast {
        let broadcaster = LiveBroadcaster::default();
        live = Some(broadcaster.subscribe());
        sinks.push(Box::new(broadcaster));
    }
    Ok((sinks, live))
}

/// Drain the distributor and wait for the live forwarder to see the channel
/// close.
async fn finish_distributor(distributor: Distributor, live_task: Option<JoinHandle<()>>) {
    match distributor.close().await {
        Ok(report) => log_report(&report),
        Err(e) => error!(error = %e, "Distributor did not shut down cleanly"),
    }
    if let Some(task) = live_task
        && let Err(e) = task.await
    {
        warn!(error = %e, "Live output task failed");
    }
}

fn log_report(report: &DistributorReport) {
    info!(dispatched = report.dispatched, "Distributor drained");
    for sink in &report.sinks {
        if sink.failed > 0 {
            warn!(
                sink = %sink.sink,
                delivered = sink.delivered,
                failed = sink.failed,
                "Sink reported failures"
            );
        } else {
            info!(sink = %sink.sink, delivered = sink.delivered, "Sink closed");
        }
    }
}

/// Log the latest headline values, if any packet arrived since the last call.
fn log_snapshot(snapshots: &mut watch::Receiver<Option<LiveSnapshot>>, speed_unit: &str) {
    if !snapshots.has_changed().unwrap_or(false) {
        return;
    }
    let Some(snapshot) = *snapshots.borrow_and_update() else {
        return;
    };
    info!(
        tick = snapshot.tick,
        lap = snapshot.current_lap,
        gear = snapshot.gear,
        rpm = snapshot.rpm.round(),
        speed = snapshot.speed.round(),
        unit = speed_unit,
        in_race = snapshot.in_race,
        "Live"
    );
}

/// Write each live sample as one JSON line on stdout.
async fn forward_live(mut rx: LiveReceiver) {
    let mut stdout = tokio::io::stdout();
    loop {
        match rx.recv().await {
            Ok(mut line) => {
                line.push('\n');
                if let Err(e) = stdout.write_all(line.as_bytes()).await {
                    warn!(error = %e, "Live output closed");
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Live output fell behind, samples dropped");
            }
            Err(RecvError::Closed) => break,
        }
    }
    if let Err(e) = stdout.flush().await {
        warn!(error = %e, "Failed to flush live output");
    }
}
