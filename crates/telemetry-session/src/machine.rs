//! Per-tick session lifecycle.
//!
//! ```text
//!   NoSession --eligible tick--> WarmingUp(3) --> ... --> WarmingUp(0) --next tick--> Recording
//!       ^                                                                               |
//!       +------------------ left race (live) / lap count went backwards ---------------+
//! ```
//!
//! Every call into the [`LogSink`] happens on the caller's thread, in order:
//! `new_log`, then samples, laps and event updates, then `save_log`.

use std::sync::Arc;

use chrono::{DateTime, Local};
use gt7_telemetry_core::{
    ChannelSample, ChannelSchema, LapMarker, LogSink, SessionEvent, UnitSystem,
};
use gt7_telemetry_errors::{DecodeResult, TelemetryError};
use gt7_telemetry_protocol::{DatagramHandler, PacketDecoder, TelemetryPacket};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cars::CarTable;
use crate::derive::{DerivationContext, derive_channels};
use crate::detector::{CONFIDENT_PROBABILITY, TrackDetector};
use crate::projection::{CoordinateProjection, Equirectangular};
use crate::snapshot::LiveSnapshot;
use crate::venues::VenueTable;

/// Ticks discarded at the start of every recording.
pub const WARM_UP_TICKS: u8 = 3;

/// Emit a progress line every this many ticks.
pub const PROGRESS_INTERVAL: i32 = 1000;

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    NoSession,
    /// Ticks left to discard
    WarmingUp(u8),
    Recording,
}

impl SessionState {
    pub fn is_active(self) -> bool {
        !matches!(self, SessionState::NoSession)
    }
}

/// Default cap on synthesized ticks per gap, ten seconds at 60 Hz.
pub const DEFAULT_MAX_GAP_FILL: u32 = 600;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub units: UnitSystem,
    pub sampling_frequency_hz: u32,
    /// Record while not in a race (replays)
    pub replay: bool,
    /// Cap on synthesized ticks per gap; `None` fills every gap
    pub max_gap_fill: Option<u32>,
    /// Defaults copied into each new recording
    pub event: SessionEvent,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            units: UnitSystem::Metric,
            sampling_frequency_hz: gt7_telemetry_core::DEFAULT_SAMPLING_FREQUENCY_HZ,
            replay: false,
            max_gap_fill: Some(DEFAULT_MAX_GAP_FILL),
            event: SessionEvent::default(),
        }
    }
}

/// Counters kept across sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionStats {
    pub packets: u64,
    pub synthesized: u64,
    pub samples: u64,
    pub laps: u64,
    pub sessions: u64,
}

pub struct SessionStateMachine<S: LogSink> {
    config: SessionConfig,
    decoder: PacketDecoder,
    schema: Arc<ChannelSchema>,
    sink: S,
    cars: Arc<CarTable>,
    projection: Box<dyn CoordinateProjection>,
    detector: TrackDetector,
    state: SessionState,
    last: Option<TelemetryPacket>,
    event: Option<SessionEvent>,
    snapshot: Option<LiveSnapshot>,
    snapshot_tx: Option<watch::Sender<Option<LiveSnapshot>>>,
    stats: SessionStats,
}

impl<S: LogSink> SessionStateMachine<S> {
    pub fn new(config: SessionConfig, sink: S) -> Self {
        let schema = Arc::new(ChannelSchema::new(config.units));
        Self {
            config,
            decoder: PacketDecoder::gt7(),
            schema,
            sink,
            cars: Arc::new(CarTable::default()),
            projection: Box::new(Equirectangular::default()),
            detector: TrackDetector::new(Arc::new(VenueTable::default())),
            state: SessionState::NoSession,
            last: None,
            event: None,
            snapshot: None,
            snapshot_tx: None,
            stats: SessionStats::default(),
        }
    }

    pub fn with_decoder(mut self, decoder: PacketDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_venues(mut self, venues: Arc<VenueTable>) -> Self {
        self.detector = TrackDetector::new(venues);
        self
    }

    pub fn with_cars(mut self, cars: Arc<CarTable>) -> Self {
        self.cars = cars;
        self
    }

    pub fn with_projection(mut self, projection: Box<dyn CoordinateProjection>) -> Self {
        self.projection = projection;
        self
    }

    pub fn schema(&self) -> &Arc<ChannelSchema> {
        &self.schema
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Metadata of the active recording.
    pub fn current_event(&self) -> Option<&SessionEvent> {
        self.event.as_ref()
    }

    pub fn snapshot(&self) -> Option<&LiveSnapshot> {
        self.snapshot.as_ref()
    }

    /// Receiver holding the latest snapshot, readable from outside the
    /// receive thread.
    pub fn watch_snapshots(&mut self) -> watch::Receiver<Option<LiveSnapshot>> {
        match &self.snapshot_tx {
            Some(tx) => tx.subscribe(),
            None => {
                let (tx, rx) = watch::channel(self.snapshot);
                self.snapshot_tx = Some(tx);
                rx
            }
        }
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn detector(&self) -> &TrackDetector {
        &self.detector
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Decode one datagram and run it through the state machine.
    ///
    /// # Errors
    ///
    /// Returns the [`DecodeError`](gt7_telemetry_errors::DecodeError) for
    /// datagrams that cannot be decoded; state is left untouched.
    pub fn process_sample(&mut self, timestamp: f64, raw: &[u8]) -> DecodeResult<()> {
        let packet = self.decoder.decode(raw)?;
        self.process_decoded(timestamp, packet);
        Ok(())
    }

    /// Run an already decoded packet through gap reconciliation and per-tick
    /// processing.
    pub fn process_decoded(&mut self, timestamp: f64, packet: TelemetryPacket) {
        self.stats.packets += 1;
        let snapshot = LiveSnapshot::from_packet(&packet, self.config.units.speed_factor());
        self.snapshot = Some(snapshot);
        if let Some(tx) = &self.snapshot_tx {
            tx.send_modify(|latest| *latest = Some(snapshot));
        }

        let last = match self.last.take() {
            Some(last) => last,
            None => {
                info!(tick = packet.tick, "Received first packet from GT7");
                packet.clone()
            }
        };

        let missing = i64::from(packet.tick) - i64::from(last.tick) - 1;
        if missing > 0 {
            let cap = self.config.max_gap_fill.map_or(missing, i64::from);
            let fill = missing.min(cap);
            if fill < missing {
                warn!(missing, filled = fill, from = last.tick, "Gap exceeds fill limit");
            } else {
                info!(missing, from = last.tick, "Missed ticks, duplicating last packet");
            }
            let first = last.tick.saturating_add(1);
            for tick in (first..packet.tick).take(usize::try_from(fill).unwrap_or(usize::MAX)) {
                let synthetic = TelemetryPacket::with_tick(&last, tick);
                self.stats.synthesized += 1;
                self.process_packet(timestamp, &synthetic, &last);
            }
        }

        self.process_packet(timestamp, &packet, &last);
        self.last = Some(packet);
    }

    /// Close the active recording, if any.
    pub fn finish(&mut self) {
        self.end_session();
    }

    fn process_packet(&mut self, timestamp: f64, curr: &TelemetryPacket, last: &TelemetryPacket) {
        if curr.paused() {
            return;
        }

        if !curr.in_race() && !self.config.replay {
            self.end_session();
            return;
        }

        if curr.current_lap < last.current_lap {
            info!(
                tick = curr.tick,
                from = last.current_lap,
                to = curr.current_lap,
                "Lap count went backwards, restarting recording"
            );
            self.end_session();
        }

        if self.state == SessionState::NoSession {
            self.start_session(timestamp, curr);
        }

        if let SessionState::WarmingUp(remaining) = self.state {
            if remaining > 0 {
                debug!(tick = curr.tick, remaining, "Skipping warm-up tick");
                self.state = SessionState::WarmingUp(remaining - 1);
                return;
            }
            self.state = SessionState::Recording;
        }

        let beacon = curr.current_lap > last.current_lap;
        if beacon {
            self.complete_lap(timestamp, curr, last);
        } else {
            self.detector
                .update(f64::from(curr.position.x), f64::from(curr.position.z));
        }

        if curr.tick % PROGRESS_INTERVAL == 0 {
            log_progress(timestamp, curr);
        }

        let ctx = DerivationContext {
            units: self.config.units,
            sampling_frequency_hz: f64::from(self.config.sampling_frequency_hz),
            projection: self.projection.as_ref(),
        };
        let values = derive_channels(&ctx, beacon, curr, last);
        self.sink
            .add_samples(ChannelSample::new(timestamp, values).with_tick(curr.tick));
        self.stats.samples += 1;
    }

    fn start_session(&mut self, timestamp: f64, curr: &TelemetryPacket) {
        self.detector.reset();
        self.state = SessionState::WarmingUp(WARM_UP_TICKS);

        let mut event = self.config.event.clone();
        event.datetime = Some(format_datetime(timestamp));
        if event.vehicle.is_empty() {
            event.vehicle = self.cars.lookup(curr.car_code);
        }
        if !curr.in_race() && event.session.is_empty() {
            event.session = "Replay".to_string();
        }

        info!(
            vehicle = %event.vehicle,
            session = %event.session,
            venue = %event.venue,
            "Starting new recording"
        );
        log_progress(timestamp, curr);

        self.sink.new_log(&self.schema, &event);
        self.event = Some(event);
        self.stats.sessions += 1;
    }

    fn complete_lap(&mut self, timestamp: f64, curr: &TelemetryPacket, last: &TelemetryPacket) {
        let lap_time = f64::from(curr.last_lap_ms) / 1000.0;
        let lap = i32::from(last.current_lap);
        info!(lap, lap_time, "Lap completed");
        self.sink.add_lap(LapMarker {
            timestamp,
            lap,
            lap_time,
        });
        self.stats.laps += 1;

        let Some(event) = self.event.as_mut() else {
            return;
        };
        if !event.venue.is_empty() && self.detector.probability() >= CONFIDENT_PROBABILITY {
            return;
        }
        let (name, probability) = self.detector.guess(
            f64::from(last.position.x),
            f64::from(last.position.z),
            f64::from(curr.position.x),
            f64::from(curr.position.z),
        );
        if let Some(name) = name {
            event.venue = name.replace(" - ", "-");
            info!(venue = %event.venue, probability, "Venue inferred");
            self.sink.update_event(event);
        }
    }

    fn end_session(&mut self) {
        if !self.state.is_active() {
            return;
        }
        self.sink.save_log();
        self.state = SessionState::NoSession;
        if let Some(event) = self.event.take() {
            info!(vehicle = %event.vehicle, venue = %event.venue, "Recording saved");
        }
    }
}

impl<S: LogSink + Send + 'static> DatagramHandler for SessionStateMachine<S> {
    fn handle_datagram(&mut self, timestamp: f64, datagram: &[u8]) -> Result<(), TelemetryError> {
        self.process_sample(timestamp, datagram)?;
        Ok(())
    }
}

fn format_datetime(timestamp: f64) -> String {
    let millis = (timestamp * 1000.0).round();
    let millis = if millis.is_finite() { millis as i64 } else { 0 };
    DateTime::from_timestamp_millis(millis)
        .unwrap_or_default()
        .with_timezone(&Local)
        .format(DATETIME_FORMAT)
        .to_string()
}

fn log_progress(timestamp: f64, p: &TelemetryPacket) {
    info!(
        timestamp,
        tick = p.tick,
        lap = p.current_lap,
        laps = p.total_laps,
        x = p.position.x,
        y = p.position.y,
        z = p.position.z,
        best_ms = p.best_lap_ms,
        last_ms = p.last_lap_ms,
        position = p.race_position,
        opponents = p.opponents,
        gear = p.gear,
        throttle = p.throttle,
        brake = p.brake,
        speed = p.speed,
        car = p.car_code,
        "progress"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datetime_format_shape() {
        let s = format_datetime(1_700_000_000.0);
        assert_eq!(s.len(), 19);
        assert_eq!(s.as_bytes()[10], b'T');
    }

    #[test]
    fn test_session_state_activity() {
        assert!(!SessionState::NoSession.is_active());
        assert!(SessionState::WarmingUp(0).is_active());
        assert!(SessionState::Recording.is_active());
    }
}
