use gt7_telemetry_protocol::TelemetryPacket;
use serde::Serialize;

use crate::derive::pedal_percent;

/// Headline values of the most recent packet, for dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LiveSnapshot {
    pub tick: i32,
    pub rpm: f64,
    /// In the configured speed unit
    pub speed: f64,
    pub gear: u8,
    pub suggested_gear: u8,
    pub throttle: f64,
    pub brake: f64,
    pub clutch: f64,
    pub current_lap: i16,
    pub total_laps: i16,
    /// Seconds; `None` until a lap has been set
    pub last_lap: Option<f64>,
    pub best_lap: Option<f64>,
    pub in_race: bool,
    pub paused: bool,
}

impl LiveSnapshot {
    pub fn from_packet(packet: &TelemetryPacket, speed_factor: f64) -> Self {
        Self {
            tick: packet.tick,
            rpm: f64::from(packet.rpm),
            speed: f64::from(packet.speed) * speed_factor,
            gear: packet.gear,
            suggested_gear: packet.suggested_gear,
            throttle: pedal_percent(f64::from(packet.throttle)),
            brake: pedal_percent(f64::from(packet.brake)),
            clutch: pedal_percent(f64::from(packet.clutch)),
            current_lap: packet.current_lap,
            total_laps: packet.total_laps,
            last_lap: lap_seconds(packet.last_lap_ms),
            best_lap: lap_seconds(packet.best_lap_ms),
            in_race: packet.in_race(),
            paused: packet.paused(),
        }
    }
}

fn lap_seconds(ms: i32) -> Option<f64> {
    (ms > 0).then(|| f64::from(ms) / 1000.0)
}
