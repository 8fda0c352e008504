//! Conversion of a decoded packet pair into the fixed channel vector.

use gt7_telemetry_core::{CHANNEL_COUNT, Channel, ChannelValues, UnitSystem};
use gt7_telemetry_protocol::TelemetryPacket;

use crate::frame::{Vector, rotate_into_frame};
use crate::projection::CoordinateProjection;

/// Standard gravity used to express acceleration in G.
pub const GRAVITY: f64 = 9.8;

/// Scale a raw 0-255 pedal value to percent.
pub fn pedal_percent(raw: f64) -> f64 {
    raw * 100.0 / 255.0
}

/// Fuel remaining as a percentage of capacity; 0 when capacity is unknown.
pub fn fuel_percent(fuel: f64, capacity: f64) -> f64 {
    if capacity > 0.0 {
        fuel / capacity * 100.0
    } else {
        0.0
    }
}

/// Linear wheel speed in display units.
///
/// Live telemetry reports wheel rotation with the opposite sign to replays,
/// so the result is negated while in a race.
pub fn wheel_speed(radius: f64, angular: f64, speed_factor: f64, in_race: bool) -> f64 {
    let factor = if in_race { -speed_factor } else { speed_factor };
    radius * angular * factor
}

/// Inputs that stay fixed for the life of a state machine.
pub struct DerivationContext<'a> {
    pub units: UnitSystem,
    pub sampling_frequency_hz: f64,
    pub projection: &'a dyn CoordinateProjection,
}

/// Build the channel vector for `curr`, using `last` for velocity deltas.
pub fn derive_channels(
    ctx: &DerivationContext<'_>,
    beacon: bool,
    curr: &TelemetryPacket,
    last: &TelemetryPacket,
) -> ChannelValues {
    let factor = ctx.units.speed_factor();
    let freq = ctx.sampling_frequency_hz;
    let mut v = [0.0; CHANNEL_COUNT];
    let mut set = |ch: Channel, value: f64| v[ch.index()] = value;

    let (lat, long) = ctx
        .projection
        .convert(f64::from(curr.position.x), -f64::from(curr.position.z));

    let delta = Vector::from(curr.velocity) - Vector::from(last.velocity);
    let local = rotate_into_frame(curr.rotation, delta);

    set(Channel::Beacon, if beacon { 1.0 } else { 0.0 });
    set(Channel::Lap, f64::from(curr.current_lap));
    set(Channel::Rpm, f64::from(curr.rpm));
    set(Channel::Gear, f64::from(curr.gear));
    set(Channel::Throttle, pedal_percent(f64::from(curr.throttle)));
    set(Channel::Brake, pedal_percent(f64::from(curr.brake)));
    set(Channel::Clutch, pedal_percent(f64::from(curr.clutch)));
    set(
        Channel::Steer,
        curr.wheel_rotation().map_or(0.0, |r| f64::from(r).to_degrees()),
    );
    set(Channel::Speed, f64::from(curr.speed) * factor);
    set(Channel::Lat, lat);
    set(Channel::Long, long);
    set(Channel::VelX, local.x);
    set(Channel::VelY, local.y);
    // Negated to match the sign of the projected longitude.
    set(Channel::VelZ, -local.z);
    set(Channel::GLat, local.x * freq / GRAVITY);
    set(Channel::GVert, local.y * freq / GRAVITY);
    set(Channel::GLong, -(local.z * freq / GRAVITY));

    let corners = [
        (Channel::SuspFl, Channel::WheelSpeedFl, Channel::TyreTempFl),
        (Channel::SuspFr, Channel::WheelSpeedFr, Channel::TyreTempFr),
        (Channel::SuspRl, Channel::WheelSpeedRl, Channel::TyreTempRl),
        (Channel::SuspRr, Channel::WheelSpeedRr, Channel::TyreTempRr),
    ];
    for (i, (susp, wspd, temp)) in corners.into_iter().enumerate() {
        set(susp, f64::from(curr.suspension[i]) * 100.0);
        set(
            wspd,
            wheel_speed(
                f64::from(curr.tyre_radius[i]),
                f64::from(curr.wheel_speed[i]),
                factor,
                curr.in_race(),
            ),
        );
        set(temp, f64::from(curr.tyre_temp[i]));
    }

    set(Channel::RideHeight, f64::from(curr.ride_height) * 100.0);
    set(Channel::TurboPressure, f64::from(curr.turbo_boost) * 100.0);
    set(Channel::OilPressure, f64::from(curr.oil_pressure));
    set(Channel::OilTemp, f64::from(curr.oil_temp));
    set(Channel::WaterTemp, f64::from(curr.water_temp));
    set(
        Channel::FuelLevel,
        fuel_percent(f64::from(curr.fuel), f64::from(curr.fuel_capacity)),
    );
    set(Channel::Asm, if curr.asm_active() { 1.0 } else { 0.0 });
    set(Channel::Tcs, if curr.tcs_active() { 1.0 } else { 0.0 });

    v
}
