//! The fixed channel schema emitted for every recorded tick.
//!
//! The schema is resolved once from the configured [`UnitSystem`] and then
//! shared by reference with every sink. Sample values are positional: the
//! `n`th value of a [`crate::ChannelSample`] belongs to `Channel::ALL[n]`.

use serde::{Deserialize, Serialize};

/// Number of channels in every sample.
pub const CHANNEL_COUNT: usize = 37;

/// Measurement system used for speed channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    /// km/h
    #[default]
    Metric,
    /// mph
    Imperial,
}

impl UnitSystem {
    /// Pick the unit system from the `imperial` flag.
    pub fn from_imperial(imperial: bool) -> Self {
        if imperial {
            UnitSystem::Imperial
        } else {
            UnitSystem::Metric
        }
    }

    /// Multiplier converting metres per second into this system's speed unit.
    pub fn speed_factor(self) -> f64 {
        match self {
            UnitSystem::Metric => 3.6,
            UnitSystem::Imperial => 2.236_936_29,
        }
    }

    /// Display unit for speed channels.
    pub fn speed_unit(self) -> &'static str {
        match self {
            UnitSystem::Metric => "km/h",
            UnitSystem::Imperial => "mph",
        }
    }
}

/// A single recorded channel, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Channel {
    Beacon = 0,
    Lap,
    Rpm,
    Gear,
    Throttle,
    Brake,
    Clutch,
    Steer,
    Speed,
    Lat,
    Long,
    VelX,
    VelY,
    VelZ,
    GLat,
    GVert,
    GLong,
    SuspFl,
    SuspFr,
    SuspRl,
    SuspRr,
    WheelSpeedFl,
    WheelSpeedFr,
    WheelSpeedRl,
    WheelSpeedRr,
    TyreTempFl,
    TyreTempFr,
    TyreTempRl,
    TyreTempRr,
    RideHeight,
    TurboPressure,
    OilPressure,
    OilTemp,
    WaterTemp,
    FuelLevel,
    Asm,
    Tcs,
}

impl Channel {
    /// Every channel in emission order.
    pub const ALL: [Channel; CHANNEL_COUNT] = [
        Channel::Beacon,
        Channel::Lap,
        Channel::Rpm,
        Channel::Gear,
        Channel::Throttle,
        Channel::Brake,
        Channel::Clutch,
        Channel::Steer,
        Channel::Speed,
        Channel::Lat,
        Channel::Long,
        Channel::VelX,
        Channel::VelY,
        Channel::VelZ,
        Channel::GLat,
        Channel::GVert,
        Channel::GLong,
        Channel::SuspFl,
        Channel::SuspFr,
        Channel::SuspRl,
        Channel::SuspRr,
        Channel::WheelSpeedFl,
        Channel::WheelSpeedFr,
        Channel::WheelSpeedRl,
        Channel::WheelSpeedRr,
        Channel::TyreTempFl,
        Channel::TyreTempFr,
        Channel::TyreTempRl,
        Channel::TyreTempRr,
        Channel::RideHeight,
        Channel::TurboPressure,
        Channel::OilPressure,
        Channel::OilTemp,
        Channel::WaterTemp,
        Channel::FuelLevel,
        Channel::Asm,
        Channel::Tcs,
    ];

    /// Position of this channel inside a sample.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Channel name as written to log headers and broadcast payloads.
    pub const fn name(self) -> &'static str {
        match self {
            Channel::Beacon => "beacon",
            Channel::Lap => "lap",
            Channel::Rpm => "rpm",
            Channel::Gear => "gear",
            Channel::Throttle => "throttle",
            Channel::Brake => "brake",
            Channel::Clutch => "clutch",
            Channel::Steer => "steer",
            Channel::Speed => "speed",
            Channel::Lat => "lat",
            Channel::Long => "long",
            Channel::VelX => "velx",
            Channel::VelY => "vely",
            Channel::VelZ => "velz",
            Channel::GLat => "glat",
            Channel::GVert => "gvert",
            Channel::GLong => "glong",
            Channel::SuspFl => "suspfl",
            Channel::SuspFr => "suspfr",
            Channel::SuspRl => "susprl",
            Channel::SuspRr => "susprr",
            Channel::WheelSpeedFl => "wspdfl",
            Channel::WheelSpeedFr => "wspdfr",
            Channel::WheelSpeedRl => "wspdrl",
            Channel::WheelSpeedRr => "wspdrr",
            Channel::TyreTempFl => "tyretempfl",
            Channel::TyreTempFr => "tyretempfr",
            Channel::TyreTempRl => "tyretemprl",
            Channel::TyreTempRr => "tyretemprr",
            Channel::RideHeight => "rideheight",
            Channel::TurboPressure => "turbopres",
            Channel::OilPressure => "oilpres",
            Channel::OilTemp => "oiltemp",
            Channel::WaterTemp => "watertemp",
            Channel::FuelLevel => "fuellevel",
            Channel::Asm => "asm",
            Channel::Tcs => "tcs",
        }
    }

    /// Unit for this channel, or `None` for dimensionless values.
    pub fn unit(self, units: UnitSystem) -> Option<&'static str> {
        match self {
            Channel::Rpm => Some("rpm"),
            Channel::Throttle | Channel::Brake | Channel::Clutch | Channel::FuelLevel => Some("%"),
            Channel::Steer => Some("deg"),
            Channel::Speed
            | Channel::WheelSpeedFl
            | Channel::WheelSpeedFr
            | Channel::WheelSpeedRl
            | Channel::WheelSpeedRr => Some(units.speed_unit()),
            Channel::Lat | Channel::Long => Some("deg"),
            Channel::VelX | Channel::VelY | Channel::VelZ => Some("m/s"),
            Channel::GLat | Channel::GVert | Channel::GLong => Some("G"),
            Channel::SuspFl | Channel::SuspFr | Channel::SuspRl | Channel::SuspRr => Some("cm"),
            Channel::RideHeight => Some("cm"),
            Channel::TyreTempFl
            | Channel::TyreTempFr
            | Channel::TyreTempRl
            | Channel::TyreTempRr
            | Channel::OilTemp
            | Channel::WaterTemp => Some("C"),
            _ => None,
        }
    }
}

/// A resolved `{name, unit}` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelSpec {
    pub name: &'static str,
    pub unit: Option<&'static str>,
}

/// The ordered channel schema for one unit system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelSchema {
    units: UnitSystem,
    channels: Vec<ChannelSpec>,
}

impl ChannelSchema {
    /// Resolve every channel's name and unit for `units`.
    pub fn new(units: UnitSystem) -> Self {
        let channels = Channel::ALL
            .iter()
            .map(|&ch| ChannelSpec {
                name: ch.name(),
                unit: ch.unit(units),
            })
            .collect();
        Self { units, channels }
    }

    pub fn units(&self) -> UnitSystem {
        self.units
    }

    pub fn channels(&self) -> &[ChannelSpec] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Channel names in emission order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.channels.iter().map(|c| c.name)
    }

    /// Look up a channel position by name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.channels.iter().position(|c| c.name == name)
    }
}

impl Default for ChannelSchema {
    fn default() -> Self {
        Self::new(UnitSystem::default())
    }
}
