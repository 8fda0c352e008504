//! Values emitted by the session state machine.

use serde_json::{Map, Number, Value};

use crate::channels::{CHANNEL_COUNT, Channel, ChannelSchema};

/// Positional channel values, ordered as [`Channel::ALL`].
pub type ChannelValues = [f64; CHANNEL_COUNT];

/// One recorded tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelSample {
    /// Receipt time of the datagram, seconds since the Unix epoch
    pub timestamp: f64,
    /// Packet sequence number the values were derived from
    pub tick: i32,
    pub values: ChannelValues,
}

impl ChannelSample {
    pub fn new(timestamp: f64, values: ChannelValues) -> Self {
        Self {
            timestamp,
            tick: 0,
            values,
        }
    }

    pub fn with_tick(mut self, tick: i32) -> Self {
        self.tick = tick;
        self
    }

    /// Value of a single channel.
    pub fn get(&self, channel: Channel) -> f64 {
        self.values[channel.index()]
    }

    /// Whether this sample marks a lap boundary.
    pub fn is_beacon(&self) -> bool {
        self.get(Channel::Beacon) > 0.5
    }

    /// Build the broadcast object: every channel name mapped to its value,
    /// plus `timestamp`.
    ///
    /// Non-finite values have no JSON representation and become `null`.
    pub fn to_json(&self, schema: &ChannelSchema) -> Value {
        let mut map = Map::with_capacity(schema.len() + 1);
        map.insert("timestamp".to_string(), json_number(self.timestamp));
        for (spec, value) in schema.channels().iter().zip(self.values.iter()) {
            map.insert(spec.name.to_string(), json_number(*value));
        }
        Value::Object(map)
    }
}

fn json_number(value: f64) -> Value {
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}

/// A completed lap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LapMarker {
    pub timestamp: f64,
    /// Index of the lap that just finished
    pub lap: i32,
    /// Lap time in seconds
    pub lap_time: f64,
}

/// Anything the state machine emits into the data stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    Channels(ChannelSample),
    Lap(LapMarker),
}

impl Sample {
    pub fn timestamp(&self) -> f64 {
        match self {
            Sample::Channels(s) => s.timestamp,
            Sample::Lap(l) => l.timestamp,
        }
    }
}

impl From<ChannelSample> for Sample {
    fn from(sample: ChannelSample) -> Self {
        Sample::Channels(sample)
    }
}

impl From<LapMarker> for Sample {
    fn from(marker: LapMarker) -> Self {
        Sample::Lap(marker)
    }
}
