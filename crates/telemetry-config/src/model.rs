//! Logger configuration model.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use gt7_telemetry_core::{DEFAULT_PORT, DEFAULT_SAMPLING_FREQUENCY_HZ, SessionEvent, UnitSystem};
use gt7_telemetry_errors::ConfigError;
use gt7_telemetry_protocol::{HEARTBEAT_PORT, HeartbeatConfig, ListenerConfig, PacketType};
use gt7_telemetry_session::{DEFAULT_MAX_GAP_FILL, GeoOrigin, SessionConfig};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 100;
pub const DEFAULT_RECEIVE_TIMEOUT_MS: u64 = 500;
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_FILE_TEMPLATE: &str = "{datetime}_{venue}_{vehicle}.csv";

/// Everything the logger reads from `config.yml`.
///
/// Every field has a default, so an empty file is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub listen_address: String,
    pub port: u16,
    /// Console address; enables heartbeats when set
    pub playstation_address: Option<String>,
    pub heartbeat_interval_ms: u64,
    pub receive_timeout_ms: u64,
    pub packet_type: PacketType,

    pub sampling_frequency_hz: u32,
    pub imperial: bool,
    /// Record outside of races (replays)
    pub replay: bool,
    /// Cap on synthesized ticks per gap; `null` fills every gap
    pub max_gap_fill: Option<u32>,
    /// Defaults copied into each new recording
    pub event: SessionEvent,

    pub log_dir: PathBuf,
    pub file_template: String,
    /// Enables the SQLite session history
    pub database_path: Option<PathBuf>,
    /// Enables the live JSON broadcaster
    pub broadcast: bool,
    pub venue_table_path: Option<PathBuf>,
    pub car_table_path: Option<PathBuf>,
    /// Projection origin for the lat/long channels
    pub origin: GeoOrigin,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            listen_address: DEFAULT_LISTEN_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            playstation_address: None,
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
            receive_timeout_ms: DEFAULT_RECEIVE_TIMEOUT_MS,
            packet_type: PacketType::default(),
            sampling_frequency_hz: DEFAULT_SAMPLING_FREQUENCY_HZ,
            imperial: false,
            replay: false,
            max_gap_fill: Some(DEFAULT_MAX_GAP_FILL),
            event: SessionEvent::default(),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            file_template: DEFAULT_FILE_TEMPLATE.to_string(),
            database_path: None,
            broadcast: false,
            venue_table_path: None,
            car_table_path: None,
            origin: GeoOrigin::default(),
        }
    }
}

impl LoggerConfig {
    pub fn units(&self) -> UnitSystem {
        UnitSystem::from_imperial(self.imperial)
    }

    /// # Errors
    ///
    /// [`ConfigError::Invalid`] if `listen_address` is not an IP address.
    pub fn bind_address(&self) -> Result<SocketAddr, ConfigError> {
        let ip = parse_ip("listen_address", &self.listen_address)?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Heartbeat target, when a console address is configured.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] if `playstation_address` is not an IP address.
    pub fn heartbeat(&self) -> Result<Option<HeartbeatConfig>, ConfigError> {
        let Some(address) = self.playstation_address.as_deref().filter(|a| !a.trim().is_empty())
        else {
            return Ok(None);
        };
        let ip = parse_ip("playstation_address", address)?;
        Ok(Some(HeartbeatConfig {
            target: SocketAddr::new(ip, HEARTBEAT_PORT),
            interval: Duration::from_millis(self.heartbeat_interval_ms),
            packet_type: self.packet_type,
        }))
    }

    /// # Errors
    ///
    /// [`ConfigError::Invalid`] for unparsable addresses.
    pub fn listener_config(&self) -> Result<ListenerConfig, ConfigError> {
        let mut config = ListenerConfig::new(self.bind_address()?)
            .with_receive_timeout(Duration::from_millis(self.receive_timeout_ms));
        if let Some(heartbeat) = self.heartbeat()? {
            config = config.with_heartbeat(heartbeat);
        }
        Ok(config)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            units: self.units(),
            sampling_frequency_hz: self.sampling_frequency_hz,
            replay: self.replay,
            max_gap_fill: self.max_gap_fill,
            event: SessionEvent {
                datetime: None,
                ..self.event.clone()
            },
        }
    }
}

pub(crate) fn parse_ip(field: &str, value: &str) -> Result<IpAddr, ConfigError> {
    value
        .trim()
        .parse::<IpAddr>()
        .map_err(|e| ConfigError::invalid(field, format!("'{value}' is not an IP address: {e}")))
}

