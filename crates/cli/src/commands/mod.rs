//! Command implementations for gt7-logger

pub mod config;
pub mod run;
pub mod sessions;

use std::path::{Path, PathBuf};

use clap::Args;
use gt7_telemetry_config::LoggerConfig;

use crate::error::CliError;

/// Command-line overrides applied on top of the config file.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    /// UDP port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Local address to bind
    #[arg(long, value_name = "IP")]
    pub listen: Option<String>,

    /// Console address; enables heartbeats
    #[arg(long, value_name = "IP", env = "GT7_PLAYSTATION_ADDRESS")]
    pub playstation: Option<String>,

    /// Directory for CSV logs
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// SQLite session history
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// Print every sample as a JSON line on stdout
    #[arg(long)]
    pub broadcast: bool,

    /// Record outside of races (replays)
    #[arg(long)]
    pub replay: bool,

    /// Speeds in mph
    #[arg(long)]
    pub imperial: bool,

    #[arg(long)]
    pub driver: Option<String>,

    /// Overrides the car-table lookup
    #[arg(long)]
    pub vehicle: Option<String>,

    /// Cap on synthesized samples per gap
    #[arg(long, value_name = "TICKS")]
    pub max_gap_fill: Option<u32>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut LoggerConfig) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(listen) = &self.listen {
            config.listen_address = listen.clone();
        }
        if let Some(playstation) = &self.playstation {
            config.playstation_address = Some(playstation.clone());
        }
        if let Some(log_dir) = &self.log_dir {
            config.log_dir = log_dir.clone();
        }
        if let Some(database) = &self.database {
            config.database_path = Some(database.clone());
        }
        if let Some(driver) = &self.driver {
            config.event.driver = driver.clone();
        }
        if let Some(vehicle) = &self.vehicle {
            config.event.vehicle = vehicle.clone();
        }
        if let Some(max_gap_fill) = self.max_gap_fill {
            config.max_gap_fill = Some(max_gap_fill);
        }
        config.broadcast |= self.broadcast;
        config.replay |= self.replay;
        config.imperial |= self.imperial;
    }
}

/// Load `path`, apply the overrides and validate the result.
pub fn load_config(path: &Path, overrides: &ConfigOverrides) -> Result<LoggerConfig, CliError> {
    let mut config = LoggerConfig::load(path)?;
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}
