//! gt7-logger - Gran Turismo 7 telemetry logger
//!
//! Listens for the console's encrypted UDP telemetry, records each session as
//! a MoTeC CSV log and optionally keeps a SQLite history of best laps.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod commands;
mod error;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use gt7_telemetry_config::DEFAULT_CONFIG_FILE;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{ConfigOverrides, load_config};
use crate::error::CliError;

/// Crates whose logs are shown at the selected verbosity.
const LOG_TARGETS: &[&str] = &[
    "gt7_logger",
    "gt7_telemetry_protocol",
    "gt7_telemetry_session",
    "gt7_telemetry_distributor",
    "gt7_telemetry_sinks",
    "gt7_telemetry_config",
];

#[derive(Parser)]
#[command(name = "gt7-logger")]
#[command(about = "Record Gran Turismo 7 UDP telemetry to MoTeC CSV logs")]
#[command(version)]
#[command(long_about = "
gt7-logger listens for the encrypted telemetry stream a PlayStation sends while
Gran Turismo 7 is running. Each race (or replay, with --replay) becomes one
MoTeC CSV file; completed laps can also be stored in a SQLite database.

Without a subcommand, `run` is assumed.
")]
struct Cli {
    /// Output in JSON format for machine parsing
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file; missing means defaults
    #[arg(short, long, global = true, env = "GT7_LOGGER_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Record telemetry until Ctrl-C (default)
    Run(ConfigOverrides),

    /// List recent sessions from the database
    Sessions {
        /// Number of rows to show
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: u32,

        /// Database file; defaults to database_path from the config
        #[arg(long)]
        database: Option<PathBuf>,
    },

    /// Print the effective configuration
    Config(ConfigOverrides),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(log_level).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let result = execute_command(&cli).await;

    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            if cli.json {
                output::print_error_json(&e);
            } else {
                output::print_error_human(&e);
            }

            let exit_code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            std::process::exit(exit_code);
        }
    }
}

fn default_filter(level: &str) -> String {
    LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

async fn execute_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        None => {
            let config = load_config(&cli.config, &ConfigOverrides::default())?;
            commands::run::execute(config).await?;
        }
        Some(Commands::Run(overrides)) => {
            let config = load_config(&cli.config, overrides)?;
            commands::run::execute(config).await?;
        }
        Some(Commands::Sessions { limit, database }) => {
            let config = load_config(&cli.config, &ConfigOverrides::default())?;
            commands::sessions::execute(&config, database.as_deref(), *limit, cli.json)?;
        }
        Some(Commands::Config(overrides)) => {
            let config = load_config(&cli.config, overrides)?;
            commands::config::execute(&config, cli.json)?;
        }
    }
    Ok(())
}
