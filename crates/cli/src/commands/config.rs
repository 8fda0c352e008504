//! `gt7-logger config`: print the effective configuration.

use gt7_telemetry_config::LoggerConfig;

use crate::error::CliError;
use crate::output;

pub fn execute(config: &LoggerConfig, json: bool) -> Result<(), CliError> {
    output::print_config(config, json)
}
