//! `gt7-logger sessions`: recent rows of the session database.

use std::path::Path;

use gt7_telemetry_config::LoggerConfig;
use gt7_telemetry_sinks::SessionDatabase;

use crate::error::CliError;
use crate::output;

/// Print the `limit` most recent sessions. `database` takes precedence over
/// the configured path.
pub fn execute(
    config: &LoggerConfig,
    database: Option<&Path>,
    limit: u32,
    json: bool,
) -> Result<(), CliError> {
    let path = database
        .or(config.database_path.as_deref())
        .ok_or(CliError::NoDatabase)?;
    let db = SessionDatabase::open(path)?;
    let sessions = db.recent_sessions(limit)?;
    output::print_sessions(&sessions, json)
}
