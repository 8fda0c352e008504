//! Output formatting for CLI responses

use anyhow::Error;
use colored::*;
use gt7_telemetry_config::LoggerConfig;
use gt7_telemetry_sinks::StoredSession;
use serde_json::json;

use crate::error::CliError;

/// Print error in JSON format
pub fn print_error_json(error: &Error) {
    let error_json = json!({
        "success": false,
        "error": {
            "message": error.to_string(),
            "type": error_type_name(error)
        }
    });
    match serde_json::to_string_pretty(&error_json) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Failed to format error as JSON: {e}"),
    }
}

/// Print error in human-readable format
pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);

    let mut source = error.source();
    while let Some(err) = source {
        eprintln!("  {} {}", "Caused by:".yellow(), err);
        source = err.source();
    }
}

pub fn print_sessions(sessions: &[StoredSession], json: bool) -> Result<(), CliError> {
    if json {
        let output = json!({
            "success": true,
            "sessions": sessions
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!("{}", "No sessions recorded".yellow());
        return Ok(());
    }

    println!("{}", "Recent sessions:".bold());
    for session in sessions {
        println!(
            "  {} {}  {}  {}  {}  {}  best {}",
            format!("#{}", session.id).dimmed(),
            session.timestamp,
            or_dash(&session.venue).cyan(),
            or_dash(&session.vehicle),
            or_dash(&session.driver),
            or_dash(&session.session),
            format_lap_time(session.best_lap).green().bold(),
        );
    }
    Ok(())
}

pub fn print_config(config: &LoggerConfig, json: bool) -> Result<(), CliError> {
    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
    } else {
        print!("{}", config.to_yaml()?);
    }
    Ok(())
}

/// `m:ss.fff`, or `-` for a missing or negative time.
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
pub fn format_lap_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "-".to_string();
    }
    let millis = (seconds * 1000.0).round() as u64;
    format!("{}:{:02}.{:03}", millis / 60_000, (millis / 1000) % 60, millis % 1000)
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() { "-" } else { value }
}

fn error_type_name(error: &Error) -> &'static str {
    error.downcast_ref::<CliError>().map_or("unknown", CliError::kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lap_times_render_as_minutes() {
        assert_eq!(format_lap_time(93.5), "1:33.500");
        assert_eq!(format_lap_time(59.9994), "0:59.999");
        assert_eq!(format_lap_time(0.0), "0:00.000");
        assert_eq!(format_lap_time(3725.25), "62:05.250");
    }

    #[test]
    fn invalid_lap_times_render_as_dash() {
        assert_eq!(format_lap_time(-1.0), "-");
        assert_eq!(format_lap_time(f64::NAN), "-");
    }

    #[test]
    fn error_type_names_come_from_cli_errors() {
        let err = Error::from(CliError::NoDatabase);
        assert_eq!(error_type_name(&err), "no_database");
        assert_eq!(error_type_name(&anyhow::anyhow!("plain")), "unknown");
    }
}
