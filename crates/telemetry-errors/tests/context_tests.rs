//! Context helpers attached to failing results.

use std::path::PathBuf;

use gt7_telemetry_errors::prelude::*;

type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

fn failing() -> std::result::Result<(), std::io::Error> {
    Err(std::io::Error::other("disk full"))
}

#[test]
fn test_context_wraps_into_other() -> TestResult {
    let err = failing()
        .context(ErrorContext::new("write raw log").with("path", "logs/a.csv"))
        .err()
        .ok_or("expected an error")?;
    assert_eq!(err.category(), ErrorCategory::Other);
    assert_eq!(
        err.to_string(),
        "operation: write raw log, path: logs/a.csv: disk full"
    );
    Ok(())
}

#[test]
fn test_with_context_names_the_operation() {
    let result: Result<()> = failing().with_context("flush");
    assert!(matches!(result, Err(TelemetryError::Other(msg)) if msg == "operation: flush: disk full"));
}

#[test]
fn test_map_context_builds_config_error() -> TestResult {
    let result = "not-a-number".parse::<u16>().map_context(
        ErrorContext::new("read port").with("format", "yaml"),
        |message| ConfigError::parse("config.yml", message),
    );
    match result {
        Err(ConfigError::Parse { path, message }) => {
            assert_eq!(path, PathBuf::from("config.yml"));
            assert!(message.starts_with("operation: read port, format: yaml: "));
            Ok(())
        }
        other => Err(format!("unexpected {other:?}").into()),
    }
}

#[test]
fn test_map_context_builds_sink_task_error() -> TestResult {
    let err = failing()
        .map_context(ErrorContext::new("join writer"), SinkError::Task)
        .err()
        .ok_or("expected an error")?;
    assert_eq!(err.severity(), ErrorSeverity::Error);
    assert_eq!(
        err.to_string(),
        "Sink task failed: operation: join writer: disk full"
    );
    Ok(())
}

#[test]
fn test_ok_results_pass_through() -> TestResult {
    let value = Ok::<_, std::io::Error>(7).with_context("unused")?;
    assert_eq!(value, 7);
    Ok(())
}
