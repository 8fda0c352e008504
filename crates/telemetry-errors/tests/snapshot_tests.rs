//! Snapshot tests for error message formatting.
//!
//! Error messages end up in operator-facing logs, so their wording is pinned.

use gt7_telemetry_errors::{
    ConfigError, DecodeError, ErrorSeverity, ListenerError, SinkError, TelemetryError,
};
use insta::assert_snapshot;

mod decode_error_snapshots {
    use super::*;

    #[test]
    fn test_truncated_packet() {
        assert_snapshot!(
            DecodeError::truncated(296, 64).to_string(),
            @"Truncated packet: expected at least 296 bytes, got 64"
        );
    }

    #[test]
    fn test_invalid_magic() {
        assert_snapshot!(
            DecodeError::invalid_magic(0x4737_5330, 0x1234_5678).to_string(),
            @"Invalid packet magic: expected 0x47375330, got 0x12345678"
        );
    }
}

mod wrapped_error_snapshots {
    use super::*;

    #[test]
    fn test_wrapped_decode() {
        let err: TelemetryError = DecodeError::truncated(296, 0).into();
        assert_snapshot!(
            err.to_string(),
            @"Decode error: Truncated packet: expected at least 296 bytes, got 0"
        );
    }

    #[test]
    fn test_wrapped_listener() {
        let err: TelemetryError = ListenerError::ThreadPanicked.into();
        assert_snapshot!(err.to_string(), @"Listener error: Listener thread panicked");
    }

    #[test]
    fn test_wrapped_sink() {
        let err: TelemetryError = SinkError::Closed("database".to_string()).into();
        assert_snapshot!(err.to_string(), @"Sink error: Sink 'database' is closed");
    }

    #[test]
    fn test_wrapped_config() {
        let err: TelemetryError = ConfigError::invalid("sampling_frequency_hz", "must be > 0").into();
        assert_snapshot!(
            err.to_string(),
            @"Configuration error: Invalid config value for 'sampling_frequency_hz': must be > 0"
        );
    }
}

#[test]
fn test_severity_display() {
    assert_snapshot!(ErrorSeverity::Critical.to_string(), @"CRITICAL");
}
