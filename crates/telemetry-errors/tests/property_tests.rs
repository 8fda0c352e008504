//! Property-based tests for error classification.

use gt7_telemetry_errors::{
    DecodeError, ErrorCategory, ErrorSeverity, ListenerError, SinkError, TelemetryError,
};
use proptest::prelude::*;

proptest! {
    #[test]
    fn test_truncated_display_carries_lengths(expected in 1usize..4096, actual in 0usize..4096) {
        let msg = DecodeError::truncated(expected, actual).to_string();
        prop_assert!(msg.contains(&expected.to_string()));
        prop_assert!(msg.contains(&actual.to_string()));
    }

    #[test]
    fn test_decode_errors_always_recoverable(expected in any::<u32>(), actual in any::<u32>()) {
        let err: TelemetryError = DecodeError::invalid_magic(expected, actual).into();
        prop_assert_eq!(err.category(), ErrorCategory::Decode);
        prop_assert!(err.is_recoverable());
    }

    #[test]
    fn test_error_severity_ordering(a in 0u8..=3, b in 0u8..=3) {
        let to_severity = |v: u8| match v {
            0 => ErrorSeverity::Info,
            1 => ErrorSeverity::Warning,
            2 => ErrorSeverity::Error,
            _ => ErrorSeverity::Critical,
        };
        prop_assert_eq!(a.cmp(&b), to_severity(a).cmp(&to_severity(b)));
    }

    #[test]
    fn test_sink_errors_never_critical(msg in ".{0,64}") {
        let err: TelemetryError = SinkError::database(msg).into();
        prop_assert_eq!(err.category(), ErrorCategory::Sink);
        prop_assert!(err.severity() < ErrorSeverity::Critical);
        prop_assert!(err.is_recoverable());
    }
}

#[test]
fn test_listener_panic_is_fatal() {
    let err: TelemetryError = ListenerError::ThreadPanicked.into();
    assert_eq!(err.category(), ErrorCategory::Network);
    assert_eq!(err.severity(), ErrorSeverity::Critical);
}
