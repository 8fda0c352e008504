//! Per-datagram decode errors.
//!
//! These are produced on the receive path once per malformed datagram:
//! - `Copy` semantics (no heap allocations)
//! - Numeric payload only
//! - Always recoverable; the caller drops the packet and keeps listening

use core::fmt;

use crate::common::ErrorSeverity;

/// Failure to turn a raw datagram into a telemetry packet.
///
/// # Examples
///
/// ```
/// use gt7_telemetry_errors::{DecodeError, ErrorSeverity};
///
/// let err = DecodeError::truncated(296, 100);
/// assert_eq!(err.code(), 1);
/// assert_eq!(err.severity(), ErrorSeverity::Warning);
/// assert!(err.to_string().contains("100"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeError {
    /// Buffer shorter than the fixed packet layout.
    TruncatedPacket {
        /// Minimum byte count for the layout
        expected: usize,
        /// Bytes actually received
        actual: usize,
    },
    /// Decryption produced a buffer whose signature does not match.
    InvalidMagic {
        /// Signature every valid packet carries
        expected: u32,
        /// Signature recovered from the datagram
        actual: u32,
    },
}

impl DecodeError {
    /// Shorthand for [`DecodeError::TruncatedPacket`].
    pub const fn truncated(expected: usize, actual: usize) -> Self {
        DecodeError::TruncatedPacket { expected, actual }
    }

    /// Shorthand for [`DecodeError::InvalidMagic`].
    pub const fn invalid_magic(expected: u32, actual: u32) -> Self {
        DecodeError::InvalidMagic { expected, actual }
    }

    /// Stable numeric code, suitable for counters.
    pub const fn code(self) -> u8 {
        match self {
            DecodeError::TruncatedPacket { .. } => 1,
            DecodeError::InvalidMagic { .. } => 2,
        }
    }

    /// Get the error severity.
    pub fn severity(self) -> ErrorSeverity {
        ErrorSeverity::Warning
    }

    /// Decode failures never stop ingestion.
    pub fn is_recoverable(self) -> bool {
        true
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::TruncatedPacket { expected, actual } => write!(
                f,
                "Truncated packet: expected at least {expected} bytes, got {actual}"
            ),
            DecodeError::InvalidMagic { expected, actual } => write!(
                f,
                "Invalid packet magic: expected 0x{expected:08X}, got 0x{actual:08X}"
            ),
        }
    }
}

impl std::error::Error for DecodeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_codes() {
        assert_eq!(DecodeError::truncated(296, 0).code(), 1);
        assert_eq!(DecodeError::invalid_magic(1, 2).code(), 2);
    }

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::invalid_magic(0x4737_5330, 0xDEAD_BEEF);
        assert_eq!(
            err.to_string(),
            "Invalid packet magic: expected 0x47375330, got 0xDEADBEEF"
        );
    }

    #[test]
    fn test_decode_error_is_recoverable() {
        assert!(DecodeError::truncated(296, 12).is_recoverable());
    }

    #[test]
    fn test_decode_error_copy() {
        fn assert_copy<T: Copy>() {}
        assert_copy::<DecodeError>();
    }
}
