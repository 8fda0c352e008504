//! UDP listener errors.
//!
//! Unlike decode errors these end the listener thread and are surfaced to the
//! owning process.

use crate::common::ErrorSeverity;

/// Socket and thread failures of the datagram listener.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// Binding the receive socket failed
    #[error("Failed to bind UDP socket on {address}: {source}")]
    Bind {
        /// Address the socket was bound to
        address: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Receiving from the socket failed with a non-transient error
    #[error("UDP receive failed: {0}")]
    Receive(#[source] std::io::Error),

    /// Applying socket options failed
    #[error("Failed to configure UDP socket: {0}")]
    Configure(#[source] std::io::Error),

    /// The receive thread could not be started
    #[error("Failed to spawn listener thread: {0}")]
    ThreadSpawn(#[source] std::io::Error),

    /// The receive thread panicked before returning
    #[error("Listener thread panicked")]
    ThreadPanicked,
}

impl ListenerError {
    /// Get the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ListenerError::Bind { .. } => ErrorSeverity::Critical,
            ListenerError::Receive(_) => ErrorSeverity::Critical,
            ListenerError::Configure(_) => ErrorSeverity::Error,
            ListenerError::ThreadSpawn(_) => ErrorSeverity::Critical,
            ListenerError::ThreadPanicked => ErrorSeverity::Critical,
        }
    }

    /// Create a bind error for the given address.
    pub fn bind(address: impl Into<String>, source: std::io::Error) -> Self {
        ListenerError::Bind {
            address: address.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_bind_error_mentions_address() {
        let err = ListenerError::bind(
            "0.0.0.0:33740",
            io::Error::new(io::ErrorKind::AddrInUse, "in use"),
        );
        assert!(err.to_string().contains("0.0.0.0:33740"));
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_listener_error_source_chain() {
        use std::error::Error;
        let err = ListenerError::Receive(io::Error::other("boom"));
        assert!(err.source().is_some());
    }
}
