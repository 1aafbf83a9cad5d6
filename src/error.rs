//! Custom error types for the capture pipeline.
//!
//! This module defines the primary error type, `MeaError`, for the entire
//! crate. Using the `thiserror` crate, it consolidates the failure classes a
//! capture session can hit:
//!
//! - **`Configuration`**: semantic errors in the capture configuration, caught
//!   eagerly at construction (invalid frame count, source id out of range,
//!   pre-existing destination).
//! - **`Connection`**: websocket transport or handshake failure against the
//!   streaming endpoint. Fatal to the session; no reconnect is attempted.
//! - **`Decode`**: an inbound payload whose length does not match one full
//!   32-channel snapshot.
//! - **`ServiceUnavailable`**: the liveness probe reported the service offline.
//! - **`Transport`**: HTTP failure while querying the status endpoints.
//! - **`Cancelled`**: the session was cancelled from outside; raised only
//!   after teardown has completed.
//!
//! With `#[from]` conversions, `MeaError` composes with the `?` operator
//! throughout the crate. The binary wraps it in `anyhow` at the very top.

use thiserror::Error;

use crate::sample::FRAME_BYTES;

/// Convenience alias for results using the crate error type.
pub type MeaResult<T> = std::result::Result<T, MeaError>;

/// Failure classes of a capture session.
#[derive(Error, Debug)]
pub enum MeaError {
    /// Invalid configuration value, rejected before any side effect.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Websocket transport or handshake failure.
    #[error("Connection error: {0}")]
    Connection(#[from] tokio_tungstenite::tungstenite::Error),

    /// Inbound payload does not hold exactly one 32x4096 f32 snapshot.
    #[error("Malformed payload: expected {FRAME_BYTES} bytes, got {actual}")]
    Decode {
        /// Length of the offending payload.
        actual: usize,
    },

    /// The liveness probe reported the service offline.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// HTTP failure while querying a status endpoint.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// File or network I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Storage backend failure while persisting or reading a capture.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A storage backend was requested without its compile-time feature.
    #[error("Feature '{0}' is not enabled. Please build with --features {0}")]
    FeatureNotEnabled(String),

    /// The session was cancelled from outside; teardown has already run.
    #[error("Capture session cancelled")]
    Cancelled,

    /// A spawned task panicked or was aborted before it could resolve.
    #[error("Task failed to resolve: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_names_expected_length() {
        let err = MeaError::Decode { actual: 12 };
        let msg = err.to_string();
        assert!(msg.contains("524288"));
        assert!(msg.contains("12"));
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: MeaError = io.into();
        assert!(matches!(err, MeaError::Io(_)));
    }
}
