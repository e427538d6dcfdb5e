//! Error types for the chordbook client.

use thiserror::Error;

/// Errors from the tuner session controller.
#[derive(Debug, Error)]
pub enum TunerError {
    /// The duplex stream failed to open or closed unexpectedly.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Microphone access was refused or no usable input device exists.
    /// The platform audio layer does not distinguish the two.
    #[error("microphone unavailable: {0}")]
    PermissionDenied(String),

    /// An operation was attempted in a disallowed state, e.g. changing
    /// tuning while capturing. Rejected synchronously, no partial effects.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
}

/// Errors from the REST boundary.
#[derive(Debug, Error)]
pub enum ApiError {
    /// 401/403 from the backend; the token is missing, expired, or lacks
    /// the required role.
    #[error("not authorized: log in again or check your permissions")]
    Unauthorized,

    /// 404 from the backend.
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other non-success status.
    #[error("API error {0}: {1}")]
    Api(u16, String),

    /// Transport or JSON decoding failure.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}
