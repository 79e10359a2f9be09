//! Error types for memtext
//!
//! Expected protocol outcomes (a missing key, a stale cas token, a refused
//! store) are not errors; they come back as `Ok` values from the client.
//! Everything here means the call could not be completed.

use thiserror::Error;

/// Result type alias using McError
pub type Result<T> = std::result::Result<T, McError>;

/// Unified error type for memtext operations
#[derive(Debug, Error)]
pub enum McError {
    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("Transport error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    /// The reply could not be framed or was not valid for the command.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The server answered `ERROR`, `CLIENT_ERROR ..` or `SERVER_ERROR ..`.
    /// The reply was framed correctly, so the connection stays usable.
    #[error("Server error: {0}")]
    Server(String),

    // -------------------------------------------------------------------------
    // Request Validation Errors
    // -------------------------------------------------------------------------
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Value too large: {size} bytes (max {max})")]
    ValueTooLarge { size: usize, max: usize },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl McError {
    /// True for both flavors of protocol-level failure: a bad reply line or
    /// a well-framed error reply.
    pub fn is_protocol(&self) -> bool {
        matches!(self, McError::Protocol(_) | McError::Server(_))
    }

    /// True for failures that leave the connection in an unknown framing
    /// state. The connection should be dropped after one of these.
    pub fn is_fatal(&self) -> bool {
        match self {
            McError::Io(_) | McError::Protocol(_) => true,
            McError::Server(_)
            | McError::InvalidKey(_)
            | McError::ValueTooLarge { .. }
            | McError::Config(_) => false,
        }
    }
}
