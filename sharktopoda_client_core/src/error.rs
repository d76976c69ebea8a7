//! Error types for the Sharktopoda client
//!
//! Protocol failures live in [`crate::protocol::error`]; configuration
//! failures in [`config`]. [`Error`] wraps both for callers that do not care
//! which layer failed.

use thiserror::Error;

pub mod config;

pub use self::config::ConfigError;
pub use crate::protocol::error::ProtocolError;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// Protocol, transport or player errors
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Configuration loading or validation errors
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    /// Check if retrying the operation could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Protocol(e) => e.is_transient(),
            Error::Config(_) => false,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Protocol(ProtocolError::Transport(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_protocol_error_conversion() {
        let err: Error = ProtocolError::timeout("ping", Duration::from_millis(100)).into();
        assert!(matches!(err, Error::Protocol(ProtocolError::Timeout { .. })));
        assert!(err.is_transient());
        assert_eq!(err.to_string(), "No response to 'ping' within 100ms");
    }

    #[test]
    fn test_config_error_conversion() {
        let err: Error = ConfigError::invalid("player_port", "must be non-zero").into();
        assert!(matches!(err, Error::Config(_)));
        assert!(!err.is_transient());
        assert!(err.to_string().contains("player_port"));
    }

    #[test]
    fn test_io_error_conversion() {
        let err: Error = std::io::Error::other("socket gone").into();
        assert!(matches!(err, Error::Protocol(ProtocolError::Transport(_))));
    }
}
