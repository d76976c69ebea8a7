//! Protocol-specific error types
//!
//! This module defines error types for the Sharktopoda UDP protocol implementation.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Protocol-specific error types
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Caller input rejected before anything was sent
    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Outbound message could not be serialized
    #[error("Encoding error: {message}")]
    Encoding { message: String },

    /// Inbound datagram or payload could not be understood
    #[error("Decoding error: {message}")]
    Decoding { message: String },

    /// No matching response arrived before the deadline
    #[error("No response to '{command}' within {after:?}")]
    Timeout { command: String, after: Duration },

    /// Local socket failure
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// Writing a datagram took longer than the write timeout
    #[error("Send timeout after {0:?}")]
    WriteTimeout(Duration),

    /// Datagram too large for a single UDP packet
    #[error("Datagram size {size} exceeds maximum {max_size}")]
    PacketTooLarge { size: usize, max_size: usize },

    /// The player answered with a failure status
    #[error("Player rejected '{command}': {cause}")]
    Rejected { command: String, cause: String },

    /// A response arrived but did not carry what the command expects
    #[error("Unexpected response: expected {expected}, got {actual}")]
    UnexpectedResponse { expected: String, actual: String },

    /// Connection is not open
    #[error("Not connected to Sharktopoda")]
    NotConnected,

    /// Connection is already open or connected
    #[error("Already connected to Sharktopoda")]
    AlreadyConnected,

    /// The connection was shut down while the call was in flight
    #[error("Connection closed while waiting for '{command}'")]
    ConnectionClosed { command: String },

    /// Rejected connection state transition
    #[error("Invalid state transition: {message}")]
    InvalidState { message: String },

    /// Player host could not be resolved
    #[error("Failed to resolve '{address}': {reason}")]
    AddressResolution { address: String, reason: String },
}

impl ProtocolError {
    /// Create a validation error
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an encoding error
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Create a decoding error
    pub fn decoding(message: impl Into<String>) -> Self {
        Self::Decoding {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(command: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            command: command.into(),
            after,
        }
    }

    /// Create a packet too large error
    pub fn packet_too_large(size: usize, max_size: usize) -> Self {
        Self::PacketTooLarge { size, max_size }
    }

    /// Create a rejected error
    pub fn rejected(command: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::Rejected {
            command: command.into(),
            cause: cause.into(),
        }
    }

    /// Create an unexpected response error
    pub fn unexpected_response(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a connection closed error
    pub fn connection_closed(command: impl Into<String>) -> Self {
        Self::ConnectionClosed {
            command: command.into(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create an address resolution error
    pub fn address_resolution(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AddressResolution {
            address: address.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error is transient and the request can be resent
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Timeout { .. } | Self::WriteTimeout(_)
        )
    }

    /// Check if the command's effect on the player is unknown
    ///
    /// Validation and encoding failures never reach the wire; a rejection is a
    /// definite answer. Everything else leaves the outcome undetermined.
    pub fn outcome_unknown(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::Timeout { .. }
                | Self::WriteTimeout(_)
                | Self::ConnectionClosed { .. }
        )
    }
}
