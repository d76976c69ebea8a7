//! Connection state management
//!
//! This module implements the state machine for the client's UDP endpoint:
//!
//! ```text
//! Closed -> Open -> Connected
//!             \        |
//!              v       v
//!              Closing -> Closed
//! ```

use std::fmt;

/// Lifecycle state of the client endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket bound
    Closed,
    /// Socket bound and receiving, `connect` not yet acknowledged
    Open,
    /// The player acknowledged `connect` and may push commands to us
    Connected,
    /// Shutdown in progress
    Closing,
}

impl ConnectionState {
    /// Check if commands may be sent in this state
    pub fn can_send(&self) -> bool {
        matches!(self, ConnectionState::Open | ConnectionState::Connected)
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// Check if the endpoint has been shut down or is shutting down
    pub fn is_closed(&self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Closing)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Closed => write!(f, "Closed"),
            ConnectionState::Open => write!(f, "Open"),
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::Closing => write!(f, "Closing"),
        }
    }
}

/// State transition validator
pub struct StateTransition {
    from: ConnectionState,
    to: ConnectionState,
}

impl StateTransition {
    pub fn new(from: ConnectionState, to: ConnectionState) -> Self {
        Self { from, to }
    }

    /// Check if the transition is allowed by the state machine
    pub fn is_valid(&self) -> bool {
        use ConnectionState::*;

        matches!(
            (self.from, self.to),
            (Closed, Open)
                | (Open, Connected)
                | (Open, Closing)
                | (Connected, Closing)
                | (Closing, Closed)
        )
    }

    /// Get a description of why a transition is invalid
    pub fn validation_error(&self) -> Option<String> {
        if self.is_valid() {
            None
        } else {
            Some(format!(
                "Invalid transition from {} to {}",
                self.from, self.to
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_capabilities() {
        assert!(!ConnectionState::Closed.can_send());
        assert!(ConnectionState::Open.can_send());
        assert!(ConnectionState::Connected.can_send());
        assert!(!ConnectionState::Closing.can_send());

        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Open.is_connected());

        assert!(ConnectionState::Closed.is_closed());
        assert!(ConnectionState::Closing.is_closed());
        assert!(!ConnectionState::Open.is_closed());
    }

    #[test]
    fn test_valid_transitions() {
        use ConnectionState::*;

        let valid = [
            (Closed, Open),
            (Open, Connected),
            (Open, Closing),
            (Connected, Closing),
            (Closing, Closed),
        ];
        for (from, to) in valid {
            let transition = StateTransition::new(from, to);
            assert!(transition.is_valid(), "{from} -> {to} should be valid");
            assert!(transition.validation_error().is_none());
        }
    }

    #[test]
    fn test_invalid_transitions() {
        use ConnectionState::*;

        let invalid = [
            (Closed, Connected),
            (Closed, Closing),
            (Connected, Open),
            (Connected, Closed),
            (Closing, Open),
            (Open, Open),
        ];
        for (from, to) in invalid {
            let transition = StateTransition::new(from, to);
            assert!(!transition.is_valid(), "{from} -> {to} should be invalid");
            assert_eq!(
                transition.validation_error(),
                Some(format!("Invalid transition from {from} to {to}"))
            );
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(ConnectionState::Connected.to_string(), "Connected");
        assert_eq!(ConnectionState::Closing.to_string(), "Closing");
    }
}
