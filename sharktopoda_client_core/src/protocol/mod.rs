//! Sharktopoda UDP Remote Protocol Implementation
//!
//! This module implements the Sharktopoda 2 remote control protocol with a modular architecture:
//! - `transport`: Low-level UDP socket management, connection state and the receive loop
//! - `codec`: JSON datagram encoding/decoding
//! - `messages`: Type-safe command, response and model definitions
//! - `correlation`: Matching inbound responses to in-flight requests
//! - `dispatch`: Routing of decoded inbound datagrams
//! - `client`: High-level command API with timeouts and bounded retries

pub mod client;
pub mod codec;
pub mod correlation;
pub mod dispatch;
pub mod error;
pub mod messages;
pub mod transport;

// Re-export main types
pub use client::{ClientStats, SharktopodaClient};
pub use correlation::{CorrelationKey, CorrelationStats, Correlator, PendingReply, RequestId};
pub use dispatch::ClientEvent;
pub use error::{ProtocolError, Result};
pub use messages::{Command, MessageKind, PlayerCommand, Response, Status};
pub use transport::{ConnectionState, Transport, TransportConfig, TransportStats};

/// Largest payload a single UDP datagram can carry over IPv4
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Default host of the Sharktopoda player
pub const DEFAULT_PLAYER_HOST: &str = "127.0.0.1";

/// Default UDP port the Sharktopoda player listens on
pub const DEFAULT_PLAYER_PORT: u16 = 8800;

/// Default local UDP port the client receives on
pub const DEFAULT_LOCAL_PORT: u16 = 8801;
