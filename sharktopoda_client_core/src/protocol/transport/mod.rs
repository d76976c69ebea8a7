//! Transport layer for UDP communication
//!
//! This module handles the UDP endpoint, connection state management, and the
//! background receive loop that hands inbound datagrams to a
//! [`DatagramHandler`].

mod connection;
mod socket;
mod state;

pub use connection::Connection;
pub use socket::{TransportStats, UdpEndpoint};
pub use state::{ConnectionState, StateTransition};

use crate::protocol::error::{ProtocolError, Result};
use bytes::Bytes;
use log::{debug, trace, warn};
use parking_lot::RwLock;
use socket::Counters;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Receives every datagram accepted by the receive loop
///
/// Returning `Some` sends the bytes back to the datagram's source.
pub trait DatagramHandler: Send + Sync + 'static {
    fn handle(&self, datagram: &[u8], from: SocketAddr) -> Option<Bytes>;
}

/// Transport layer configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Where the player listens for commands
    pub player_addr: SocketAddr,
    /// Local address to bind; the player sends its own commands here
    pub local_addr: SocketAddr,
    /// Write timeout for sending datagrams
    pub write_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            player_addr: SocketAddr::new(
                IpAddr::V4(Ipv4Addr::LOCALHOST),
                crate::protocol::DEFAULT_PLAYER_PORT,
            ),
            local_addr: SocketAddr::new(
                IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                crate::protocol::DEFAULT_LOCAL_PORT,
            ),
            write_timeout: Duration::from_secs(1),
        }
    }
}

/// Main transport interface
///
/// The socket lives in a slot that [`release`](Transport::release) empties,
/// so closing the connection frees the local port even while other handles to
/// the transport remain.
pub struct Transport {
    endpoint: RwLock<Option<Arc<UdpEndpoint>>>,
    counters: Arc<Counters>,
    state: RwLock<ConnectionState>,
    config: TransportConfig,
}

impl Transport {
    /// Bind the local endpoint; the transport starts `Closed`
    pub async fn bind(config: TransportConfig) -> Result<Self> {
        debug!("Creating new transport with config: {config:?}");

        let endpoint = UdpEndpoint::bind(config.local_addr).await?;
        debug!("Bound UDP endpoint on {}", endpoint.local_addr()?);

        Ok(Self {
            counters: endpoint.counters(),
            endpoint: RwLock::new(Some(Arc::new(endpoint))),
            state: RwLock::new(ConnectionState::Closed),
            config,
        })
    }

    fn endpoint(&self) -> Result<Arc<UdpEndpoint>> {
        self.endpoint
            .read()
            .clone()
            .ok_or(ProtocolError::NotConnected)
    }

    /// Drop the socket; returns false if it was already released
    ///
    /// The port is free once in-flight sends holding the endpoint finish.
    pub(crate) fn release(&self) -> bool {
        let released = self.endpoint.write().take().is_some();
        if released {
            debug!("Released UDP endpoint");
        }
        released
    }

    pub fn is_released(&self) -> bool {
        self.endpoint.read().is_none()
    }

    /// Get the current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Update the connection state
    pub fn set_state(&self, new_state: ConnectionState) -> Result<()> {
        let mut state = self.state.write();
        let transition = StateTransition::new(*state, new_state);

        match transition.validation_error() {
            None => {
                debug!("Connection state {} -> {new_state}", *state);
                *state = new_state;
                Ok(())
            }
            Some(message) => Err(ProtocolError::invalid_state(message)),
        }
    }

    /// Send a datagram to the player
    pub async fn send(&self, data: &[u8]) -> Result<()> {
        let state = self.state();
        if !state.can_send() {
            warn!("Cannot send in current state: {state}");
            return Err(ProtocolError::NotConnected);
        }

        self.send_to(data, self.config.player_addr).await
    }

    /// Send a datagram to an arbitrary peer, used for replies
    pub async fn send_to(&self, data: &[u8], target: SocketAddr) -> Result<()> {
        trace!("Transport::send_to called with {} bytes", data.len());
        let endpoint = self.endpoint()?;

        timeout(self.config.write_timeout, endpoint.send_to(data, target))
            .await
            .map_err(|_| {
                warn!("Send timeout after {:?}", self.config.write_timeout);
                ProtocolError::WriteTimeout(self.config.write_timeout)
            })??;

        debug!("Sent {} bytes to {target}", data.len());
        Ok(())
    }

    /// Receive one datagram from any peer
    pub async fn recv(&self, buffer: &mut [u8]) -> Result<(usize, SocketAddr)> {
        let endpoint = self.endpoint()?;
        let (size, from) = endpoint.recv_from(buffer).await?;
        trace!("Received {size} bytes from {from}");
        Ok((size, from))
    }

    /// Whether a datagram from `from` may be processed
    ///
    /// Only the player's host is trusted. The source port is not checked since
    /// the player replies from whichever socket it likes.
    pub fn accepts(&self, from: SocketAddr) -> bool {
        let player = self.config.player_addr.ip();
        let source = from.ip();

        player.is_unspecified()
            || source == player
            || (source.is_loopback() && player.is_loopback())
            || source.to_canonical() == player.to_canonical()
    }

    pub(crate) fn record_ignored(&self) {
        self.counters.record_ignored();
    }

    /// Bound local address; fails once the socket is released
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.endpoint()?.local_addr()
    }

    pub fn player_addr(&self) -> SocketAddr {
        self.config.player_addr
    }

    /// Counters survive the socket, so they stay readable after close
    pub fn stats(&self) -> TransportStats {
        self.counters.snapshot()
    }
}
