//! Low-level UDP socket operations
//!
//! This module wraps Tokio's `UdpSocket` with size checks and counters. The
//! socket is left unconnected: the player may answer from a different port
//! than the one we send to.

use crate::protocol::error::{ProtocolError, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::net::UdpSocket;

/// UDP endpoint with protocol-specific checks
pub struct UdpEndpoint {
    socket: UdpSocket,
    counters: Arc<Counters>,
}

/// Counters shared between an endpoint and its owner, so they outlive the socket
#[derive(Debug, Default)]
pub(crate) struct Counters {
    datagrams_sent: AtomicU64,
    datagrams_received: AtomicU64,
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
    send_errors: AtomicU64,
    receive_errors: AtomicU64,
    ignored_datagrams: AtomicU64,
}

impl Counters {
    pub(crate) fn record_ignored(&self) {
        self.ignored_datagrams.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> TransportStats {
        TransportStats {
            datagrams_sent: self.datagrams_sent.load(Ordering::Relaxed),
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            send_errors: self.send_errors.load(Ordering::Relaxed),
            receive_errors: self.receive_errors.load(Ordering::Relaxed),
            ignored_datagrams: self.ignored_datagrams.load(Ordering::Relaxed),
        }
    }
}

/// Transport statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TransportStats {
    pub datagrams_sent: u64,
    pub datagrams_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub send_errors: u64,
    pub receive_errors: u64,
    /// Datagrams dropped because they did not come from the player
    pub ignored_datagrams: u64,
}

impl UdpEndpoint {
    /// Bind a new endpoint
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self {
            socket,
            counters: Arc::default(),
        })
    }

    pub(crate) fn counters(&self) -> Arc<Counters> {
        Arc::clone(&self.counters)
    }

    /// Send one datagram
    pub async fn send_to(&self, data: &[u8], target: SocketAddr) -> Result<()> {
        if data.is_empty() {
            return Err(ProtocolError::encoding("Empty datagram"));
        }

        if data.len() > crate::protocol::MAX_DATAGRAM_SIZE {
            return Err(ProtocolError::packet_too_large(
                data.len(),
                crate::protocol::MAX_DATAGRAM_SIZE,
            ));
        }

        match self.socket.send_to(data, target).await {
            Ok(sent) if sent == data.len() => {
                self.counters.datagrams_sent.fetch_add(1, Ordering::Relaxed);
                self.counters
                    .bytes_sent
                    .fetch_add(sent as u64, Ordering::Relaxed);
                Ok(())
            }
            Ok(sent) => {
                self.counters.send_errors.fetch_add(1, Ordering::Relaxed);
                Err(ProtocolError::Transport(std::io::Error::other(format!(
                    "Partial send: {sent} of {} bytes",
                    data.len()
                ))))
            }
            Err(e) => {
                self.counters.send_errors.fetch_add(1, Ordering::Relaxed);
                Err(e.into())
            }
        }
    }

    /// Receive one datagram into `buffer`
    pub async fn recv_from(&self, buffer: &mut [u8]) -> Result<(usize, SocketAddr)> {
        match self.socket.recv_from(buffer).await {
            Ok((size, from)) => {
                self.counters
                    .datagrams_received
                    .fetch_add(1, Ordering::Relaxed);
                self.counters
                    .bytes_received
                    .fetch_add(size as u64, Ordering::Relaxed);
                Ok((size, from))
            }
            Err(e) => {
                self.counters.receive_errors.fetch_add(1, Ordering::Relaxed);
                Err(e.into())
            }
        }
    }

    /// Get transport statistics
    pub fn stats(&self) -> TransportStats {
        self.counters.snapshot()
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}
