//! Connection management
//!
//! A [`Connection`] owns the transport and the background task that reads
//! datagrams from it. Closing the connection stops the task, releases the
//! socket and moves the state machine back to `Closed`.

use crate::protocol::error::{ProtocolError, Result};
use crate::protocol::transport::{ConnectionState, DatagramHandler, Transport, TransportConfig};
use log::{debug, trace, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Largest payload a UDP datagram can carry, plus headroom to detect truncation
const RECV_BUFFER_SIZE: usize = 65_536;

/// Pause after a socket receive error before reading again
const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Transport plus its receive loop
pub struct Connection {
    transport: Arc<Transport>,
    shutdown: watch::Sender<bool>,
    receiver: Mutex<Option<JoinHandle<()>>>,
    /// Held for the whole teardown so concurrent closes wait for each other
    closing: tokio::sync::Mutex<()>,
}

impl Connection {
    /// Bind the transport and start receiving
    pub async fn open(config: TransportConfig, handler: Arc<dyn DatagramHandler>) -> Result<Self> {
        debug!("Opening connection to {}", config.player_addr);
        let transport = Arc::new(Transport::bind(config).await?);
        transport.set_state(ConnectionState::Open)?;

        let (shutdown, shutdown_rx) = watch::channel(false);
        let receiver = tokio::spawn(receive_loop(transport.clone(), handler, shutdown_rx));

        debug!("Connection open on {}", transport.local_addr()?);
        Ok(Self {
            transport,
            shutdown,
            receiver: Mutex::new(Some(receiver)),
            closing: tokio::sync::Mutex::new(()),
        })
    }

    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }

    pub fn state(&self) -> ConnectionState {
        self.transport.state()
    }

    /// Record that the player acknowledged `connect`
    pub fn mark_connected(&self) -> Result<()> {
        if self.state().is_connected() {
            return Ok(());
        }
        self.transport.set_state(ConnectionState::Connected)
    }

    /// Send a datagram to the player
    pub async fn send(&self, data: &[u8]) -> Result<()> {
        self.transport.send(data).await
    }

    /// Stop the receive loop and release the socket
    ///
    /// Returns once the socket is released. Closing twice is a no-op, and a
    /// close racing another waits for the first to finish.
    pub async fn close(&self) -> Result<()> {
        let _closing = self.closing.lock().await;
        let state = self.state();
        if state.is_closed() {
            debug!("Connection already {state}");
            return Ok(());
        }

        self.transport.set_state(ConnectionState::Closing)?;
        // Receivers may already be gone if the loop exited on its own
        let _ = self.shutdown.send(true);

        let receiver = self.receiver.lock().take();
        if let Some(handle) = receiver
            && let Err(e) = handle.await
        {
            warn!("Receive loop ended abnormally: {e}");
        }

        self.transport.release();
        self.transport.set_state(ConnectionState::Closed)?;
        debug!("Connection closed");
        Ok(())
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(handle) = self.receiver.get_mut().take() {
            handle.abort();
        }
        self.transport.release();
    }
}

async fn receive_loop(
    transport: Arc<Transport>,
    handler: Arc<dyn DatagramHandler>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut buffer = vec![0u8; RECV_BUFFER_SIZE];
    debug!("Receive loop started");

    loop {
        tokio::select! {
            biased;

            _ = shutdown.changed() => {
                debug!("Receive loop stopping");
                break;
            }

            result = transport.recv(&mut buffer) => {
                match result {
                    Ok((size, from)) => {
                        if !transport.accepts(from) {
                            debug!("Ignoring {size} bytes from unexpected peer {from}");
                            transport.record_ignored();
                            continue;
                        }

                        trace!("Handling {size} bytes from {from}");
                        if let Some(reply) = handler.handle(&buffer[..size], from)
                            && let Err(e) = transport.send_to(&reply, from).await
                        {
                            warn!("Failed to reply to {from}: {e}");
                        }
                    }
                    Err(ProtocolError::NotConnected) => {
                        debug!("Socket released, receive loop stopping");
                        break;
                    }
                    Err(e) => {
                        // ICMP errors from earlier sends surface here on some platforms
                        warn!("Receive error: {e}");
                        tokio::time::sleep(RECV_ERROR_BACKOFF).await;
                    }
                }
            }
        }
    }
}
