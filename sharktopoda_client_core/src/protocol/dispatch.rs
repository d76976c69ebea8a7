//! Inbound datagram dispatch
//!
//! Runs on the receive loop. Responses go to the correlator; player commands
//! are acknowledged and published; anything else is reported and dropped.

use crate::protocol::codec::{Codec, Inbound};
use crate::protocol::correlation::Correlator;
use crate::protocol::messages::{PlayerCommand, Response};
use crate::protocol::transport::DatagramHandler;
use bytes::Bytes;
use log::{debug, trace, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Something the player did that no call was waiting for
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// The player pushed a command; it has already been acknowledged
    PlayerCommand(PlayerCommand),
    /// A response arrived that matched no outstanding call
    Unmatched(Response),
    /// A datagram could not be decoded
    Malformed { from: SocketAddr, error: String },
}

/// Routes decoded datagrams
pub struct Dispatcher {
    codec: Codec,
    correlator: Arc<Correlator>,
    events: broadcast::Sender<ClientEvent>,
}

impl Dispatcher {
    pub fn new(
        codec: Codec,
        correlator: Arc<Correlator>,
        events: broadcast::Sender<ClientEvent>,
    ) -> Self {
        Self {
            codec,
            correlator,
            events,
        }
    }

    fn publish(&self, event: ClientEvent) {
        if self.events.send(event).is_err() {
            trace!("No event subscribers");
        }
    }

    fn on_command(&self, command: PlayerCommand) -> Option<Bytes> {
        let kind = command.kind();
        debug!("Player sent '{kind}'");

        if !matches!(command, PlayerCommand::Ping) {
            self.publish(ClientEvent::PlayerCommand(command));
        }

        match self.codec.encode_ack(kind) {
            Ok(ack) => Some(ack),
            Err(e) => {
                warn!("Failed to encode '{kind}' acknowledgement: {e}");
                None
            }
        }
    }

    fn on_response(&self, response: Response) {
        if let Err(response) = self.correlator.resolve(response) {
            warn!(
                "Unmatched '{}' response (status {})",
                response.kind, response.status
            );
            self.publish(ClientEvent::Unmatched(response));
        }
    }
}

impl DatagramHandler for Dispatcher {
    fn handle(&self, datagram: &[u8], from: SocketAddr) -> Option<Bytes> {
        match self.codec.decode(datagram) {
            Ok(Inbound::Response(response)) => {
                self.on_response(response);
                None
            }
            Ok(Inbound::Command(command)) => self.on_command(command),
            Err(e) => {
                warn!("Discarding malformed datagram from {from}: {e}");
                self.publish(ClientEvent::Malformed {
                    from,
                    error: e.to_string(),
                });
                None
            }
        }
    }
}
