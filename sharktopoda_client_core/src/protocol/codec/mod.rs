//! Message encoding and decoding
//!
//! This module handles the conversion between typed messages and datagram
//! payloads. Every message is exactly one JSON object in one datagram, so the
//! codec holds no buffering state and can be shared freely between tasks.

mod decoder;
mod encoder;

pub use decoder::{Decoder, Inbound};
pub use encoder::Encoder;

use crate::protocol::error::Result;
use crate::protocol::messages::{Command, MessageKind, Response};
use bytes::Bytes;
use log::debug;

/// Codec for Sharktopoda protocol messages
#[derive(Debug, Clone, Default)]
pub struct Codec {
    encoder: Encoder,
    decoder: Decoder,
}

impl Codec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode a command for the player
    pub fn encode_command(&self, command: &Command) -> Result<Bytes> {
        debug!("Codec encoding '{}' command", command.kind());
        self.encoder.encode(command)
    }

    /// Encode a response to a player-initiated command
    pub fn encode_response(&self, response: &Response) -> Result<Bytes> {
        self.encoder.encode(response)
    }

    /// Encode the `ok` acknowledgement for a player command
    pub fn encode_ack(&self, kind: MessageKind) -> Result<Bytes> {
        self.encode_response(&Response::ok(kind))
    }

    /// Decode one inbound datagram
    pub fn decode(&self, data: &[u8]) -> Result<Inbound> {
        debug!("Codec decoding {} bytes", data.len());
        self.decoder.decode(data)
    }
}
