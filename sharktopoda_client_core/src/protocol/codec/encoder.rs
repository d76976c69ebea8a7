//! Message encoder for the Sharktopoda protocol
//!
//! Serializes outbound messages into single-datagram JSON payloads.

use crate::protocol::error::{ProtocolError, Result};
use bytes::{BufMut, Bytes, BytesMut};
use log::{debug, trace};
use serde::Serialize;

const INITIAL_CAPACITY: usize = 256;

/// Encoder for outbound datagrams
#[derive(Debug, Clone)]
pub struct Encoder {
    max_size: usize,
}

impl Encoder {
    /// Create an encoder limited to one UDP datagram
    pub fn new() -> Self {
        Self::with_max_size(crate::protocol::MAX_DATAGRAM_SIZE)
    }

    pub fn with_max_size(max_size: usize) -> Self {
        Self { max_size }
    }

    /// Encode a message as a compact JSON object
    pub fn encode<T: Serialize + ?Sized>(&self, message: &T) -> Result<Bytes> {
        let mut writer = BytesMut::with_capacity(INITIAL_CAPACITY).writer();
        serde_json::to_writer(&mut writer, message)
            .map_err(|e| ProtocolError::encoding(format!("JSON serialization failed: {e}")))?;
        let encoded = writer.into_inner().freeze();

        if encoded.first() != Some(&b'{') {
            return Err(ProtocolError::encoding("Message is not a JSON object"));
        }

        if encoded.len() > self.max_size {
            debug!(
                "Message too large: {} bytes (max: {})",
                encoded.len(),
                self.max_size
            );
            return Err(ProtocolError::packet_too_large(encoded.len(), self.max_size));
        }

        debug!("Encoded {} bytes", encoded.len());
        trace!(
            "Encoded datagram: {}",
            String::from_utf8_lossy(&encoded[..encoded.len().min(200)])
        );
        Ok(encoded)
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}
