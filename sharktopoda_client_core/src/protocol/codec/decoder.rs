//! Message decoder for the Sharktopoda protocol
//!
//! Classifies each inbound datagram as either a response to one of our
//! commands or a command pushed by the player.

use crate::protocol::error::{ProtocolError, Result};
use crate::protocol::messages::{PlayerCommand, Response};
use log::{debug, trace, warn};
use serde_json::Value;

/// A decoded inbound datagram
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Response(Response),
    Command(PlayerCommand),
}

/// Decoder for inbound datagrams
#[derive(Debug, Clone)]
pub struct Decoder {
    max_size: usize,
}

impl Decoder {
    pub fn new() -> Self {
        Self::with_max_size(crate::protocol::MAX_DATAGRAM_SIZE)
    }

    pub fn with_max_size(max_size: usize) -> Self {
        Self { max_size }
    }

    /// Decode one datagram
    pub fn decode(&self, data: &[u8]) -> Result<Inbound> {
        trace!("Decoder::decode called with {} bytes", data.len());

        if data.is_empty() {
            return Err(ProtocolError::decoding("Empty datagram"));
        }
        if data.len() > self.max_size {
            return Err(ProtocolError::packet_too_large(data.len(), self.max_size));
        }

        let text = std::str::from_utf8(data).map_err(|e| {
            warn!("Invalid UTF-8 sequence: {e}");
            ProtocolError::decoding(format!("Invalid UTF-8: {e}"))
        })?;

        let value: Value = serde_json::from_str(text)
            .map_err(|e| ProtocolError::decoding(format!("Invalid JSON: {e}")))?;

        let Value::Object(object) = &value else {
            return Err(ProtocolError::decoding("Datagram is not a JSON object"));
        };

        // Player commands take precedence when both tags are present
        if object.contains_key("command") {
            let command: PlayerCommand = serde_json::from_value(value)
                .map_err(|e| ProtocolError::decoding(format!("Invalid player command: {e}")))?;
            debug!("Decoded player command '{}'", command.kind());
            Ok(Inbound::Command(command))
        } else if object.contains_key("response") {
            let response: Response = serde_json::from_value(value)
                .map_err(|e| ProtocolError::decoding(format!("Invalid response: {e}")))?;
            debug!(
                "Decoded '{}' response with status {}",
                response.kind, response.status
            );
            Ok(Inbound::Response(response))
        } else {
            Err(ProtocolError::decoding(
                "Datagram carries neither 'command' nor 'response'",
            ))
        }
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::{MessageKind, Status};

    #[test]
    fn test_decode_response() {
        let decoder = Decoder::new();
        let inbound = decoder
            .decode(br#"{"response":"pause","status":"ok","uuid":"b9f3b4e2-5c1d-4a4e-8f0e-2d1c3b4a5e6f"}"#)
            .unwrap();

        match inbound {
            Inbound::Response(response) => {
                assert_eq!(response.kind, MessageKind::Pause);
                assert_eq!(response.status, Status::Ok);
                assert!(response.uuid.is_some());
            }
            other => panic!("Expected response, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_player_command() {
        let decoder = Decoder::new();
        let inbound = decoder.decode(br#"{"command":"ping"}"#).unwrap();
        assert_eq!(inbound, Inbound::Command(PlayerCommand::Ping));
    }

    #[test]
    fn test_decode_errors() {
        let decoder = Decoder::new();
        let cases: Vec<&[u8]> = vec![
            b"",
            b"\xFF\xFE",
            b"not json",
            b"[1, 2, 3]",
            br#"{"status":"ok"}"#,
            br#"{"response":"pause"}"#,
            br#"{"response":"teleport","status":"ok"}"#,
            br#"{"command":"teleport"}"#,
            br#"{"response":"pause","status":"ok","uuid":"not-a-uuid"}"#,
        ];

        for data in cases {
            let result = decoder.decode(data);
            assert!(
                matches!(result, Err(ProtocolError::Decoding { .. })),
                "{:?} should fail to decode, got {result:?}",
                String::from_utf8_lossy(data)
            );
        }
    }

    #[test]
    fn test_decode_oversized() {
        let decoder = Decoder::with_max_size(16);
        let result = decoder.decode(br#"{"response":"pause","status":"ok"}"#);
        assert!(matches!(result, Err(ProtocolError::PacketTooLarge { .. })));
    }

    #[test]
    fn test_decode_keeps_unknown_fields() {
        let decoder = Decoder::new();
        let inbound = decoder
            .decode(br#"{"response":"request player state","status":"ok","state":"paused","rate":0.0}"#)
            .unwrap();
        let Inbound::Response(response) = inbound else {
            panic!("Expected response");
        };
        assert_eq!(response.payload["state"], "paused");
    }
}
