//! Responses sent from the player to the client
//!
//! Every response names the command it answers in its `response` field and
//! reports a `status`. Failed responses may carry a `cause`. Anything else in
//! the object is command-specific payload and is kept verbatim.

use crate::protocol::error::{ProtocolError, Result};
use crate::protocol::messages::{MessageKind, Status};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A decoded response datagram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "response")]
    pub kind: MessageKind,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    /// Video the response refers to, when the player names one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Response {
    /// Successful response with no payload
    pub fn ok(kind: MessageKind) -> Self {
        Self {
            kind,
            status: Status::Ok,
            cause: None,
            uuid: None,
            payload: Map::new(),
        }
    }

    /// Failed response with a cause
    pub fn failed(kind: MessageKind, cause: impl Into<String>) -> Self {
        Self {
            kind,
            status: Status::Failed,
            cause: Some(cause.into()),
            uuid: None,
            payload: Map::new(),
        }
    }

    pub fn with_uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = Some(uuid);
        self
    }

    /// Add a payload field
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.payload.insert(name.into(), value);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }

    /// Turn a failed status into an error
    pub fn into_result(self) -> Result<Self> {
        match self.status {
            Status::Ok => Ok(self),
            Status::Failed => Err(ProtocolError::rejected(
                self.kind.as_str(),
                self.cause
                    .unwrap_or_else(|| "no cause given".to_string()),
            )),
        }
    }

    /// Deserialize the whole response body, `uuid` included, into a model
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T> {
        let mut fields = self.payload.clone();
        if let Some(uuid) = self.uuid {
            fields.insert("uuid".to_string(), Value::String(uuid.to_string()));
        }
        serde_json::from_value(Value::Object(fields)).map_err(|e| {
            ProtocolError::decoding(format!("Invalid '{}' payload: {e}", self.kind))
        })
    }

    /// Deserialize a single payload field
    pub fn field<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let value = self.payload.get(name).cloned().ok_or_else(|| {
            ProtocolError::decoding(format!("'{}' response is missing '{name}'", self.kind))
        })?;
        serde_json::from_value(value).map_err(|e| {
            ProtocolError::decoding(format!(
                "Invalid '{name}' in '{}' response: {e}",
                self.kind
            ))
        })
    }
}
