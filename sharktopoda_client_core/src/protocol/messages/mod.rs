//! Type-safe message definitions for the Sharktopoda protocol
//!
//! This module provides strongly-typed representations of every command the
//! client can send, the responses the player returns, the commands the player
//! may push to the client, and the models they carry.

pub mod command;
pub mod frame;
pub mod localization;
pub mod player;
pub mod response;
pub mod video;

pub use command::{Command, FrameDirection};
pub use frame::FrameCapture;
pub use localization::Localization;
pub use player::PlayerCommand;
pub use response::Response;
pub use video::{PlayStatus, PlayerState, VideoInfo};

use crate::protocol::error::{ProtocolError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Every message tag used on the wire, in `command` and `response` fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Connect,
    Open,
    OpenDone,
    Close,
    Show,
    RequestInformation,
    RequestAllInformation,
    Play,
    Pause,
    RequestPlayerState,
    SeekElapsedTime,
    FrameAdvance,
    FrameCapture,
    FrameCaptureDone,
    AddLocalizations,
    RemoveLocalizations,
    UpdateLocalizations,
    ClearLocalizations,
    SelectLocalizations,
    Ping,
}

impl MessageKind {
    /// All message kinds
    pub const ALL: [MessageKind; 20] = [
        MessageKind::Connect,
        MessageKind::Open,
        MessageKind::OpenDone,
        MessageKind::Close,
        MessageKind::Show,
        MessageKind::RequestInformation,
        MessageKind::RequestAllInformation,
        MessageKind::Play,
        MessageKind::Pause,
        MessageKind::RequestPlayerState,
        MessageKind::SeekElapsedTime,
        MessageKind::FrameAdvance,
        MessageKind::FrameCapture,
        MessageKind::FrameCaptureDone,
        MessageKind::AddLocalizations,
        MessageKind::RemoveLocalizations,
        MessageKind::UpdateLocalizations,
        MessageKind::ClearLocalizations,
        MessageKind::SelectLocalizations,
        MessageKind::Ping,
    ];

    /// Wire tag for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Connect => "connect",
            MessageKind::Open => "open",
            MessageKind::OpenDone => "open done",
            MessageKind::Close => "close",
            MessageKind::Show => "show",
            MessageKind::RequestInformation => "request information",
            MessageKind::RequestAllInformation => "request all information",
            MessageKind::Play => "play",
            MessageKind::Pause => "pause",
            MessageKind::RequestPlayerState => "request player state",
            MessageKind::SeekElapsedTime => "seek elapsed time",
            MessageKind::FrameAdvance => "frame advance",
            MessageKind::FrameCapture => "frame capture",
            MessageKind::FrameCaptureDone => "frame capture done",
            MessageKind::AddLocalizations => "add localizations",
            MessageKind::RemoveLocalizations => "remove localizations",
            MessageKind::UpdateLocalizations => "update localizations",
            MessageKind::ClearLocalizations => "clear localizations",
            MessageKind::SelectLocalizations => "select localizations",
            MessageKind::Ping => "ping",
        }
    }

    /// Whether resending a command of this kind cannot change the player's state
    pub fn is_idempotent(&self) -> bool {
        matches!(
            self,
            MessageKind::RequestInformation
                | MessageKind::RequestAllInformation
                | MessageKind::RequestPlayerState
                | MessageKind::Ping
        )
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        MessageKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ProtocolError::decoding(format!("Unrecognized message tag: '{s}'")))
    }
}

impl Serialize for MessageKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MessageKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        tag.parse().map_err(serde::de::Error::custom)
    }
}

/// Outcome reported by the player in every response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Failed,
}

impl Status {
    pub fn is_ok(&self) -> bool {
        matches!(self, Status::Ok)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ok => f.write_str("ok"),
            Status::Failed => f.write_str("failed"),
        }
    }
}
