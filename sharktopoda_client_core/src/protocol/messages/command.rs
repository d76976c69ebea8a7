//! Commands sent from the client to the player
//!
//! Each variant serializes to one JSON object tagged by `"command"`. Field
//! names follow the player's camelCase convention.

use crate::protocol::correlation::CorrelationKey;
use crate::protocol::error::{ProtocolError, Result};
use crate::protocol::messages::{Localization, MessageKind};
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::path::PathBuf;
use uuid::Uuid;

/// Direction for `frame advance`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDirection {
    Forward,
    Backward,
}

impl FrameDirection {
    /// Wire value: 1 for forward, -1 for backward
    pub fn as_i8(&self) -> i8 {
        match self {
            FrameDirection::Forward => 1,
            FrameDirection::Backward => -1,
        }
    }
}

impl Serialize for FrameDirection {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.as_i8())
    }
}

/// A command the client sends to the player
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all_fields = "camelCase")]
pub enum Command {
    /// Tell the player where to send its own commands
    #[serde(rename = "connect")]
    Connect {
        port: u16,
        #[serde(skip_serializing_if = "Option::is_none")]
        host: Option<String>,
    },
    #[serde(rename = "open")]
    Open { uuid: Uuid, url: String },
    #[serde(rename = "close")]
    Close { uuid: Uuid },
    /// Bring a video window to the front
    #[serde(rename = "show")]
    Show { uuid: Uuid },
    /// Information about the focused video
    #[serde(rename = "request information")]
    RequestInformation,
    #[serde(rename = "request all information")]
    RequestAllInformation,
    #[serde(rename = "play")]
    Play {
        uuid: Uuid,
        #[serde(skip_serializing_if = "Option::is_none")]
        rate: Option<f64>,
    },
    #[serde(rename = "pause")]
    Pause { uuid: Uuid },
    #[serde(rename = "request player state")]
    RequestPlayerState { uuid: Uuid },
    #[serde(rename = "seek elapsed time")]
    SeekElapsedTime { uuid: Uuid, elapsed_time_millis: i64 },
    #[serde(rename = "frame advance")]
    FrameAdvance {
        uuid: Uuid,
        direction: FrameDirection,
    },
    #[serde(rename = "frame capture")]
    FrameCapture {
        uuid: Uuid,
        image_location: PathBuf,
        image_reference_uuid: Uuid,
    },
    #[serde(rename = "add localizations")]
    AddLocalizations {
        uuid: Uuid,
        localizations: Vec<Localization>,
    },
    #[serde(rename = "remove localizations")]
    RemoveLocalizations {
        uuid: Uuid,
        localizations: Vec<Uuid>,
    },
    #[serde(rename = "update localizations")]
    UpdateLocalizations {
        uuid: Uuid,
        localizations: Vec<Localization>,
    },
    #[serde(rename = "clear localizations")]
    ClearLocalizations { uuid: Uuid },
    /// An empty list clears the selection
    #[serde(rename = "select localizations")]
    SelectLocalizations {
        uuid: Uuid,
        localizations: Vec<Uuid>,
    },
    #[serde(rename = "ping")]
    Ping,
}

impl Command {
    /// Message kind of this command and of its immediate response
    pub fn kind(&self) -> MessageKind {
        match self {
            Command::Connect { .. } => MessageKind::Connect,
            Command::Open { .. } => MessageKind::Open,
            Command::Close { .. } => MessageKind::Close,
            Command::Show { .. } => MessageKind::Show,
            Command::RequestInformation => MessageKind::RequestInformation,
            Command::RequestAllInformation => MessageKind::RequestAllInformation,
            Command::Play { .. } => MessageKind::Play,
            Command::Pause { .. } => MessageKind::Pause,
            Command::RequestPlayerState { .. } => MessageKind::RequestPlayerState,
            Command::SeekElapsedTime { .. } => MessageKind::SeekElapsedTime,
            Command::FrameAdvance { .. } => MessageKind::FrameAdvance,
            Command::FrameCapture { .. } => MessageKind::FrameCapture,
            Command::AddLocalizations { .. } => MessageKind::AddLocalizations,
            Command::RemoveLocalizations { .. } => MessageKind::RemoveLocalizations,
            Command::UpdateLocalizations { .. } => MessageKind::UpdateLocalizations,
            Command::ClearLocalizations { .. } => MessageKind::ClearLocalizations,
            Command::SelectLocalizations { .. } => MessageKind::SelectLocalizations,
            Command::Ping => MessageKind::Ping,
        }
    }

    /// Video this command targets, if any
    pub fn video_uuid(&self) -> Option<Uuid> {
        match self {
            Command::Open { uuid, .. }
            | Command::Close { uuid }
            | Command::Show { uuid }
            | Command::Play { uuid, .. }
            | Command::Pause { uuid }
            | Command::RequestPlayerState { uuid }
            | Command::SeekElapsedTime { uuid, .. }
            | Command::FrameAdvance { uuid, .. }
            | Command::FrameCapture { uuid, .. }
            | Command::AddLocalizations { uuid, .. }
            | Command::RemoveLocalizations { uuid, .. }
            | Command::UpdateLocalizations { uuid, .. }
            | Command::ClearLocalizations { uuid }
            | Command::SelectLocalizations { uuid, .. } => Some(*uuid),
            Command::Connect { .. }
            | Command::RequestInformation
            | Command::RequestAllInformation
            | Command::Ping => None,
        }
    }

    /// Key the immediate response is matched on
    pub fn correlation_key(&self) -> CorrelationKey {
        CorrelationKey::new(self.kind(), self.video_uuid())
    }

    /// Key of the second, asynchronous response some commands produce
    ///
    /// `open` is followed by `open done` once the video is loaded and
    /// `frame capture` by `frame capture done` once the image is written.
    pub fn completion_key(&self) -> Option<CorrelationKey> {
        match self {
            Command::Open { uuid, .. } => {
                Some(CorrelationKey::new(MessageKind::OpenDone, Some(*uuid)))
            }
            Command::FrameCapture { uuid, .. } => Some(CorrelationKey::new(
                MessageKind::FrameCaptureDone,
                Some(*uuid),
            )),
            _ => None,
        }
    }

    pub fn is_idempotent(&self) -> bool {
        self.kind().is_idempotent()
    }

    /// Check arguments before anything is sent
    pub fn validate(&self) -> Result<()> {
        match self {
            Command::Connect { port, host } => {
                if *port == 0 {
                    return Err(ProtocolError::validation(
                        "port",
                        "callback port must be non-zero",
                    ));
                }
                if let Some(host) = host
                    && host.trim().is_empty()
                {
                    return Err(ProtocolError::validation(
                        "host",
                        "callback host must not be blank",
                    ));
                }
            }
            Command::Open { url, .. } => {
                if url.trim().is_empty() {
                    return Err(ProtocolError::validation("url", "must not be empty"));
                }
            }
            Command::Play {
                rate: Some(rate), ..
            } => {
                if !rate.is_finite() || *rate == 0.0 {
                    return Err(ProtocolError::validation(
                        "rate",
                        format!("{rate} is not a usable playback rate"),
                    ));
                }
            }
            Command::SeekElapsedTime {
                elapsed_time_millis,
                ..
            } => {
                if *elapsed_time_millis < 0 {
                    return Err(ProtocolError::validation(
                        "elapsed_time_millis",
                        format!("{elapsed_time_millis} is negative"),
                    ));
                }
            }
            Command::FrameCapture { image_location, .. } => {
                if image_location.as_os_str().is_empty() {
                    return Err(ProtocolError::validation(
                        "image_location",
                        "must not be empty",
                    ));
                }
                if !image_location.is_absolute() {
                    return Err(ProtocolError::validation(
                        "image_location",
                        format!("{} is not an absolute path", image_location.display()),
                    ));
                }
            }
            Command::AddLocalizations { localizations, .. }
            | Command::UpdateLocalizations { localizations, .. } => {
                if localizations.is_empty() {
                    return Err(ProtocolError::validation(
                        "localizations",
                        "at least one localization is required",
                    ));
                }
                for localization in localizations {
                    localization.validate()?;
                }
                ensure_unique(localizations.iter().map(|l| l.uuid))?;
            }
            Command::RemoveLocalizations { localizations, .. } => {
                if localizations.is_empty() {
                    return Err(ProtocolError::validation(
                        "localizations",
                        "at least one localization uuid is required",
                    ));
                }
                ensure_unique(localizations.iter().copied())?;
            }
            Command::SelectLocalizations { localizations, .. } => {
                ensure_unique(localizations.iter().copied())?;
            }
            _ => {}
        }
        Ok(())
    }
}

fn ensure_unique(uuids: impl Iterator<Item = Uuid>) -> Result<()> {
    let mut seen = HashSet::new();
    for uuid in uuids {
        if !seen.insert(uuid) {
            return Err(ProtocolError::validation(
                "localizations",
                format!("{uuid} appears more than once"),
            ));
        }
    }
    Ok(())
}
