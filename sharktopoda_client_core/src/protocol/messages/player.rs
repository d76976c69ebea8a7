//! Commands the player pushes to the client
//!
//! After `connect`, the player may report user edits made in its own UI. The
//! client answers each with an `ok` response of the same name.

use crate::protocol::messages::{Localization, MessageKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A player-initiated command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all_fields = "camelCase")]
pub enum PlayerCommand {
    /// Liveness probe
    #[serde(rename = "ping")]
    Ping,
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
    #[serde(rename = "select localizations")]
    SelectLocalizations {
        uuid: Uuid,
        localizations: Vec<Uuid>,
    },
}

impl PlayerCommand {
    pub fn kind(&self) -> MessageKind {
        match self {
            PlayerCommand::Ping => MessageKind::Ping,
            PlayerCommand::AddLocalizations { .. } => MessageKind::AddLocalizations,
            PlayerCommand::RemoveLocalizations { .. } => MessageKind::RemoveLocalizations,
            PlayerCommand::UpdateLocalizations { .. } => MessageKind::UpdateLocalizations,
            PlayerCommand::ClearLocalizations { .. } => MessageKind::ClearLocalizations,
            PlayerCommand::SelectLocalizations { .. } => MessageKind::SelectLocalizations,
        }
    }

    pub fn video_uuid(&self) -> Option<Uuid> {
        match self {
            PlayerCommand::Ping => None,
            PlayerCommand::AddLocalizations { uuid, .. }
            | PlayerCommand::RemoveLocalizations { uuid, .. }
            | PlayerCommand::UpdateLocalizations { uuid, .. }
            | PlayerCommand::ClearLocalizations { uuid }
            | PlayerCommand::SelectLocalizations { uuid, .. } => Some(*uuid),
        }
    }
}
