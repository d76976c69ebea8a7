//! Video information and player state models

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Information about a video window open in the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    pub uuid: Uuid,
    pub url: String,
    pub duration_millis: u64,
    pub frame_rate: f64,
    /// Whether this window has keyboard focus
    pub is_key: bool,
}

impl VideoInfo {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_millis)
    }
}

/// Playback mode of a video window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayStatus {
    #[serde(rename = "playing")]
    Playing,
    #[serde(rename = "shuttling forward")]
    ShuttlingForward,
    #[serde(rename = "shuttling reverse")]
    ShuttlingReverse,
    #[serde(rename = "paused")]
    Paused,
}

/// Playback state reported by `request player state`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub state: PlayStatus,
    pub rate: f64,
}

impl PlayerState {
    pub fn is_playing(&self) -> bool {
        !matches!(self.state, PlayStatus::Paused)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_info_from_wire() {
        let json = r#"{
            "uuid": "b9f3b4e2-5c1d-4a4e-8f0e-2d1c3b4a5e6f",
            "url": "file:///videos/dive-1234.mp4",
            "durationMillis": 3600000,
            "frameRate": 29.97,
            "isKey": true
        }"#;

        let info: VideoInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.url, "file:///videos/dive-1234.mp4");
        assert_eq!(info.duration(), Duration::from_secs(3600));
        assert!(info.is_key);
    }

    #[test]
    fn test_player_state_from_wire() {
        let state: PlayerState =
            serde_json::from_str(r#"{"state": "shuttling reverse", "rate": -2.0}"#).unwrap();
        assert_eq!(state.state, PlayStatus::ShuttlingReverse);
        assert_eq!(state.rate, -2.0);
        assert!(state.is_playing());

        let paused: PlayerState =
            serde_json::from_str(r#"{"state": "paused", "rate": 0.0}"#).unwrap();
        assert!(!paused.is_playing());
    }

    #[test]
    fn test_unknown_play_status_rejected() {
        assert!(serde_json::from_str::<PlayerState>(r#"{"state": "stopped", "rate": 0}"#).is_err());
    }
}
