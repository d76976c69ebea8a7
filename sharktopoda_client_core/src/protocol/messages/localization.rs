//! Localization model
//!
//! A localization is a rectangular region of interest tagged with a concept,
//! anchored at an elapsed time in a video.

use crate::protocol::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bounding box annotation displayed by the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Localization {
    pub uuid: Uuid,
    pub concept: String,
    pub elapsed_time_millis: i64,
    #[serde(default)]
    pub duration_millis: i64,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    /// Display color as `#RRGGBB`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Localization {
    /// Create a localization with a fresh UUID and zero duration
    pub fn new(
        concept: impl Into<String>,
        elapsed_time_millis: i64,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            concept: concept.into(),
            elapsed_time_millis,
            duration_millis: 0,
            x,
            y,
            width,
            height,
            color: None,
        }
    }

    /// Set the duration the box stays on screen
    pub fn with_duration(mut self, duration_millis: i64) -> Self {
        self.duration_millis = duration_millis;
        self
    }

    /// Set the display color
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Check the localization is structurally valid
    pub fn validate(&self) -> Result<()> {
        if self.concept.trim().is_empty() {
            return Err(ProtocolError::validation(
                "concept",
                format!("localization {} has an empty concept", self.uuid),
            ));
        }
        if self.elapsed_time_millis < 0 {
            return Err(ProtocolError::validation(
                "elapsed_time_millis",
                format!(
                    "localization {} starts at {} ms",
                    self.uuid, self.elapsed_time_millis
                ),
            ));
        }
        if self.duration_millis < 0 {
            return Err(ProtocolError::validation(
                "duration_millis",
                format!(
                    "localization {} lasts {} ms",
                    self.uuid, self.duration_millis
                ),
            ));
        }
        if self.x < 0 || self.y < 0 {
            return Err(ProtocolError::validation(
                "position",
                format!(
                    "localization {} is at ({}, {})",
                    self.uuid, self.x, self.y
                ),
            ));
        }
        if self.width <= 0 || self.height <= 0 {
            return Err(ProtocolError::validation(
                "size",
                format!(
                    "localization {} is {}x{}",
                    self.uuid, self.width, self.height
                ),
            ));
        }
        if let Some(color) = &self.color
            && !is_hex_color(color)
        {
            return Err(ProtocolError::validation(
                "color",
                format!("'{color}' is not a #RRGGBB color"),
            ));
        }
        Ok(())
    }
}

fn is_hex_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Localization {
        Localization::new("Aurelia", 1500, 10, 20, 100, 50)
    }

    #[test]
    fn test_wire_field_names() {
        let localization = sample().with_duration(250).with_color("#FF00aa");
        let value = serde_json::to_value(&localization).unwrap();

        assert_eq!(value["concept"], "Aurelia");
        assert_eq!(value["elapsedTimeMillis"], 1500);
        assert_eq!(value["durationMillis"], 250);
        assert_eq!(value["width"], 100);
        assert_eq!(value["color"], "#FF00aa");
        assert_eq!(value["uuid"], localization.uuid.to_string());
    }

    #[test]
    fn test_color_omitted_when_absent() {
        let value = serde_json::to_value(sample()).unwrap();
        assert!(value.get("color").is_none());
    }

    #[test]
    fn test_duration_defaults_to_zero() {
        let json = r#"{
            "uuid": "4f1c2b0e-3a5d-4e8f-9b7a-1c2d3e4f5a6b",
            "concept": "Nanomia",
            "elapsedTimeMillis": 42,
            "x": 1, "y": 2, "width": 3, "height": 4
        }"#;
        let localization: Localization = serde_json::from_str(json).unwrap();
        assert_eq!(localization.duration_millis, 0);
        assert_eq!(localization.color, None);
        assert_eq!(localization.concept, "Nanomia");
    }

    #[test]
    fn test_validate_accepts_sample() {
        assert!(sample().validate().is_ok());
        assert!(sample().with_color("#0a0B0c").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        let cases = vec![
            (Localization::new("  ", 0, 0, 0, 1, 1), "concept"),
            (Localization::new("a", -1, 0, 0, 1, 1), "elapsed_time_millis"),
            (sample().with_duration(-5), "duration_millis"),
            (Localization::new("a", 0, -1, 0, 1, 1), "position"),
            (Localization::new("a", 0, 0, 0, 0, 1), "size"),
            (sample().with_color("red"), "color"),
            (sample().with_color("#GG0000"), "color"),
        ];

        for (localization, expected_field) in cases {
            match localization.validate() {
                Err(ProtocolError::Validation { field, .. }) => {
                    assert_eq!(field, expected_field, "{localization:?}")
                }
                other => panic!("Expected validation error for {localization:?}, got {other:?}"),
            }
        }
    }
}
