//! Frame capture model

use crate::protocol::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// A still image the player wrote to disk, reported by `frame capture done`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameCapture {
    /// Video the frame was taken from
    pub uuid: Uuid,
    /// Exact elapsed time of the captured frame
    pub elapsed_time_millis: u64,
    pub image_reference_uuid: Uuid,
    pub image_location: PathBuf,
}

impl FrameCapture {
    /// Fail unless this capture answers the request for `expected`
    ///
    /// Completions are matched per video, so two captures in flight on the
    /// same video may be answered out of order.
    pub fn ensure_reference(self, expected: Uuid) -> Result<Self> {
        if self.image_reference_uuid == expected {
            Ok(self)
        } else {
            Err(ProtocolError::unexpected_response(
                format!("capture {expected}"),
                format!("capture {}", self.image_reference_uuid),
            ))
        }
    }
}
