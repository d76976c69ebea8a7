//! Sharktopoda Client Core Library
//!
//! Remote control for the Sharktopoda video player over its UDP protocol:
//! open and position videos, capture frames and manage the localizations
//! drawn on top of them.
//!
//! ```no_run
//! use sharktopoda_client_core::{ClientConfig, SharktopodaClient};
//! use uuid::Uuid;
//!
//! # async fn run() -> sharktopoda_client_core::Result<()> {
//! let client = SharktopodaClient::new(ClientConfig::default()).await?;
//! client.connect().await?;
//!
//! let video = Uuid::new_v4();
//! client.open(video, "file:///data/dive-42.mp4").await?;
//! client.play(video, Some(1.0)).await?;
//! client.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod protocol;

// Re-export main types
pub use config::{ClientConfig, ConfigLoader};
pub use error::{ConfigError, Error, ProtocolError, Result};
pub use protocol::messages::{
    Command, FrameCapture, FrameDirection, Localization, MessageKind, PlayStatus, PlayerCommand,
    PlayerState, Response, Status, VideoInfo,
};
pub use protocol::{ClientEvent, ClientStats, ConnectionState, SharktopodaClient};
