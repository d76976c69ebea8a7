//! Client configuration
//!
//! [`ClientConfig`] is plain serde data. [`ConfigLoader`] layers it from
//! defaults, an optional TOML file and `SHARKTOPODA_*` environment variables.

use crate::error::ConfigError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Prefix for environment overrides, e.g. `SHARKTOPODA_PLAYER_PORT`
pub const ENV_PREFIX: &str = "SHARKTOPODA_";

/// Core client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Host the player listens on
    pub player_host: String,
    pub player_port: u16,
    /// Port the player sends its own commands to; 0 picks an ephemeral port
    pub local_port: u16,
    /// Host announced in `connect`, when the player should not use our source address
    pub callback_host: Option<String>,
    pub request_timeout_ms: u64,
    /// Wait for `open done`, counted from sending `open`
    pub open_timeout_ms: u64,
    /// Wait for `frame capture done`, counted from sending `frame capture`
    pub capture_timeout_ms: u64,
    pub write_timeout_ms: u64,
    /// Resends for idempotent queries that time out
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    /// Buffered player events per subscriber
    pub event_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            player_host: crate::protocol::DEFAULT_PLAYER_HOST.to_string(),
            player_port: crate::protocol::DEFAULT_PLAYER_PORT,
            local_port: crate::protocol::DEFAULT_LOCAL_PORT,
            callback_host: None,
            request_timeout_ms: 5_000,
            open_timeout_ms: 30_000,
            capture_timeout_ms: 10_000,
            write_timeout_ms: 1_000,
            max_retries: 2,
            retry_delay_ms: 250,
            event_capacity: 64,
        }
    }
}

impl ClientConfig {
    /// Create a test configuration: loopback, ephemeral port, short timeouts
    pub fn test() -> Self {
        Self {
            player_host: "127.0.0.1".to_string(),
            local_port: 0,
            request_timeout_ms: 500,
            open_timeout_ms: 1_000,
            capture_timeout_ms: 1_000,
            write_timeout_ms: 500,
            max_retries: 1,
            retry_delay_ms: 20,
            event_capacity: 16,
            ..Self::default()
        }
    }

    /// `host:port` of the player
    pub fn player_address(&self) -> String {
        if self.player_host.contains(':') && !self.player_host.starts_with('[') {
            format!("[{}]:{}", self.player_host, self.player_port)
        } else {
            format!("{}:{}", self.player_host, self.player_port)
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Check values that deserialize fine but cannot work
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.player_host.trim().is_empty() {
            return Err(ConfigError::invalid("player_host", "must not be empty"));
        }
        if self.player_port == 0 {
            return Err(ConfigError::invalid("player_port", "must be non-zero"));
        }
        if let Some(host) = &self.callback_host
            && host.trim().is_empty()
        {
            return Err(ConfigError::invalid("callback_host", "must not be blank"));
        }

        let timeouts = [
            ("request_timeout_ms", self.request_timeout_ms),
            ("open_timeout_ms", self.open_timeout_ms),
            ("capture_timeout_ms", self.capture_timeout_ms),
            ("write_timeout_ms", self.write_timeout_ms),
        ];
        for (field, value) in timeouts {
            if value == 0 {
                return Err(ConfigError::invalid(field, "must be non-zero"));
            }
        }

        if self.event_capacity == 0 {
            return Err(ConfigError::invalid("event_capacity", "must be at least 1"));
        }
        Ok(())
    }
}

/// Loads [`ClientConfig`] with layered priority: ENV > File > Defaults
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Loader without a configuration file
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Loader that also reads `path` when it exists
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    pub fn config_path(&self) -> Option<&PathBuf> {
        self.config_path.as_ref()
    }

    /// Load and validate the configuration
    pub fn load(&self) -> Result<ClientConfig, ConfigError> {
        let mut figment = Figment::new();

        // Layer 1: Defaults
        figment = figment.merge(Serialized::defaults(ClientConfig::default()));

        // Layer 2: Config file (if exists)
        if let Some(path) = &self.config_path {
            if path.exists() {
                debug!("Reading configuration from {}", path.display());
                figment = figment.merge(Toml::file(path));
            } else {
                debug!("No configuration file at {}", path.display());
            }
        }

        // Layer 3: Environment variables
        figment = figment.merge(Env::prefixed(ENV_PREFIX));

        let config: ClientConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.player_host, "127.0.0.1");
        assert_eq!(config.player_port, 8800);
        assert_eq!(config.local_port, 8801);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.open_timeout(), Duration::from_secs(30));
        assert_eq!(config.player_address(), "127.0.0.1:8800");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ipv6_player_address() {
        let config = ClientConfig {
            player_host: "::1".to_string(),
            ..ClientConfig::default()
        };
        assert_eq!(config.player_address(), "[::1]:8800");
    }

    #[test]
    fn test_test_config_is_valid() {
        let config = ClientConfig::test();
        assert_eq!(config.local_port, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_failures() {
        let cases = vec![
            (
                ClientConfig {
                    player_host: " ".to_string(),
                    ..ClientConfig::default()
                },
                "player_host",
            ),
            (
                ClientConfig {
                    player_port: 0,
                    ..ClientConfig::default()
                },
                "player_port",
            ),
            (
                ClientConfig {
                    callback_host: Some(String::new()),
                    ..ClientConfig::default()
                },
                "callback_host",
            ),
            (
                ClientConfig {
                    open_timeout_ms: 0,
                    ..ClientConfig::default()
                },
                "open_timeout_ms",
            ),
            (
                ClientConfig {
                    event_capacity: 0,
                    ..ClientConfig::default()
                },
                "event_capacity",
            ),
        ];

        for (config, expected) in cases {
            match config.validate() {
                Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, expected),
                other => panic!("Expected invalid '{expected}', got {other:?}"),
            }
        }
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let config: ClientConfig = serde_json::from_str(r#"{"player_port": 9000}"#).unwrap();
        assert_eq!(config.player_port, 9000);
        assert_eq!(config.request_timeout_ms, 5_000);
    }
}
