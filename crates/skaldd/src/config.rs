//! Daemon configuration.
//!
//! Configuration is one TOML document, read once at startup:
//!
//! ```toml
//! [Console]
//! Enabled = true
//!
//! [Net]
//! Enabled = true
//! Host = "127.0.0.1:1350"
//! Log = true
//!
//! [[Lists]]
//! Player = "127.0.0.1:1351"
//! ```
//!
//! Every field has a default; a missing file means a default daemon
//! (console on, net on at the default host).

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// The host the net server binds when none is configured.
pub const DEFAULT_HOST: &str = "127.0.0.1:1350";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("couldn't read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("couldn't parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// The main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Config {
    pub console: ConsoleConfig,
    pub net: NetConfig,
    pub lists: Vec<ListConfig>,
}

/// Configuration for the interactive console.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ConsoleConfig {
    /// Whether the console runs at all.
    pub enabled: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Configuration for the TCP server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct NetConfig {
    /// Whether the net server runs at all.
    pub enabled: bool,
    /// The `host:port` string the server binds.
    pub host: String,
    /// Whether per-connection traffic is logged.
    pub log: bool,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: DEFAULT_HOST.to_owned(),
            log: true,
        }
    }
}

/// Configuration for one hosted list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ListConfig {
    /// The `host:port` of the player service to mount, if any.
    pub player: Option<String>,
}

impl Config {
    /// Loads configuration from `path`. A missing file is not an error:
    /// the defaults apply.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file; using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_everything() {
        let config = Config::default();
        assert!(config.console.enabled);
        assert!(config.net.enabled);
        assert_eq!(config.net.host, DEFAULT_HOST);
        assert!(config.net.log);
        assert!(config.lists.is_empty());
    }

    #[test]
    fn parses_full_document() {
        let config: Config = toml::from_str(
            r#"
            [Console]
            Enabled = false

            [Net]
            Enabled = true
            Host = "0.0.0.0:1350"
            Log = false

            [[Lists]]
            Player = "127.0.0.1:1351"

            [[Lists]]
            "#,
        )
        .expect("parse failed");

        assert!(!config.console.enabled);
        assert_eq!(config.net.host, "0.0.0.0:1350");
        assert!(!config.net.log);
        assert_eq!(config.lists.len(), 2);
        assert_eq!(config.lists[0].player.as_deref(), Some("127.0.0.1:1351"));
        assert_eq!(config.lists[1].player, None);
    }

    #[test]
    fn partial_document_keeps_defaults_elsewhere() {
        let config: Config = toml::from_str(
            r#"
            [Net]
            Host = "127.0.0.1:9999"
            "#,
        )
        .expect("parse failed");

        assert!(config.console.enabled);
        assert!(config.net.enabled);
        assert_eq!(config.net.host, "127.0.0.1:9999");
    }
}
