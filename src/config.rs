// Application configuration
// Logging is on by default only in debug builds

use crate::error::ConfigError;
use crate::peer::types::ServerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[cfg(debug_assertions)]
pub const LOGGING_ENABLED: bool = true;

#[cfg(not(debug_assertions))]
pub const LOGGING_ENABLED: bool = false;

/// Label of the single data channel each link opens
pub const DEFAULT_CHANNEL_LABEL: &str = "qrchat-data";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub ice_servers: Vec<ServerConfig>,
    pub channel_label: String,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    /// `EnvFilter` directives, overridden by `RUST_LOG`
    pub filter: String,
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: LOGGING_ENABLED,
            filter: "info,webrtc=warn".into(),
            with_target: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ice_servers: default_ice_servers(),
            channel_label: DEFAULT_CHANNEL_LABEL.into(),
            logging: LoggingConfig::default(),
        }
    }
}

pub fn default_ice_servers() -> Vec<ServerConfig> {
    vec![
        ServerConfig {
            id: "default-stun".into(),
            r#type: "stun".into(),
            url: "stun:stun.l.google.com:19302".into(),
            username: None,
            credential: None,
        },
        ServerConfig {
            id: "default-stun-1".into(),
            r#type: "stun".into(),
            url: "stun:stun1.l.google.com:19302".into(),
            username: None,
            credential: None,
        },
    ]
}

impl Config {
    /// Reads a JSON config file; missing keys fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_label.is_empty() {
            return Err(ConfigError::Invalid("channel label cannot be empty".into()));
        }
        for server in &self.ice_servers {
            if server.url.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "server {} has an empty URL",
                    server.id
                )));
            }
            if server.r#type != "stun" && server.r#type != "turn" {
                return Err(ConfigError::Invalid(format!(
                    "server {} has unknown type {:?}",
                    server.id, server.r#type
                )));
            }
            if server.r#type == "turn" && (server.username.is_none() || server.credential.is_none())
            {
                return Err(ConfigError::Invalid(format!(
                    "TURN server {} requires username and credential",
                    server.id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.ice_servers.len(), 2);
        assert_eq!(config.logging.enabled, LOGGING_ENABLED);
    }

    #[test]
    fn turn_without_credentials_is_rejected() {
        let mut config = Config::default();
        config.ice_servers.push(ServerConfig {
            id: "relay".into(),
            r#type: "turn".into(),
            url: "relay.example.org:3478".into(),
            username: Some("user".into()),
            credential: None,
        });
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn empty_url_is_rejected() {
        let mut config = Config::default();
        config.ice_servers[0].url.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let partial = serde_json::json!({
            "ice_servers": [{
                "id": "t",
                "type": "turn",
                "url": "relay.example.org",
                "username": "u",
                "credential": "c"
            }]
        });
        write!(file, "{partial}").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.ice_servers.len(), 1);
        assert_eq!(config.ice_servers[0].r#type, "turn");
        assert_eq!(config.channel_label, DEFAULT_CHANNEL_LABEL);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn unreadable_file_is_an_error() {
        assert!(matches!(
            Config::load("/nonexistent/qrchat.json"),
            Err(ConfigError::FileRead(_))
        ));
    }
}
