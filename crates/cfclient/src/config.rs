//! Client configuration.

use cfclient_session::{SessionConfig, SessionError};
use cfclient_transport::DEFAULT_READ_CHUNK;
use serde::{Deserialize, Serialize};

/// Default game server port.
pub const DEFAULT_PORT: u16 = 13327;

/// Everything needed to open and negotiate a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// `host:port` of the server.
    pub address: String,

    /// What to ask for during the handshake.
    pub session: SessionConfig,

    /// Bytes requested from the socket per read.
    pub read_chunk_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: format!("localhost:{DEFAULT_PORT}"),
            session: SessionConfig::default(),
            read_chunk_size: DEFAULT_READ_CHUNK,
        }
    }
}

impl ClientConfig {
    /// A default configuration for `address`.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Loads and validates a configuration from JSON. Missing fields take
    /// their default.
    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| SessionError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if self.address.trim().is_empty() {
            return Err(SessionError::InvalidConfig("address must not be empty".into()));
        }
        if self.read_chunk_size == 0 {
            return Err(SessionError::InvalidConfig(
                "read_chunk_size must be at least 1".into(),
            ));
        }
        self.session.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.address, "localhost:13327");
        assert_eq!(config.read_chunk_size, DEFAULT_READ_CHUNK);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json() {
        let config = ClientConfig::from_json(
            r#"{
                "address": "game.example.org:13327",
                "session": { "map_size": { "width": 25, "height": 19 }, "num_look_objects": 30 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.address, "game.example.org:13327");
        assert_eq!(config.session.map_size.to_string(), "25x19");
        assert_eq!(config.session.num_look_objects, 30);
        assert_eq!(config.read_chunk_size, DEFAULT_READ_CHUNK);
    }

    #[test]
    fn test_from_json_rejects_invalid_values() {
        assert!(ClientConfig::from_json(r#"{"read_chunk_size": 0}"#).is_err());
        assert!(ClientConfig::from_json(r#"{"session": {"map_size": {"width": 2, "height": 3}}}"#).is_err());
        assert!(ClientConfig::from_json("not json").is_err());
    }
}
