//! Session configuration.

use cfclient_protocol::MapSize;
use serde::{Deserialize, Serialize};

use crate::SessionError;

/// What the client asks for during the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// View size requested with `setup mapsize`.
    pub map_size: MapSize,

    /// Number of ground objects requested with `setup num_look_objects`.
    pub num_look_objects: u32,

    /// Free-form client identification sent with `version`.
    pub client_version: String,

    /// `(client, server)` protocol numbers sent with `version`.
    pub client_protocol: (u32, u32),
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            map_size: MapSize::DEFAULT,
            num_look_objects: 50,
            client_version: concat!("cfclient ", env!("CARGO_PKG_VERSION")).to_string(),
            client_protocol: (1023, 1027),
        }
    }
}

impl SessionConfig {
    /// Checks every field against its contract.
    pub fn validate(&self) -> Result<(), SessionError> {
        if !self.map_size.is_valid() {
            return Err(SessionError::InvalidConfig(format!(
                "map size {} must have odd dimensions in {}..={}",
                self.map_size,
                MapSize::MIN,
                MapSize::MAX
            )));
        }
        if self.num_look_objects == 0 {
            return Err(SessionError::InvalidConfig(
                "num_look_objects must be at least 1".into(),
            ));
        }
        if self.client_version.contains('\n') {
            return Err(SessionError::InvalidConfig(
                "client_version must be a single line".into(),
            ));
        }
        Ok(())
    }
}
