//! Unified error type for the cfclient engine.

use cfclient_protocol::ProtocolError;
use cfclient_session::SessionError;
use cfclient_transport::TransportError;

/// Top-level error that wraps the error of each layer.
///
/// `#[from]` on each variant lets `?` convert layer errors directly.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The socket could not be opened, or a read or write failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A message could not be decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Negotiation failed or a configuration value was rejected.
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ClientError {
    /// Returns `true` if the session cannot continue.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_fatal(),
            Self::Protocol(_) => false,
            Self::Session(e) => e.is_fatal(),
        }
    }
}
