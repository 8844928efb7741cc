//! Error types for the session layer.

/// Errors raised while negotiating or configuring a session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The server echoed a setup option with a value this client cannot
    /// work with. The session must be aborted.
    #[error("server incompatible: setup {option} is {actual:?}, expected {expected:?}")]
    Incompatible {
        option: String,
        expected: String,
        actual: String,
    },

    /// A configuration value violates its contract (for example an even
    /// map width).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A reply arrived that the handshake could not use. The reply is
    /// ignored and the session continues.
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),
}

impl SessionError {
    /// Returns `true` if the session cannot continue.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Incompatible { .. })
    }
}
