//! Error types for the protocol layer.
//!
//! A `ProtocolError` always concerns exactly one message. The connection
//! survives it: the offending message is dropped, a diagnostic is surfaced,
//! and decoding continues with the next frame.

/// Errors produced while decoding a single inbound message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// A known command whose fields are inconsistent: a bad sub-field
    /// length, a non-digit in a decimal, excess trailing bytes, and so on.
    #[error("malformed {command} command: {reason}")]
    Malformed {
        command: &'static str,
        reason: String,
    },

    /// A field ran past the end of the message.
    #[error("truncated {command} command")]
    Truncated { command: &'static str },

    /// The keyword did not match any known command.
    ///
    /// `prefix` holds the printable leading bytes of the message, which is
    /// usually enough to tell what the server tried to send.
    #[error("unknown command {prefix:?}")]
    UnknownCommand { prefix: String },

    /// The command belongs to a wire revision that was not negotiated
    /// during setup.
    #[error("{command} command received but its protocol revision is not active")]
    InactiveRevision { command: &'static str },
}

impl ProtocolError {
    /// Returns `true` for an unrecognized keyword, as opposed to a known
    /// command that failed to parse.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::UnknownCommand { .. })
    }

    /// The command keyword this error is about, if it was recognized.
    pub fn command(&self) -> Option<&'static str> {
        match self {
            Self::Malformed { command, .. }
            | Self::Truncated { command }
            | Self::InactiveRevision { command } => Some(command),
            Self::UnknownCommand { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_is_distinguished_from_malformed() {
        let unknown = ProtocolError::UnknownCommand { prefix: "frobnicate".into() };
        let malformed = ProtocolError::Malformed {
            command: "anim",
            reason: "no faces".into(),
        };
        assert!(unknown.is_unknown());
        assert!(!malformed.is_unknown());
        assert_eq!(unknown.command(), None);
        assert_eq!(malformed.command(), Some("anim"));
        assert_eq!(malformed.to_string(), "malformed anim command: no faces");
    }
}
