//! The connection state machine.

use std::fmt;

/// Where a connection is in the handshake.
///
/// ```text
///   Connecting ──(socket up)──→ Version ──(version)──→ Setup
///       ↑                                                │
///       │                                          (setup echo)
///   (disconnect)                                         ↓
///       │        Connected ←──(addme_success)── AddMe ←──(exp_table)── RequestInfo
/// ```
///
/// States only move forward, one step at a time. The only way back is a
/// reset to `Connecting` when the connection is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Connecting,
    Version,
    Setup,
    RequestInfo,
    AddMe,
    Connected,
}

impl ConnectionState {
    /// The state that follows this one, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Connecting => Some(Self::Version),
            Self::Version => Some(Self::Setup),
            Self::Setup => Some(Self::RequestInfo),
            Self::RequestInfo => Some(Self::AddMe),
            Self::AddMe => Some(Self::Connected),
            Self::Connected => None,
        }
    }

    /// Returns `true` if `target` directly follows this state.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }

    /// Returns `true` once the handshake has completed.
    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "Connecting"),
            Self::Version => write!(f, "Version"),
            Self::Setup => write!(f, "Setup"),
            Self::RequestInfo => write!(f, "RequestInfo"),
            Self::AddMe => write!(f, "AddMe"),
            Self::Connected => write!(f, "Connected"),
        }
    }
}
