/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Opening the TCP connection failed.
    #[error("connect to {addr} failed: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The peer closed the connection, possibly in the middle of a frame.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Writing a frame failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Reading from the socket failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// The payload does not fit the 16-bit length prefix.
    #[error("frame payload of {len} bytes exceeds the 65535 byte limit")]
    FrameTooLarge { len: usize },
}

impl TransportError {
    /// Returns `true` if the link is unusable after this error.
    ///
    /// An oversized frame is refused before anything is written, so the
    /// connection stays up.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::FrameTooLarge { .. })
    }
}
