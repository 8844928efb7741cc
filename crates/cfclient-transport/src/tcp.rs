//! TCP connector.

use std::sync::Arc;

use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::{FrameReader, FrameWriter, LinkMonitor, TransportError};

/// Reader half of a TCP link.
pub type TcpFrameReader = FrameReader<OwnedReadHalf>;
/// Writer half of a TCP link.
pub type TcpFrameWriter = FrameWriter<OwnedWriteHalf>;

/// Opens a TCP connection to `addr` and splits it into framed halves.
///
/// Nagle is disabled: most client commands are a few bytes long and latency
/// matters more than packet count.
///
/// # Errors
/// Returns [`TransportError::ConnectFailed`] if the connection cannot be
/// established.
pub async fn connect(
    addr: &str,
    read_chunk: usize,
    monitor: Arc<LinkMonitor>,
) -> Result<(TcpFrameReader, TcpFrameWriter), TransportError> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|source| TransportError::ConnectFailed {
            addr: addr.to_string(),
            source,
        })?;

    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!(error = %e, "could not disable Nagle");
    }

    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| addr.to_string());
    tracing::info!(link = %monitor.id(), %peer, "connected");

    let (read, write) = stream.into_split();
    Ok((
        FrameReader::with_chunk_size(read, read_chunk),
        FrameWriter::new(write, monitor),
    ))
}
