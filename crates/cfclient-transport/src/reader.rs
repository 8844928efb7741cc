//! The read half of a framed connection.

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::TransportError;
use crate::frame::FrameBuffer;

/// Default number of bytes requested from the socket per read.
pub const DEFAULT_READ_CHUNK: usize = 2048;

/// Pulls complete frames out of an [`AsyncRead`].
///
/// Reads go straight into the internal [`FrameBuffer`], so partial frames
/// simply wait for the next read.
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
    buffer: FrameBuffer,
    chunk: usize,
}

impl<R> FrameReader<R>
where
    R: AsyncRead + Unpin,
{
    /// Wraps a socket read half using [`DEFAULT_READ_CHUNK`].
    pub fn new(inner: R) -> Self {
        Self::with_chunk_size(inner, DEFAULT_READ_CHUNK)
    }

    /// Wraps a socket read half, reading at most `chunk` bytes at a time.
    pub fn with_chunk_size(inner: R, chunk: usize) -> Self {
        let chunk = chunk.max(1);
        Self {
            inner,
            buffer: FrameBuffer::with_capacity(chunk),
            chunk,
        }
    }

    /// Waits for the next complete frame.
    ///
    /// Returns `Ok(None)` if the peer closed the stream on a frame boundary.
    ///
    /// # Errors
    /// - [`TransportError::ConnectionClosed`] if EOF arrives inside a frame.
    /// - [`TransportError::ReceiveFailed`] on a socket error.
    pub async fn next_frame(&mut self) -> Result<Option<BytesMut>, TransportError> {
        loop {
            if let Some(frame) = self.buffer.next_frame() {
                tracing::trace!(len = frame.len(), "frame received");
                return Ok(Some(frame));
            }

            let spare = self.buffer.spare_mut(self.chunk);
            let n = self
                .inner
                .read_buf(spare)
                .await
                .map_err(TransportError::ReceiveFailed)?;

            if n == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Err(TransportError::ConnectionClosed(format!(
                    "EOF with {} bytes of an incomplete frame",
                    self.buffer.buffered()
                )));
            }
        }
    }

    /// Discards any partially received frame.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Returns the wrapped reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}
