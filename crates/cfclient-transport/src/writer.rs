//! The write half of a framed connection.

use std::fmt;
use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::frame::{build_frame, HEADER_LEN};
use crate::{LinkMonitor, TransportError};

/// State guarded by the writer lock: the socket half and a scratch buffer
/// reused for every outgoing frame.
struct WriterState<W> {
    sink: Option<W>,
    scratch: BytesMut,
}

/// Serializes frames onto an [`AsyncWrite`].
///
/// Every send holds a single `tokio::sync::Mutex` while it builds the
/// frame *and* writes it, so the prefix of one message can never be
/// interleaved with the body of another, and messages leave in the order
/// the lock was acquired.
///
/// After the link is closed or a write fails, the socket half is dropped
/// and further sends are silently discarded (`Ok(None)`). Teardown can then
/// race with in-flight sends without producing spurious errors.
pub struct FrameWriter<W> {
    state: Mutex<WriterState<W>>,
    monitor: Arc<LinkMonitor>,
}

impl<W> FrameWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Wraps a socket write half.
    pub fn new(sink: W, monitor: Arc<LinkMonitor>) -> Self {
        Self {
            state: Mutex::new(WriterState {
                sink: Some(sink),
                scratch: BytesMut::with_capacity(HEADER_LEN + 256),
            }),
            monitor,
        }
    }

    /// Sends one frame containing `payload`.
    ///
    /// Returns `Ok(false)` if the link was already closed and the frame was
    /// dropped.
    ///
    /// # Errors
    /// See [`send_with`](Self::send_with).
    pub async fn send(&self, payload: &[u8]) -> Result<bool, TransportError> {
        let sent = self
            .send_with(|buf| buf.extend_from_slice(payload))
            .await?;
        Ok(sent.is_some())
    }

    /// Builds a payload in place under the writer lock and sends it as one
    /// frame.
    ///
    /// `build` runs while the lock is held, so anything it allocates (such
    /// as a sequence number) is ordered exactly like the frames on the wire.
    /// Returns `Ok(None)` without calling `build` if the link is closed.
    ///
    /// # Errors
    /// - [`TransportError::FrameTooLarge`]: nothing was written.
    /// - [`TransportError::SendFailed`]: the socket failed; the link is
    ///   reported lost and the writer closes itself.
    pub async fn send_with<T>(
        &self,
        build: impl FnOnce(&mut BytesMut) -> T,
    ) -> Result<Option<T>, TransportError> {
        let mut state = self.state.lock().await;
        let WriterState { sink, scratch } = &mut *state;

        let Some(writer) = sink.as_mut() else {
            tracing::trace!(link = %self.monitor.id(), "dropping send on closed link");
            return Ok(None);
        };

        scratch.clear();
        let value = build_frame(scratch, build)?;

        let result = async {
            writer.write_all(&scratch[..]).await?;
            writer.flush().await
        }
        .await;

        match result {
            Ok(()) => {
                tracing::debug!(
                    link = %self.monitor.id(),
                    len = scratch.len() - HEADER_LEN,
                    "frame sent"
                );
                Ok(Some(value))
            }
            Err(e) => {
                *sink = None;
                self.monitor.report_lost(e.to_string(), true);
                Err(TransportError::SendFailed(e))
            }
        }
    }

    /// Shuts the write half down. Later sends become no-ops.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        if let Some(mut writer) = state.sink.take() {
            // The peer may already be gone; nothing useful to do on error.
            let _ = writer.shutdown().await;
        }
    }

    /// Returns `true` while the socket half is still held.
    pub async fn is_open(&self) -> bool {
        self.state.lock().await.sink.is_some()
    }

    /// The monitor shared with the read half.
    pub fn monitor(&self) -> &Arc<LinkMonitor> {
        &self.monitor
    }
}

impl<W> fmt::Debug for FrameWriter<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // A send in progress holds the lock; report the state as unknown.
        let open = self.state.try_lock().ok().map(|state| state.sink.is_some());
        f.debug_struct("FrameWriter")
            .field("monitor", &self.monitor)
            .field("open", &open)
            .finish_non_exhaustive()
    }
}
