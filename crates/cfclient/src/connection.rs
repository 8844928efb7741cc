//! The server connection.
//!
//! A [`ServerConnection`] owns one socket at a time. Each connect spawns a
//! reader task that decodes messages inline and hands them to the sinks
//! and to the handshake. Any number of tasks may send concurrently; the
//! frame writer serializes them.
//!
//! ```text
//!              ┌─────────── reader task ───────────┐
//!   socket ──→ │ FrameReader → Decoder → Handshake │ ──→ SinkRegistry
//!              └──────────────────┬────────────────┘
//!                                 │ actions
//!   callers ──→ CommandEncoder ──→ FrameWriter ──→ socket
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cfclient_protocol::{
    Capabilities, Command, CommandEncoder, Decoder, MapSize, OutgoingRequest, RedrawLock,
};
use cfclient_session::{Action, ConnectionState, Handshake, SessionError};
use cfclient_transport::{LinkLoss, LinkMonitor, TcpFrameReader, TcpFrameWriter, TransportError};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::event::{Event, EventSink, SinkId, SinkRegistry};
use crate::{ClientConfig, ClientError};

/// The live socket and the task reading it.
struct Link {
    writer: Arc<TcpFrameWriter>,
    stop: Arc<Notify>,
    task: JoinHandle<()>,
}

/// State shared between the public handle and the reader task.
struct Inner {
    config: ClientConfig,
    sinks: SinkRegistry,
    redraw: RedrawLock,
    encoder: CommandEncoder,
    handshake: Mutex<Handshake>,
    link: Mutex<Option<Link>>,
    /// Serializes connect and disconnect.
    lifecycle: tokio::sync::Mutex<()>,
}

/// A client connection to a game server.
///
/// Register sinks with [`add_sink`](Self::add_sink), then call
/// [`connect`](Self::connect). The handshake runs on its own; sinks see
/// [`Event::StateChanged`] reach [`ConnectionState::Connected`].
pub struct ServerConnection {
    inner: Arc<Inner>,
}

impl ServerConnection {
    /// Creates an unconnected handle.
    ///
    /// # Errors
    /// [`ClientError::Session`] if `config` is invalid.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let handshake = Handshake::new(config.session.clone())?;
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                sinks: SinkRegistry::new(),
                redraw: RedrawLock::new(),
                encoder: CommandEncoder::new(),
                handshake: Mutex::new(handshake),
                link: Mutex::new(None),
                lifecycle: tokio::sync::Mutex::new(()),
            }),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn add_sink(&self, sink: Arc<dyn EventSink>) -> SinkId {
        self.inner.sinks.add(sink)
    }

    pub fn remove_sink(&self, id: SinkId) -> bool {
        self.inner.sinks.remove(id)
    }

    /// The lock a renderer takes while drawing the map. `map2` updates are
    /// delivered while it is held.
    pub fn redraw_lock(&self) -> RedrawLock {
        self.inner.redraw.clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.lock_handshake().state()
    }

    /// The parameters negotiated with the server so far.
    pub fn capabilities(&self) -> Capabilities {
        self.inner.lock_handshake().capabilities().clone()
    }

    /// Returns `true` while a socket is open.
    pub fn is_connected(&self) -> bool {
        self.inner
            .current_writer()
            .is_some_and(|writer| !writer.monitor().is_lost())
    }

    /// Opens a connection and starts the handshake.
    ///
    /// An existing connection is closed first.
    ///
    /// # Errors
    /// [`ClientError::Transport`] if the server cannot be reached.
    pub async fn connect(&self) -> Result<(), ClientError> {
        let _lifecycle = self.inner.lifecycle.lock().await;
        self.inner.shutdown("reconnecting").await;

        let stop = Arc::new(Notify::new());
        let on_lost = {
            let stop = Arc::clone(&stop);
            let inner = Arc::downgrade(&self.inner);
            move |loss: &LinkLoss| {
                stop.notify_one();
                if let Some(inner) = inner.upgrade() {
                    inner.on_link_lost(loss);
                }
            }
        };
        let monitor = Arc::new(LinkMonitor::new(on_lost));

        let config = &self.inner.config;
        let (reader, writer) =
            cfclient_transport::connect(&config.address, config.read_chunk_size, monitor).await?;
        let writer = Arc::new(writer);

        let actions = self.inner.lock_handshake().on_connected();
        self.inner.execute(actions, None, &writer).await;

        let task = tokio::spawn(run_reader(
            Arc::clone(&self.inner),
            reader,
            Arc::clone(&writer),
            Arc::clone(&stop),
        ));
        *self.inner.lock_link() = Some(Link { writer, stop, task });
        Ok(())
    }

    /// Closes the connection and waits for the reader task to finish.
    ///
    /// Sinks receive [`Event::Disconnected`] once. Does nothing when not
    /// connected.
    pub async fn disconnect(&self, reason: &str) {
        let _lifecycle = self.inner.lifecycle.lock().await;
        self.inner.shutdown(reason).await;
    }

    /// Sends a request.
    ///
    /// Returns `Ok(false)` if there is no connection; the request is
    /// dropped.
    ///
    /// # Errors
    /// [`ClientError::Transport`] if the write failed. The connection is
    /// lost in that case and sinks are told.
    pub async fn send(&self, request: &OutgoingRequest) -> Result<bool, ClientError> {
        let Some(writer) = self.inner.current_writer() else {
            return Ok(false);
        };
        Ok(self.inner.write(&writer, request).await?.is_some())
    }

    /// Sends a player command with acknowledgement.
    ///
    /// Returns the sequence id the server will echo in `comc`, or `None`
    /// if there is no connection.
    ///
    /// # Errors
    /// See [`send`](Self::send).
    pub async fn send_ncom(&self, command: &str, repeat: u32) -> Result<Option<u8>, ClientError> {
        let Some(writer) = self.inner.current_writer() else {
            return Ok(None);
        };
        let request = OutgoingRequest::Ncom {
            repeat,
            command: command.to_string(),
        };
        Ok(self.inner.write(&writer, &request).await?.flatten())
    }

    /// Asks the server for a different view size.
    ///
    /// Before the handshake has reached setup this only changes the size
    /// that will be requested.
    ///
    /// # Errors
    /// [`SessionError::InvalidConfig`] if `size` is not a valid view size.
    pub async fn set_map_size(&self, size: MapSize) -> Result<(), ClientError> {
        let actions = self.inner.lock_handshake().request_map_size(size)?;
        self.inner.execute_detached(actions).await;
        Ok(())
    }

    /// Asks the server for a different number of ground objects.
    ///
    /// # Errors
    /// [`SessionError::InvalidConfig`] if `count` is zero.
    pub async fn set_num_look_objects(&self, count: u32) -> Result<(), ClientError> {
        let actions = self.inner.lock_handshake().request_num_look_objects(count)?;
        self.inner.execute_detached(actions).await;
        Ok(())
    }
}

impl Drop for ServerConnection {
    fn drop(&mut self) {
        if let Some(link) = self.inner.lock_link().take() {
            link.writer.monitor().report_lost("connection handle dropped", false);
            link.stop.notify_one();
        }
    }
}

impl fmt::Debug for ServerConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConnection")
            .field("address", &self.inner.config.address)
            .field("state", &self.state())
            .field("sinks", &self.inner.sinks)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Reader task
// ---------------------------------------------------------------------------

async fn run_reader(
    inner: Arc<Inner>,
    mut reader: TcpFrameReader,
    writer: Arc<TcpFrameWriter>,
    stop: Arc<Notify>,
) {
    let monitor = Arc::clone(writer.monitor());
    let mut decoder = Decoder::new(inner.lock_handshake().capabilities().clone());
    debug!(link = %monitor.id(), "reader task started");

    loop {
        let frame = tokio::select! {
            _ = stop.notified() => break,
            frame = reader.next_frame() => frame,
        };
        match frame {
            Ok(Some(message)) => {
                if let Err(err) = inner.dispatch(&message, &mut decoder, &writer).await {
                    error!(link = %monitor.id(), %err, "aborting session");
                    monitor.report_lost(err.to_string(), true);
                    break;
                }
            }
            Ok(None) => {
                monitor.report_lost("connection closed by server", false);
                break;
            }
            Err(err) => {
                monitor.report_lost(err.to_string(), true);
                break;
            }
        }
    }

    writer.close().await;
    debug!(link = %monitor.id(), "reader task finished");
}

// ---------------------------------------------------------------------------
// Inner
// ---------------------------------------------------------------------------

impl Inner {
    fn lock_handshake(&self) -> MutexGuard<'_, Handshake> {
        self.handshake.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_link(&self) -> MutexGuard<'_, Option<Link>> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_writer(&self) -> Option<Arc<TcpFrameWriter>> {
        self.lock_link().as_ref().map(|link| Arc::clone(&link.writer))
    }

    /// Tears down the current link, if any. Caller holds `lifecycle`.
    async fn shutdown(&self, reason: &str) {
        let Some(link) = self.lock_link().take() else {
            return;
        };
        link.writer.monitor().report_lost(reason, false);
        link.stop.notify_one();
        link.writer.close().await;
        if let Err(e) = link.task.await {
            warn!(error = %e, "reader task did not finish cleanly");
        }
    }

    /// Decodes one message and delivers it.
    ///
    /// Decode failures are reported to the sinks and swallowed. A fatal
    /// handshake error is returned so the reader can end the session.
    async fn dispatch(
        &self,
        message: &[u8],
        decoder: &mut Decoder,
        writer: &TcpFrameWriter,
    ) -> Result<(), SessionError> {
        let command = match decoder.decode(message) {
            Ok(command) => command,
            Err(err) => {
                if err.is_unknown() {
                    debug!(%err, "dropping unknown command");
                } else {
                    warn!(%err, "dropping malformed command");
                }
                self.sinks.dispatch(&Event::ProtocolError(err));
                return Ok(());
            }
        };

        if let Command::Map2(deltas) = &command {
            self.redraw
                .bracket(deltas, |update| self.sinks.dispatch(&Event::from(update)));
            return Ok(());
        }

        let result = self.lock_handshake().on_command(&command);
        self.sinks.dispatch(&Event::Command(command));
        match result {
            Ok(actions) => {
                self.execute(actions, Some(decoder), writer).await;
                Ok(())
            }
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                warn!(%err, "ignoring reply");
                Ok(())
            }
        }
    }

    /// Carries out handshake actions. Capability changes only apply when
    /// called from the reader task, which owns the decoder.
    async fn execute(
        &self,
        actions: Vec<Action>,
        mut decoder: Option<&mut Decoder>,
        writer: &TcpFrameWriter,
    ) {
        for action in actions {
            match action {
                Action::Send(request) => {
                    // A failed write reports the link lost; the reader stops.
                    if let Err(err) = self.write(writer, &request).await {
                        debug!(%err, command = request.keyword(), "handshake send failed");
                        return;
                    }
                }
                Action::StateChanged { from, to } => {
                    info!(%from, %to, "connection state changed");
                    self.sinks.dispatch(&Event::StateChanged { from, to });
                }
                Action::Capabilities(caps) => {
                    if let Some(decoder) = decoder.as_deref_mut() {
                        decoder.set_capabilities(caps);
                    }
                }
                Action::MapResized(size) => {
                    self.sinks.dispatch(&Event::Command(Command::NewMap(size)));
                }
            }
        }
    }

    /// Executes actions produced outside the reader task.
    async fn execute_detached(&self, actions: Vec<Action>) {
        if actions.is_empty() {
            return;
        }
        if let Some(writer) = self.current_writer() {
            self.execute(actions, None, &writer).await;
        }
    }

    /// Encodes and sends `request`. `Ok(None)` means the link is closed.
    async fn write(
        &self,
        writer: &TcpFrameWriter,
        request: &OutgoingRequest,
    ) -> Result<Option<Option<u8>>, TransportError> {
        if writer.monitor().is_lost() {
            return Ok(None);
        }
        let sent = writer
            .send_with(|buf| self.encoder.encode(request, buf))
            .await?;
        if sent.is_some() {
            debug!(command = request.keyword(), "request sent");
        }
        Ok(sent)
    }

    /// Link-loss callback. Runs exactly once per link.
    fn on_link_lost(&self, loss: &LinkLoss) {
        self.sinks.dispatch(&Event::Disconnected {
            reason: loss.reason.clone(),
            is_error: loss.is_error,
        });
        let actions = self.lock_handshake().reset();
        for action in actions {
            if let Action::StateChanged { from, to } = action {
                info!(%from, %to, "connection state changed");
                self.sinks.dispatch(&Event::StateChanged { from, to });
            }
        }
    }
}
