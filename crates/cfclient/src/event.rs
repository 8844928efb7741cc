//! Events delivered to external collaborators.
//!
//! Everything the engine learns from the server reaches consumers as an
//! [`Event`] through one [`EventSink`] trait. A renderer, an inventory
//! tracker and a chat log all implement the same `handle` method and match
//! on the variants they care about.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use cfclient_protocol::{Command, MapDelta, MapUpdate, ProtocolError};
use cfclient_session::ConnectionState;

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// Something that happened on the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A decoded command other than `map2`.
    Command(Command),
    /// A `map2` update starts. Deltas follow until [`Event::MapEnd`].
    MapBegin,
    Map(MapDelta),
    MapEnd,
    StateChanged {
        from: ConnectionState,
        to: ConnectionState,
    },
    /// A message was dropped because it could not be decoded. The
    /// connection continues.
    ProtocolError(ProtocolError),
    /// The connection is gone. Sent exactly once per connection.
    Disconnected { reason: String, is_error: bool },
}

impl From<MapUpdate<'_>> for Event {
    fn from(update: MapUpdate<'_>) -> Self {
        match update {
            MapUpdate::Begin => Event::MapBegin,
            MapUpdate::Delta(delta) => Event::Map(*delta),
            MapUpdate::End => Event::MapEnd,
        }
    }
}

// ---------------------------------------------------------------------------
// EventSink
// ---------------------------------------------------------------------------

/// A consumer of connection events.
///
/// `handle` runs on the connection's reader task, in wire order. It must
/// return quickly: slow work belongs on another task.
pub trait EventSink: Send + Sync + 'static {
    fn handle(&self, event: &Event);
}

impl<F> EventSink for F
where
    F: Fn(&Event) + Send + Sync + 'static,
{
    fn handle(&self, event: &Event) {
        self(event)
    }
}

/// Handle returned by [`SinkRegistry::add`], used to remove the sink again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SinkId(u64);

impl fmt::Display for SinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sink-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// SinkRegistry
// ---------------------------------------------------------------------------

type SinkList = Arc<Vec<(SinkId, Arc<dyn EventSink>)>>;

/// Fans events out to every registered sink in registration order.
///
/// The list is copy-on-write: dispatch works on a snapshot, so a sink may
/// add or remove sinks from inside `handle` without deadlocking. The change
/// takes effect with the next event.
#[derive(Default)]
pub struct SinkRegistry {
    sinks: RwLock<SinkList>,
    next_id: AtomicU64,
}

impl SinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, sink: Arc<dyn EventSink>) -> SinkId {
        let id = SinkId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut sinks = self.sinks.write().unwrap_or_else(PoisonError::into_inner);
        let mut list = Vec::clone(&sinks);
        list.push((id, sink));
        *sinks = Arc::new(list);
        id
    }

    /// Returns `false` if `id` was not registered.
    pub fn remove(&self, id: SinkId) -> bool {
        let mut sinks = self.sinks.write().unwrap_or_else(PoisonError::into_inner);
        let Some(index) = sinks.iter().position(|(sid, _)| *sid == id) else {
            return false;
        };
        let mut list = Vec::clone(&sinks);
        list.remove(index);
        *sinks = Arc::new(list);
        true
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dispatch(&self, event: &Event) {
        for (_, sink) in self.snapshot().iter() {
            sink.handle(event);
        }
    }

    fn snapshot(&self) -> SinkList {
        Arc::clone(&self.sinks.read().unwrap_or_else(PoisonError::into_inner))
    }
}

impl fmt::Debug for SinkRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkRegistry").field("sinks", &self.len()).finish()
    }
}
