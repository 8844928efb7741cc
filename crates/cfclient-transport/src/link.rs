//! Exactly-once reporting of a lost connection.
//!
//! Both halves of a connection can notice that the link is gone: the reader
//! sees EOF or an I/O error, a writer sees a failed `write_all`. Whichever
//! notices first wins; every later report is swallowed so the owner hears
//! about the loss exactly once.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Counter for generating unique link IDs.
static NEXT_LINK_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one physical connection attempt, for log correlation.
///
/// A reconnect gets a fresh id, so log lines from an old reader task that is
/// still winding down can be told apart from the new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(u64);

impl LinkId {
    /// Allocates the next process-wide link id.
    pub fn next() -> Self {
        Self(NEXT_LINK_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link-{}", self.0)
    }
}

/// Why a link went down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkLoss {
    /// Which link was lost.
    pub link: LinkId,
    /// Human-readable reason ("EOF", the I/O error text, "disconnect", ...).
    pub reason: String,
    /// `false` for an orderly close or a local disconnect.
    pub is_error: bool,
}

type LossCallback = Box<dyn Fn(&LinkLoss) + Send + Sync>;

/// Shared between the reader and the writer of one link.
pub struct LinkMonitor {
    id: LinkId,
    lost: AtomicBool,
    on_lost: LossCallback,
}

impl LinkMonitor {
    /// Creates a monitor for a new link that calls `on_lost` once.
    pub fn new(on_lost: impl Fn(&LinkLoss) + Send + Sync + 'static) -> Self {
        Self {
            id: LinkId::next(),
            lost: AtomicBool::new(false),
            on_lost: Box::new(on_lost),
        }
    }

    /// The id of the monitored link.
    pub fn id(&self) -> LinkId {
        self.id
    }

    /// Marks the link as lost.
    ///
    /// Returns `true` (and runs the callback) only for the first report.
    pub fn report_lost(&self, reason: impl Into<String>, is_error: bool) -> bool {
        if self.lost.swap(true, Ordering::AcqRel) {
            return false;
        }
        let loss = LinkLoss {
            link: self.id,
            reason: reason.into(),
            is_error,
        };
        if is_error {
            tracing::warn!(link = %loss.link, reason = %loss.reason, "connection lost");
        } else {
            tracing::info!(link = %loss.link, reason = %loss.reason, "connection closed");
        }
        (self.on_lost)(&loss);
        true
    }

    /// Returns `true` once the link has been reported lost.
    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::Acquire)
    }
}

impl fmt::Debug for LinkMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkMonitor")
            .field("id", &self.id)
            .field("lost", &self.is_lost())
            .finish_non_exhaustive()
    }
}
