//! Work handed from webhook threads to the poll loop thread
//!
//! Webhook handlers run on arbitrary runtime worker threads, but sessions may
//! only be created and torn down on the poll loop thread. Handlers therefore
//! never touch a session directly: they push a [`Handoff`] onto the
//! [`HandoffQueue`] and the poll loop executes it on its next tick.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::registry::SharedSession;

/// Parameters of a session to be created, taken from a `meeting.rtms_started` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    pub stream_id: String,
    pub meeting_uuid: String,
    pub server_urls: String,
    pub signature: String,
}

/// A unit of work for the poll loop thread
#[derive(Debug)]
pub enum Handoff {
    /// Create, join and register a session
    Join(JoinRequest),
    /// Terminate a session that has already been removed from the registry
    Leave {
        stream_id: String,
        session: SharedSession,
    },
}

impl Handoff {
    pub fn stream_id(&self) -> &str {
        match self {
            Handoff::Join(request) => &request.stream_id,
            Handoff::Leave { stream_id, .. } => stream_id,
        }
    }
}

/// FIFO of pending handoffs, shared between webhook threads and the poll loop
///
/// Also remembers stream IDs whose stop arrived while no session was
/// registered, so a join that completes afterwards can be flagged as orphaned.
/// Cheap to clone; all clones share the same queue.
#[derive(Clone, Default)]
pub struct HandoffQueue {
    inner: Arc<Mutex<Pending>>,
}

#[derive(Default)]
struct Pending {
    handoffs: Vec<Handoff>,
    unmatched_stops: HashSet<String>,
}

impl HandoffQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append work to the back of the queue
    ///
    /// A join clears any earlier unmatched stop for its stream: that stop
    /// cannot have been meant for a session requested after it.
    pub fn enqueue(&self, handoff: Handoff) {
        let mut pending = self.lock();
        if let Handoff::Join(request) = &handoff {
            pending.unmatched_stops.remove(&request.stream_id);
        }
        pending.handoffs.push(handoff);
    }

    /// Take everything queued so far, in arrival order
    ///
    /// The list is swapped out under the same guard `enqueue` uses, so a
    /// concurrent enqueue lands either in this batch or in the next one.
    pub fn drain_all(&self) -> Vec<Handoff> {
        mem::take(&mut self.lock().handoffs)
    }

    /// Whether a join for `stream_id` is still waiting to be processed
    pub fn contains_join(&self, stream_id: &str) -> bool {
        self.lock()
            .handoffs
            .iter()
            .any(|h| matches!(h, Handoff::Join(request) if request.stream_id == stream_id))
    }

    /// Record a stop that found no registered session for `stream_id`
    pub fn record_unmatched_stop(&self, stream_id: &str) {
        self.lock().unmatched_stops.insert(stream_id.to_string());
    }

    /// Consume the unmatched-stop marker for `stream_id`, if there is one
    pub fn take_unmatched_stop(&self, stream_id: &str) -> bool {
        self.lock().unmatched_stops.remove(stream_id)
    }

    pub fn len(&self) -> usize {
        self.lock().handoffs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().handoffs.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Pending> {
        // Neither field has an invariant a panicking holder could break.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
