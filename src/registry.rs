use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

/// Why an in-flight request was cancelled.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CancelReason {
    /// A newer request with the same identity was dispatched.
    Superseded,
    /// The caller aborted the request explicitly.
    Aborted,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Superseded => f.write_str("superseded"),
            CancelReason::Aborted => f.write_str("aborted"),
        }
    }
}

struct Entry {
    generation: u64,
    cancel: oneshot::Sender<CancelReason>,
}

struct State {
    entries: HashMap<String, Entry>,
    next_generation: u64,
}

/// Process-wide map from request identity to a cancellation handle.
///
/// At most one entry exists per identity: registering over a live entry
/// delivers [`CancelReason::Superseded`] to its owner before the new entry is
/// stored. Mutations are synchronous under the lock, so a superseded request
/// is always cancelled before its successor starts transport.
pub(crate) struct InFlightRegistry {
    state: Mutex<State>,
}

/// Proof of a registration; releases it on drop.
///
/// Dropping the ticket removes the entry even when the owning dispatch future
/// is dropped mid-flight, so the registry never leaks abandoned entries. The
/// generation stamp makes the release a no-op when the entry has already been
/// superseded, so a stale request's cleanup never evicts its successor.
pub(crate) struct Ticket {
    registry: Arc<InFlightRegistry>,
    key: String,
    generation: u64,
}

impl Drop for Ticket {
    fn drop(&mut self) {
        self.registry.release(&self.key, self.generation);
    }
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                entries: HashMap::new(),
                next_generation: 0,
            }),
        }
    }

    /// Registers `key`, cancelling any live entry for the same identity.
    ///
    /// Returns the release ticket and the channel on which a cancellation
    /// reason is delivered if this registration is later superseded or
    /// aborted.
    pub fn register(registry: &Arc<Self>, key: &str) -> (Ticket, oneshot::Receiver<CancelReason>) {
        let (cancel, cancelled) = oneshot::channel();
        let mut state = registry.lock();
        let generation = state.next_generation;
        state.next_generation += 1;
        let previous = state
            .entries
            .insert(key.to_owned(), Entry { generation, cancel });
        if let Some(previous) = previous {
            tracing::debug!(%key, "superseding in-flight request");
            let _ = previous.cancel.send(CancelReason::Superseded);
        }
        drop(state);
        (
            Ticket {
                registry: Arc::clone(registry),
                key: key.to_owned(),
                generation,
            },
            cancelled,
        )
    }

    /// Removes the entry a ticket registered, if it is still the live one.
    ///
    /// Idempotent: releasing after supersession or an abort is a no-op.
    fn release(&self, key: &str, generation: u64) {
        let mut state = self.lock();
        let live = state
            .entries
            .get(key)
            .is_some_and(|entry| entry.generation == generation);
        if live {
            state.entries.remove(key);
        }
    }

    /// Caller-initiated abort of the in-flight request for `key`.
    ///
    /// Returns whether a request was actually cancelled.
    pub fn abort(&self, key: &str) -> bool {
        let entry = self.lock().entries.remove(key);
        match entry {
            Some(entry) => {
                let _ = entry.cancel.send(CancelReason::Aborted);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // No await happens under the lock; poisoning can only come from a
        // panicking peer, whose state is still consistent here.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
