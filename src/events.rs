//! Observer registry with disposer handles.
//!
//! Components own an explicit listener list rather than publishing to a
//! global event bus. `add` returns a [`ListenerId`] that acts as the
//! disposer: pass it back to `remove` to unsubscribe.
//!
//! # Thread Safety
//!
//! Listeners are `Send + Sync` closures behind `Arc`; notification clones
//! the listener list out of the lock before invoking, so callbacks may
//! re-enter the owning component without deadlocking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Handle identifying a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// A set of listeners for events of type `E`.
pub struct ListenerSet<E> {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(ListenerId, Arc<dyn Fn(&E) + Send + Sync>)>>,
}

impl<E> ListenerSet<E> {
    /// Create an empty listener set.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Register a listener and return its disposer handle.
    pub fn add(&self, listener: impl Fn(&E) + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener by handle.
    ///
    /// Returns `true` if the listener was registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// Invoke all listeners with the event.
    ///
    /// The listener list is snapshotted before invocation so a callback may
    /// add or remove listeners (including itself).
    pub fn notify(&self, event: &E) {
        let snapshot: Vec<_> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in snapshot {
            listener(event);
        }
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    /// True if no listeners are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove all listeners.
    pub fn clear(&self) {
        self.listeners.lock().clear();
    }
}

impl<E> Default for ListenerSet<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for ListenerSet<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet")
            .field("len", &self.len())
            .finish()
    }
}
