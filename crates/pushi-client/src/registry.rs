//! Subscriber registry for one physical connection.
//!
//! The registry holds weak references to every handle (primary plus clones)
//! sharing a socket. Dispatch iterates over a snapshot, so handles may be
//! registered or dropped while a dispatch pass is running.

use std::sync::{Arc, Mutex, Weak};

use crate::client::Handle;

/// Weak-reference list of the handles sharing one socket, in registration
/// order.
#[derive(Default)]
pub(crate) struct SubscriberRegistry {
    subscribers: Mutex<Vec<Weak<Handle>>>,
}

impl SubscriberRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append a handle to the registration order.
    pub(crate) fn register(&self, handle: &Arc<Handle>) {
        self.subscribers.lock().unwrap().push(Arc::downgrade(handle));
    }

    /// Snapshot the live handles, pruning dropped ones.
    pub(crate) fn snapshot(&self) -> Vec<Arc<Handle>> {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|weak| weak.strong_count() > 0);
        subscribers.iter().filter_map(Weak::upgrade).collect()
    }

    /// Number of live handles.
    pub(crate) fn len(&self) -> usize {
        self.snapshot().len()
    }
}
