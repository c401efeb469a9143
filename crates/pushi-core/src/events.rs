//! Per-handle event bus.
//!
//! Each client handle owns its own bus; listeners are never shared between
//! handles multiplexed over one socket. Listeners fire in registration
//! order with all trigger arguments passed through.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Well-known local event names fired by the client itself.
pub mod local {
    /// Connection handshake completed on this handle.
    pub const CONNECT: &str = "connect";
    /// The socket closed; this handle is disconnected.
    pub const DISCONNECT: &str = "disconnect";
    /// A subscription was confirmed.
    pub const SUBSCRIBE: &str = "subscribe";
    /// A member joined a presence channel.
    pub const MEMBER_ADDED: &str = "member_added";
    /// A member left a presence channel.
    pub const MEMBER_REMOVED: &str = "member_removed";
}

/// A bound listener callback.
pub type Listener = Arc<dyn Fn(&[Value]) + Send + Sync>;

/// Identifier for one bound listener, used to unbind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingId(u64);

/// Atomic counter for unique binding ids across all buses.
static BINDING_COUNTER: AtomicU64 = AtomicU64::new(1);

impl BindingId {
    fn next() -> Self {
        Self(BINDING_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Event name to ordered listener list.
#[derive(Default)]
pub struct EventBus {
    listeners: HashMap<String, Vec<(BindingId, Listener)>>,
}

impl EventBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a listener to an event name.
    ///
    /// Returns the id needed to unbind it later.
    pub fn bind(
        &mut self,
        event: impl Into<String>,
        listener: impl Fn(&[Value]) + Send + Sync + 'static,
    ) -> BindingId {
        let id = BindingId::next();
        self.listeners
            .entry(event.into())
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Remove a previously bound listener.
    ///
    /// Returns `true` if the listener was bound to the event.
    pub fn unbind(&mut self, event: &str, id: BindingId) -> bool {
        let Some(bindings) = self.listeners.get_mut(event) else {
            return false;
        };
        let before = bindings.len();
        bindings.retain(|(bound, _)| *bound != id);
        bindings.len() != before
    }

    /// Snapshot the listeners for an event.
    ///
    /// Dispatch works on the snapshot so a listener that binds or unbinds
    /// during its own invocation cannot invalidate the iteration.
    #[must_use]
    pub fn snapshot(&self, event: &str) -> Vec<Listener> {
        self.listeners
            .get(event)
            .map(|bindings| bindings.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default()
    }

    /// Invoke every listener bound to `event`, in registration order.
    pub fn trigger(&self, event: &str, args: &[Value]) {
        let listeners = self.snapshot(event);
        if !listeners.is_empty() {
            trace!(event = %event, listeners = listeners.len(), "Triggering event");
        }
        for listener in listeners {
            listener(args);
        }
    }

    /// Number of listeners bound to an event.
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.get(event).map(Vec::len).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[test]
    fn test_bind_trigger_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();

        for tag in ["first", "second", "third"] {
            let calls = Arc::clone(&calls);
            bus.bind("ping", move |_| calls.lock().unwrap().push(tag));
        }

        bus.trigger("ping", &[]);
        assert_eq!(*calls.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_trigger_passes_arguments() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();

        let seen_ = Arc::clone(&seen);
        bus.bind("data", move |args| {
            seen_.lock().unwrap().extend_from_slice(args);
        });

        bus.trigger("data", &[json!("room"), json!({"id": 1})]);
        assert_eq!(*seen.lock().unwrap(), vec![json!("room"), json!({"id": 1})]);
    }

    #[test]
    fn test_unbind() {
        let calls = Arc::new(Mutex::new(0));
        let mut bus = EventBus::new();

        let calls_ = Arc::clone(&calls);
        let id = bus.bind("ping", move |_| *calls_.lock().unwrap() += 1);

        bus.trigger("ping", &[]);
        assert!(bus.unbind("ping", id));
        assert!(!bus.unbind("ping", id));
        bus.trigger("ping", &[]);

        assert_eq!(*calls.lock().unwrap(), 1);
        assert_eq!(bus.listener_count("ping"), 0);
    }

    #[test]
    fn test_trigger_unknown_event_is_noop() {
        let bus = EventBus::new();
        bus.trigger("nothing-bound", &[json!(1)]);
    }
}
