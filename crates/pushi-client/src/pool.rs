//! Connection pool.
//!
//! The pool maps application keys to primary handles and owns their
//! connection tasks. The first `open` for a key creates the primary and its
//! physical connection; later opens return clones multiplexed over the same
//! socket. `close`/`close_all` tear the connection down, which the original
//! process-wide registry never could.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use pushi_core::OutboundQueue;
use pushi_transport::{AuthTransport, Connector, HttpAuthTransport, WsConnector};
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::auth::SubscriptionAuthenticator;
use crate::client::{Handle, PushiClient};
use crate::config::ClientOptions;
use crate::connection::ConnectionManager;
use crate::registry::SubscriberRegistry;

struct PoolEntry {
    primary: Arc<Handle>,
    registry: Arc<SubscriberRegistry>,
    task: JoinHandle<()>,
}

impl Drop for PoolEntry {
    fn drop(&mut self) {
        self.task.abort();
        // The aborted task can no longer observe the teardown, so the
        // subscribers are notified here. Handles that already saw the
        // socket close are left alone.
        for handle in self.registry.snapshot() {
            if handle.connection_state().is_connected() {
                handle.on_disconnect();
            }
        }
    }
}

/// Owns one physical connection per application key.
pub struct ClientPool {
    connector: Arc<dyn Connector>,
    auth: Arc<dyn AuthTransport>,
    entries: DashMap<String, PoolEntry>,
}

impl Default for ClientPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientPool {
    /// Create a pool over the production transports (WebSocket + HTTP).
    #[must_use]
    pub fn new() -> Self {
        Self::with_transports(
            Arc::new(WsConnector::new()),
            Arc::new(HttpAuthTransport::new()),
        )
    }

    /// Create a pool over custom transports.
    #[must_use]
    pub fn with_transports(connector: Arc<dyn Connector>, auth: Arc<dyn AuthTransport>) -> Self {
        Self {
            connector,
            auth,
            entries: DashMap::new(),
        }
    }

    /// Open a client handle for an application key.
    ///
    /// The first open for a key becomes the primary and opens the physical
    /// connection using `options`. Subsequent opens become clones of that
    /// primary: they share its socket, options, and current connection
    /// state (the passed `options` are ignored), start with empty channel
    /// and event maps, and observe an already-connected primary through a
    /// `connect` event on the next tick.
    ///
    /// Must be called within a Tokio runtime.
    pub fn open(&self, app_key: &str, options: ClientOptions) -> PushiClient {
        // The entry holds the key's shard lock across the check and the
        // insert, so concurrent opens for one key settle on one primary.
        match self.entries.entry(app_key.to_string()) {
            Entry::Occupied(occupied) => self.open_clone(occupied.get()),
            Entry::Vacant(vacant) => {
                let (outbound, outbound_rx) = OutboundQueue::new();
                let authenticator =
                    Arc::new(SubscriptionAuthenticator::new(Arc::clone(&self.auth)));
                let url = options.url_for(app_key);
                let timeout = options.timeout();

                let primary = Arc::new(Handle::primary(app_key, options, outbound, authenticator));
                let registry = Arc::new(SubscriberRegistry::new());
                registry.register(&primary);

                let manager = ConnectionManager::new(
                    url.clone(),
                    timeout,
                    Arc::clone(&self.connector),
                    Arc::clone(&registry),
                );
                let task = tokio::spawn(manager.run(outbound_rx));

                info!(app_key = %app_key, url = %url, "Opened primary connection");

                vacant.insert(PoolEntry {
                    primary: Arc::clone(&primary),
                    registry,
                    task,
                });

                PushiClient::new(primary)
            }
        }
    }

    fn open_clone(&self, entry: &PoolEntry) -> PushiClient {
        let handle = Arc::new(Handle::clone_of(&entry.primary));
        entry.registry.register(&handle);

        debug!(
            app_key = %handle.app_key(),
            subscribers = entry.registry.len(),
            "Opened clone handle"
        );

        // An already-connected primary is simulated for the clone on the
        // next tick, so listeners bound right after open still observe it
        if let Some(socket_id) = handle.socket_id() {
            let clone = Arc::clone(&handle);
            tokio::spawn(async move {
                clone.trigger(
                    pushi_core::events::local::CONNECT,
                    &[Value::String(socket_id)],
                );
            });
        }

        PushiClient::new(handle)
    }

    /// Close the connection for an application key.
    ///
    /// Aborts the connection task and drops the entry; existing handles for
    /// the key keep their local state but are permanently disconnected.
    /// Returns `true` if the key was open.
    pub fn close(&self, app_key: &str) -> bool {
        let removed = self.entries.remove(app_key).is_some();
        if removed {
            info!(app_key = %app_key, "Closed connection");
        }
        removed
    }

    /// Close every connection in the pool.
    pub fn close_all(&self) {
        self.entries.clear();
        info!("Closed all connections");
    }

    /// Whether a connection is open for the key.
    #[must_use]
    pub fn contains(&self, app_key: &str) -> bool {
        self.entries.contains_key(app_key)
    }

    /// Number of open connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the pool has no open connections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
