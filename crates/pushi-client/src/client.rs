//! The client facade.
//!
//! A [`PushiClient`] represents one logical application connection. The
//! first handle opened for an application key is the *primary* and owns the
//! physical connection; later handles for the same key are *clones* sharing
//! the primary's socket while keeping their own channel map and event bus.

use pushi_core::events::local;
use pushi_core::{
    is_peer_channel, BindingId, Channel, ChannelKind, ConnectionState, EventBus, OutboundQueue,
};
use pushi_protocol::{InboundEvent, OutboundFrame, RawFrame};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use tracing::{debug, trace, warn};

use crate::auth::SubscriptionAuthenticator;
use crate::config::ClientOptions;
use crate::error::ClientError;

pub(crate) struct HandleState {
    pub(crate) connection: ConnectionState,
    pub(crate) socket_id: Option<String>,
    pub(crate) channels: HashMap<String, Channel>,
}

/// Per-handle state and dispatch targets.
///
/// One `Handle` exists per logical client; the subscriber registry holds
/// weak references to them for frame dispatch.
pub(crate) struct Handle {
    app_key: String,
    options: ClientOptions,
    is_clone: bool,
    primary: Option<Weak<Handle>>,
    outbound: OutboundQueue,
    authenticator: Arc<SubscriptionAuthenticator>,
    state: Mutex<HandleState>,
    events: Mutex<EventBus>,
}

impl Handle {
    pub(crate) fn primary(
        app_key: impl Into<String>,
        options: ClientOptions,
        outbound: OutboundQueue,
        authenticator: Arc<SubscriptionAuthenticator>,
    ) -> Self {
        Self {
            app_key: app_key.into(),
            options,
            is_clone: false,
            primary: None,
            outbound,
            authenticator,
            state: Mutex::new(HandleState {
                connection: ConnectionState::Disconnected,
                socket_id: None,
                channels: HashMap::new(),
            }),
            events: Mutex::new(EventBus::new()),
        }
    }

    /// Create a clone of a primary: same key, options, outbound queue, and
    /// current connection state; empty channel map and event bus.
    pub(crate) fn clone_of(primary: &Arc<Handle>) -> Self {
        let (connection, socket_id) = {
            let state = primary.state.lock().unwrap();
            (state.connection, state.socket_id.clone())
        };
        Self {
            app_key: primary.app_key.clone(),
            options: primary.options.clone(),
            is_clone: true,
            primary: Some(Arc::downgrade(primary)),
            outbound: primary.outbound.clone(),
            authenticator: Arc::clone(&primary.authenticator),
            state: Mutex::new(HandleState {
                connection,
                socket_id,
                channels: HashMap::new(),
            }),
            events: Mutex::new(EventBus::new()),
        }
    }

    pub(crate) fn app_key(&self) -> &str {
        &self.app_key
    }

    pub(crate) fn is_clone(&self) -> bool {
        self.is_clone
    }

    pub(crate) fn connection_state(&self) -> ConnectionState {
        self.state.lock().unwrap().connection
    }

    pub(crate) fn socket_id(&self) -> Option<String> {
        self.state.lock().unwrap().socket_id.clone()
    }

    pub(crate) fn channel(&self, name: &str) -> Option<Channel> {
        self.state.lock().unwrap().channels.get(name).cloned()
    }

    pub(crate) fn bind(
        &self,
        event: impl Into<String>,
        listener: impl Fn(&[Value]) + Send + Sync + 'static,
    ) -> BindingId {
        self.events.lock().unwrap().bind(event, listener)
    }

    pub(crate) fn unbind(&self, event: &str, id: BindingId) -> bool {
        self.events.lock().unwrap().unbind(event, id)
    }

    /// Invoke the listeners bound to `event` on this handle, in order.
    ///
    /// The listener snapshot is taken before invocation so a listener may
    /// bind or unbind without deadlocking the bus.
    pub(crate) fn trigger(&self, event: &str, args: &[Value]) {
        let listeners = self.events.lock().unwrap().snapshot(event);
        for listener in listeners {
            listener(args);
        }
    }

    /// Connect handler: records the socket id and notifies listeners.
    pub(crate) fn on_connect(&self, socket_id: &str) {
        {
            let mut state = self.state.lock().unwrap();
            state.connection = ConnectionState::Connected;
            state.socket_id = Some(socket_id.to_string());
        }
        debug!(
            app_key = %self.app_key,
            socket_id = %socket_id,
            clone = self.is_clone,
            "Connected"
        );
        self.trigger(local::CONNECT, &[Value::String(socket_id.to_string())]);
    }

    /// Disconnect handler: clears connection state and the channel map.
    pub(crate) fn on_disconnect(&self) {
        {
            let mut state = self.state.lock().unwrap();
            state.connection = ConnectionState::Disconnected;
            state.socket_id = None;
            state.channels.clear();
        }
        debug!(app_key = %self.app_key, clone = self.is_clone, "Disconnected");
        self.trigger(local::DISCONNECT, &[]);
    }

    /// Message handler for an already-connected handle.
    ///
    /// A frame addressed to a channel this handle has not subscribed to
    /// (and that is not a peer channel) is dropped: this is the per-handle
    /// filtering that lets one socket multiplex independent subscription
    /// sets across clones.
    pub(crate) fn on_message(&self, raw: &RawFrame, event: &InboundEvent) {
        if let Some(channel) = &raw.channel {
            let subscribed = self.state.lock().unwrap().channels.contains_key(channel);
            if !subscribed && !is_peer_channel(channel) {
                trace!(app_key = %self.app_key, channel = %channel, "Frame not addressed to this handle");
                return;
            }
        }

        match event {
            InboundEvent::SubscriptionSucceeded { channel, data } => {
                self.trigger(
                    local::SUBSCRIBE,
                    &[Value::String(channel.clone()), data.clone()],
                );
            }
            InboundEvent::MemberAdded { channel, member } => {
                self.trigger(
                    local::MEMBER_ADDED,
                    &[Value::String(channel.clone()), member.clone()],
                );
            }
            InboundEvent::MemberRemoved { channel, member } => {
                self.trigger(
                    local::MEMBER_REMOVED,
                    &[Value::String(channel.clone()), member.clone()],
                );
            }
            _ => {}
        }

        // Application code may bind directly to service-defined event names
        let data = raw.data.clone().unwrap_or(Value::Null);
        let channel = raw
            .channel
            .clone()
            .map_or(Value::Null, Value::String);
        self.trigger(&raw.event, &[data, channel]);
    }

    /// Subscribe this handle to a channel. See [`PushiClient::subscribe`].
    pub(crate) fn subscribe(self: &Arc<Self>, name: &str) -> Result<Channel, ClientError> {
        if let Some(existing) = self.channel(name) {
            return Ok(existing);
        }

        // Clone short-circuit: when the primary already holds the channel
        // there is no remote call to perform; alias its channel and defer a
        // local confirmation to the next tick.
        if let Some(primary) = self.primary.as_ref().and_then(Weak::upgrade) {
            if let Some(channel) = primary.channel(name) {
                self.state
                    .lock()
                    .unwrap()
                    .channels
                    .insert(name.to_string(), channel.clone());

                let this = Arc::clone(self);
                let channel_name = name.to_string();
                tokio::spawn(async move {
                    this.trigger(
                        local::SUBSCRIBE,
                        &[Value::String(channel_name), Value::Null],
                    );
                });
                return Ok(channel);
            }
        }

        let kind = ChannelKind::classify(name);
        if kind.requires_auth() {
            self.subscribe_authenticated(name)?;
        } else {
            self.outbound.push(OutboundFrame::subscribe(name));
        }

        // Optimistic: the channel is usable immediately; the service's
        // confirmation arrives later through the message dispatch path.
        let channel = Channel::new(name, kind, self.outbound.clone());
        self.state
            .lock()
            .unwrap()
            .channels
            .insert(name.to_string(), channel.clone());
        Ok(channel)
    }

    /// Issue the auth handshake for a private/presence subscription.
    ///
    /// Fails fast when no auth endpoint is configured; any failure after
    /// that point only drops the attempt (the service never receives the
    /// subscribe frame).
    fn subscribe_authenticated(self: &Arc<Self>, name: &str) -> Result<(), ClientError> {
        let endpoint = self
            .options
            .auth_endpoint
            .clone()
            .ok_or(ClientError::MissingAuthEndpoint)?;

        let socket_id = self.socket_id().unwrap_or_default();
        let authenticator = Arc::clone(&self.authenticator);
        let outbound = self.outbound.clone();
        let channel_name = name.to_string();

        tokio::spawn(async move {
            match authenticator
                .authenticate(&endpoint, &socket_id, &channel_name)
                .await
            {
                Ok(Some(token)) => {
                    outbound.push(OutboundFrame::subscribe_authenticated(
                        channel_name,
                        token.auth,
                        token.channel_data,
                    ));
                }
                Ok(None) => {
                    debug!(channel = %channel_name, "Subscription dropped: auth denied");
                }
                Err(e) => {
                    warn!(channel = %channel_name, "Subscription dropped: {}", e);
                }
            }
        });
        Ok(())
    }
}

/// A logical client connection to the service.
///
/// Cloning a `PushiClient` yields another reference to the *same* handle;
/// to obtain an independent handle sharing the socket, open the same
/// application key on the pool again.
#[derive(Clone)]
pub struct PushiClient {
    handle: Arc<Handle>,
}

impl PushiClient {
    pub(crate) fn new(handle: Arc<Handle>) -> Self {
        Self { handle }
    }

    /// The application key this client was opened with.
    #[must_use]
    pub fn app_key(&self) -> &str {
        self.handle.app_key()
    }

    /// Whether this handle is a clone sharing a primary's socket.
    #[must_use]
    pub fn is_clone(&self) -> bool {
        self.handle.is_clone()
    }

    /// Current connection state of this handle.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.handle.connection_state()
    }

    /// Service-assigned socket identifier.
    ///
    /// `Some` iff the handle is connected.
    #[must_use]
    pub fn socket_id(&self) -> Option<String> {
        self.handle.socket_id()
    }

    /// Bind a listener to an event name on this handle's private bus.
    pub fn bind(
        &self,
        event: impl Into<String>,
        listener: impl Fn(&[Value]) + Send + Sync + 'static,
    ) -> BindingId {
        self.handle.bind(event, listener)
    }

    /// Remove a previously bound listener.
    pub fn unbind(&self, event: &str, id: BindingId) -> bool {
        self.handle.unbind(event, id)
    }

    /// Invoke every listener bound to `event`, in registration order.
    pub fn trigger(&self, event: &str, args: &[Value]) {
        self.handle.trigger(event, args);
    }

    /// Subscribe to a channel.
    ///
    /// Idempotent per handle: a repeat call returns the cached [`Channel`]
    /// without sending a second frame. Private (`private-`) and presence
    /// (`presence-`) channels take the authenticated path and fail fast
    /// with [`ClientError::MissingAuthEndpoint`] when no endpoint is
    /// configured.
    ///
    /// The returned channel is optimistic: the service's confirmation
    /// surfaces later through a `subscribe` event.
    ///
    /// Must be called within a Tokio runtime: authenticated subscriptions
    /// and clone-side confirmations defer work to spawned tasks.
    ///
    /// # Errors
    ///
    /// Returns an error only for the fail-fast configuration check; auth
    /// denials and network failures are absorbed silently.
    pub fn subscribe(&self, name: &str) -> Result<Channel, ClientError> {
        self.handle.subscribe(name)
    }

    /// Look up a subscribed channel by name.
    #[must_use]
    pub fn channel(&self, name: &str) -> Option<Channel> {
        self.handle.channel(name)
    }

    /// Enqueue a frame on the physical socket, fire-and-forget.
    pub fn send(&self, frame: OutboundFrame) {
        self.handle.outbound.push(frame);
    }

    /// Publish an event without a channel.
    pub fn send_event(&self, event: impl Into<String>, data: Value) {
        self.send(OutboundFrame::event(event, data));
    }

    /// Publish an event on a channel.
    pub fn send_channel(
        &self,
        event: impl Into<String>,
        data: Value,
        channel: impl Into<String>,
    ) {
        self.send(OutboundFrame::channel_event(event, data, channel));
    }
}
