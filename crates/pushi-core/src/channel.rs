//! Channel abstraction for the Pushi client.
//!
//! A channel is a lightweight named handle over the shared outbound queue.
//! Channels are created on first subscribe, cached per client handle, and
//! aliased (not copied) when a clone handle joins a channel its primary
//! already holds.

use crate::outbound::OutboundQueue;
use pushi_protocol::OutboundFrame;
use serde_json::Value;
use std::sync::Arc;

/// Name prefix marking a private (authenticated) channel.
pub const PRIVATE_PREFIX: &str = "private-";

/// Name prefix marking a presence (authenticated + membership) channel.
pub const PRESENCE_PREFIX: &str = "presence-";

/// Name prefix marking a peer channel, exempt from per-handle filtering.
pub const PEER_PREFIX: &str = "peer-";

/// Channel classification, computed once at subscribe time from the name
/// prefix and carried on the channel thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// No authentication required.
    Public,
    /// Requires the auth handshake before subscribing.
    Private,
    /// Requires the auth handshake; carries membership events.
    Presence,
}

impl ChannelKind {
    /// Classify a channel name by its prefix.
    #[must_use]
    pub fn classify(name: &str) -> Self {
        if name.starts_with(PRESENCE_PREFIX) {
            ChannelKind::Presence
        } else if name.starts_with(PRIVATE_PREFIX) {
            ChannelKind::Private
        } else {
            ChannelKind::Public
        }
    }

    /// Whether subscribing requires the auth handshake.
    #[must_use]
    pub fn requires_auth(self) -> bool {
        matches!(self, ChannelKind::Private | ChannelKind::Presence)
    }
}

/// Whether a channel name is a peer channel.
///
/// Frames addressed to peer channels bypass the per-handle subscription
/// filter during dispatch.
#[must_use]
pub fn is_peer_channel(name: &str) -> bool {
    name.starts_with(PEER_PREFIX)
}

#[derive(Debug)]
struct ChannelInner {
    name: String,
    kind: ChannelKind,
    outbound: OutboundQueue,
}

/// A named pub/sub handle bound to one physical connection.
///
/// Cloning is cheap and preserves identity: a clone handle that aliases its
/// primary's channel observes the same underlying entity, which
/// [`Channel::same_channel`] makes observable.
#[derive(Debug, Clone)]
pub struct Channel {
    inner: Arc<ChannelInner>,
}

impl Channel {
    /// Create a new channel bound to the shared outbound queue.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ChannelKind, outbound: OutboundQueue) -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                name: name.into(),
                kind,
                outbound,
            }),
        }
    }

    /// Get the channel name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Get the channel kind.
    #[must_use]
    pub fn kind(&self) -> ChannelKind {
        self.inner.kind
    }

    /// Publish an event on this channel, fire-and-forget.
    pub fn trigger(&self, event: impl Into<String>, data: Value) {
        self.inner.outbound.push(OutboundFrame::channel_event(
            event,
            data,
            self.inner.name.clone(),
        ));
    }

    /// Whether two handles refer to the same underlying channel entity.
    #[must_use]
    pub fn same_channel(&self, other: &Channel) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
