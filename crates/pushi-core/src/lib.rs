//! # pushi-core
//!
//! Core building blocks for the Pushi realtime client.
//!
//! This crate provides the pieces shared by every client handle:
//!
//! - **EventBus** - Per-handle mapping from event name to ordered listeners
//! - **Channel** - Named pub/sub handle bound to the shared outbound queue
//! - **OutboundQueue** - Fire-and-forget frame sender shared by all handles
//!   multiplexed over one physical socket
//! - **ConnectionState** - Per-handle connection lifecycle state

pub mod channel;
pub mod events;
pub mod outbound;
pub mod state;

pub use channel::{is_peer_channel, Channel, ChannelKind};
pub use events::{BindingId, EventBus};
pub use outbound::OutboundQueue;
pub use state::ConnectionState;
