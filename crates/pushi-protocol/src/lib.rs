//! # pushi-protocol
//!
//! Wire protocol definitions for the Pushi realtime messaging client.
//!
//! The service speaks JSON text frames over a single persistent socket.
//! This crate defines the frame shapes exchanged with the service, a strict
//! per-event decoder for inbound frames, and builders for outbound frames.
//!
//! ## Frame Types
//!
//! - `Subscribe` / `SubscribeAuthenticated` - Channel membership
//! - `Event` / `ChannelEvent` - Publish events to the service
//! - `InboundEvent` - Typed view over inbound frames (handshake,
//!   subscription confirmations, presence membership, generic events)
//!
//! ## Example
//!
//! ```rust
//! use pushi_protocol::{codec, InboundEvent, OutboundFrame};
//!
//! let frame = OutboundFrame::subscribe("chat-lobby");
//! let text = codec::encode(&frame).unwrap();
//!
//! let raw = codec::decode(r#"{"event":"ping","data":null}"#).unwrap();
//! let event = InboundEvent::classify(&raw).unwrap();
//! assert!(matches!(event, InboundEvent::Other));
//! ```

pub mod codec;
pub mod frames;

pub use codec::{decode, encode, ProtocolError};
pub use frames::{events, InboundEvent, OutboundFrame, RawFrame};
