//! # pushi-client
//!
//! Reconnecting, multiplexed pub/sub client for the Pushi realtime
//! messaging service.
//!
//! A [`ClientPool`] owns one physical socket per application key. The first
//! handle opened for a key is the *primary*; later handles are *clones*
//! sharing the primary's socket with independent channel maps and event
//! buses. The pool transparently manages the connection lifecycle: connect,
//! handshake, subscription authentication, disconnect detection, and
//! fixed-delay retry.
//!
//! ## Example
//!
//! ```no_run
//! use pushi_client::{ClientOptions, ClientPool};
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), pushi_client::ClientError> {
//! let pool = ClientPool::new();
//! let client = pool.open(
//!     "my-app-key",
//!     ClientOptions::default().with_auth_endpoint("https://example.com/auth"),
//! );
//!
//! client.bind("connect", |args| {
//!     println!("connected with socket id {:?}", args);
//! });
//!
//! let room = client.subscribe("chat-room")?;
//! room.trigger("message:new", json!({"body": "hello"}));
//! # Ok(())
//! # }
//! ```

pub mod auth;
mod client;
pub mod config;
mod connection;
mod error;
mod pool;
mod registry;

pub use auth::{AuthError, AuthToken, SubscriptionAuthenticator};
pub use client::PushiClient;
pub use config::ClientOptions;
pub use error::ClientError;
pub use pool::ClientPool;

// Core types callers interact with directly
pub use pushi_core::{BindingId, Channel, ChannelKind, ConnectionState};
pub use pushi_protocol::OutboundFrame;
