//! # pushi-transport
//!
//! Transport layer for the Pushi realtime client.
//!
//! The client core is transport-agnostic: it drives a [`Connector`] that
//! yields a sink/stream pair of text frames, and an [`AuthTransport`] for
//! the subscription auth callback. This crate ships the production
//! implementations (tokio-tungstenite WebSocket, reqwest HTTP) and an
//! in-memory [`mock`] used for deterministic tests.

pub mod http;
pub mod mock;
pub mod traits;
#[cfg(feature = "websocket")]
pub mod websocket;

pub use http::HttpAuthTransport;
pub use traits::{AuthTransport, Connector, SocketSink, SocketStream, TransportError};
#[cfg(feature = "websocket")]
pub use websocket::WsConnector;
