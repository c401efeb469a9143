//! Transport abstraction traits for the Pushi client.
//!
//! These traits define the seam between the connection manager and the
//! platform primitives: a bidirectional text-frame socket (assumed reliable
//! and ordered per connection) and an HTTP GET used by the subscription
//! auth handshake.

use async_trait::async_trait;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Opening the connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection was closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Failed to send data.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Failed to receive data.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Opens physical connections to the service.
///
/// The connection manager calls this once per (re)connection attempt; every
/// successful call yields a fresh socket that wholesale replaces the
/// previous one.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a connection, returning the write and read halves.
    async fn connect(
        &self,
        url: &str,
    ) -> Result<(Box<dyn SocketSink>, Box<dyn SocketStream>), TransportError>;

    /// Get the transport name (e.g., "websocket").
    fn name(&self) -> &'static str;
}

/// Write half of a socket.
#[async_trait]
pub trait SocketSink: Send {
    /// Write one text frame.
    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Close the connection gracefully.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Read half of a socket.
#[async_trait]
pub trait SocketStream: Send {
    /// Receive the next text frame.
    ///
    /// Returns `None` when the connection is closed, cleanly or not; the
    /// caller treats both the same way (disconnect, then retry).
    async fn recv(&mut self) -> Result<Option<String>, TransportError>;
}

/// HTTP GET primitive used by the subscription auth handshake.
#[async_trait]
pub trait AuthTransport: Send + Sync {
    /// Fetch a URL, returning the response body text.
    async fn get(&self, url: &str) -> Result<String, TransportError>;
}
