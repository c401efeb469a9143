//! Client errors.

use pushi_protocol::ProtocolError;
use pushi_transport::TransportError;
use thiserror::Error;

/// Errors surfaced by the client facade.
///
/// Connection lifecycle errors never appear here; they surface through the
/// `connect`/`disconnect` listeners. Auth denials after the fail-fast
/// endpoint check are swallowed by design.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A private/presence channel was subscribed without an auth endpoint.
    #[error("no auth endpoint configured for authenticated channel subscription")]
    MissingAuthEndpoint,

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}
