//! Private/presence channel subscription authentication.
//!
//! Subscribing to an authenticated channel requires a token from an
//! application-provided HTTP endpoint. The endpoint receives the socket id
//! and channel name as query parameters and answers with a JSON body; a
//! body without an `auth` field is a denial, which drops the subscription
//! attempt silently.

use pushi_transport::{AuthTransport, TransportError};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Auth handshake errors.
///
/// These never reach the subscribing caller; the subscribe path logs them
/// and treats the attempt like a denial.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The HTTP request failed.
    #[error("auth request failed: {0}")]
    Request(#[from] TransportError),

    /// The response body was not valid JSON.
    #[error("invalid auth response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

/// Token granted by the auth endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthToken {
    /// The auth token to include in the subscribe frame.
    pub auth: String,
    /// Opaque channel data forwarded alongside the token.
    pub channel_data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    auth: Option<String>,
    #[serde(default)]
    channel_data: Option<String>,
}

/// Performs the auth handshake against the application's endpoint.
pub struct SubscriptionAuthenticator {
    transport: Arc<dyn AuthTransport>,
}

impl SubscriptionAuthenticator {
    /// Create an authenticator over the given HTTP transport.
    #[must_use]
    pub fn new(transport: Arc<dyn AuthTransport>) -> Self {
        Self { transport }
    }

    /// Request an auth token for a channel subscription.
    ///
    /// Returns `Ok(None)` when the endpoint denies the subscription by
    /// omitting the `auth` field.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not JSON.
    pub async fn authenticate(
        &self,
        endpoint: &str,
        socket_id: &str,
        channel: &str,
    ) -> Result<Option<AuthToken>, AuthError> {
        let url = format!("{endpoint}?socket_id={socket_id}&channel={channel}");
        let body = self.transport.get(&url).await?;
        let response: AuthResponse = serde_json::from_str(&body)?;

        match response.auth {
            Some(auth) => Ok(Some(AuthToken {
                auth,
                channel_data: response.channel_data,
            })),
            None => {
                debug!(channel = %channel, "Auth endpoint denied subscription");
                Ok(None)
            }
        }
    }
}
