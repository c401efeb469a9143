//! HTTP transport for the subscription auth callback.

use async_trait::async_trait;
use tracing::debug;

use crate::traits::{AuthTransport, TransportError};

/// Production auth transport over reqwest.
#[derive(Debug, Clone, Default)]
pub struct HttpAuthTransport {
    client: reqwest::Client,
}

impl HttpAuthTransport {
    /// Create a transport with a fresh HTTP client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport reusing an existing HTTP client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AuthTransport for HttpAuthTransport {
    async fn get(&self, url: &str) -> Result<String, TransportError> {
        debug!(url = %url, "Issuing auth callback request");
        let response = self.client.get(url).send().await?;
        let body = response.text().await?;
        Ok(body)
    }
}
