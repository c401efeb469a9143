//! Client configuration.
//!
//! Options are constructed programmatically; the base URL additionally
//! honors the `PUSHI_BASE_URL` environment variable.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default service URL template; the application key is appended.
pub const DEFAULT_BASE_URL: &str = "wss://puxiapp.com/";

/// Client options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientOptions {
    /// Reconnect delay in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Service URL template the application key is appended to.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Auth endpoint for private/presence channel subscriptions.
    #[serde(default)]
    pub auth_endpoint: Option<String>,
}

// Default value functions
fn default_timeout_ms() -> u64 {
    5_000
}

fn default_base_url() -> String {
    std::env::var("PUSHI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            base_url: default_base_url(),
            auth_endpoint: None,
        }
    }
}

impl ClientOptions {
    /// Set the reconnect delay.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the auth endpoint.
    #[must_use]
    pub fn with_auth_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.auth_endpoint = Some(endpoint.into());
        self
    }

    /// Get the reconnect delay.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Full connection URL for an application key.
    #[must_use]
    pub fn url_for(&self, app_key: &str) -> String {
        format!("{}{}", self.base_url, app_key)
    }
}
