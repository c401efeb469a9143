//! In-memory transport for deterministic tests.
//!
//! [`MockConnector`] hands the test one [`MockSession`] per connection
//! attempt; the session injects inbound text, observes outbound frames, and
//! forces a close to exercise the reconnect path. [`MockAuthTransport`]
//! returns canned auth-callback bodies and records the requested URLs.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::debug;

use crate::traits::{AuthTransport, Connector, SocketSink, SocketStream, TransportError};

/// Connector yielding in-memory sessions.
#[derive(Clone)]
pub struct MockConnector {
    attempts: Arc<AtomicUsize>,
    sessions: mpsc::UnboundedSender<MockSession>,
}

impl MockConnector {
    /// Create a connector and the receiver of its sessions.
    ///
    /// The test receives one [`MockSession`] per connection attempt, in
    /// attempt order.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MockSession>) {
        let (sessions, receiver) = mpsc::unbounded_channel();
        (
            Self {
                attempts: Arc::new(AtomicUsize::new(0)),
                sessions,
            },
            receiver,
        )
    }

    /// Number of connection attempts made so far.
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(
        &self,
        url: &str,
    ) -> Result<(Box<dyn SocketSink>, Box<dyn SocketStream>), TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let session = MockSession {
            url: url.to_string(),
            inbound: Some(inbound_tx),
            outbound: outbound_rx,
        };
        self.sessions
            .send(session)
            .map_err(|_| TransportError::ConnectionFailed("session receiver dropped".into()))?;

        debug!(url = %url, attempt = self.connect_count(), "Mock connection opened");

        Ok((
            Box::new(MockSink { outbound_tx }),
            Box::new(MockStream { inbound_rx }),
        ))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Test-side handle to one mock connection.
pub struct MockSession {
    url: String,
    inbound: Option<mpsc::UnboundedSender<String>>,
    outbound: mpsc::UnboundedReceiver<String>,
}

impl MockSession {
    /// URL the client connected to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Inject one inbound text frame, as if sent by the service.
    pub fn inject(&self, text: impl Into<String>) {
        if let Some(inbound) = &self.inbound {
            let _ = inbound.send(text.into());
        }
    }

    /// Close the connection from the service side.
    ///
    /// The client's stream ends after any already-injected frames drain.
    pub fn close(&mut self) {
        self.inbound.take();
    }

    /// Await the next frame the client wrote.
    ///
    /// Returns `None` once the client's sink is dropped and the queue is
    /// drained.
    pub async fn next_outbound(&mut self) -> Option<String> {
        self.outbound.recv().await
    }

    /// Take an already-written frame without waiting.
    pub fn try_outbound(&mut self) -> Option<String> {
        self.outbound.try_recv().ok()
    }
}

struct MockSink {
    outbound_tx: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl SocketSink for MockSink {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.outbound_tx
            .send(text)
            .map_err(|_| TransportError::SendFailed("mock session dropped".into()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

struct MockStream {
    inbound_rx: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
impl SocketStream for MockStream {
    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        Ok(self.inbound_rx.recv().await)
    }
}

/// Auth transport returning a canned body.
#[derive(Default)]
pub struct MockAuthTransport {
    body: Mutex<String>,
    requests: Mutex<Vec<String>>,
}

impl MockAuthTransport {
    /// Create a transport that answers every request with `body`.
    #[must_use]
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: Mutex::new(body.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Replace the canned response body.
    pub fn set_body(&self, body: impl Into<String>) {
        *self.body.lock().unwrap() = body.into();
    }

    /// URLs requested so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthTransport for MockAuthTransport {
    async fn get(&self, url: &str) -> Result<String, TransportError> {
        self.requests.lock().unwrap().push(url.to_string());
        Ok(self.body.lock().unwrap().clone())
    }
}
