//! Connection lifecycle and frame dispatch.
//!
//! One connection task runs per primary handle. It owns the physical
//! socket, drains the shared outbound queue into it, and redistributes
//! every inbound frame to all registered subscribers. When the socket
//! closes it notifies every subscriber and retries after a fixed delay,
//! indefinitely.

use pushi_core::ConnectionState;
use pushi_protocol::{codec, InboundEvent, OutboundFrame};
use pushi_transport::Connector;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::registry::SubscriberRegistry;

/// Drives one physical connection for a primary handle.
pub(crate) struct ConnectionManager {
    url: String,
    timeout: Duration,
    connector: Arc<dyn Connector>,
    registry: Arc<SubscriberRegistry>,
}

impl ConnectionManager {
    pub(crate) fn new(
        url: String,
        timeout: Duration,
        connector: Arc<dyn Connector>,
        registry: Arc<SubscriberRegistry>,
    ) -> Self {
        Self {
            url,
            timeout,
            connector,
            registry,
        }
    }

    /// Run the connect/dispatch/retry loop until the outbound queue closes.
    pub(crate) async fn run(self, mut outbound_rx: mpsc::UnboundedReceiver<OutboundFrame>) {
        loop {
            let (mut sink, mut stream) = match self.connector.connect(&self.url).await {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(url = %self.url, "Connection attempt failed: {}", e);
                    tokio::time::sleep(self.timeout).await;
                    continue;
                }
            };
            debug!(
                url = %self.url,
                transport = self.connector.name(),
                subscribers = self.registry.len(),
                "Socket opened"
            );

            // Session loop: one socket, shared by every subscriber
            loop {
                tokio::select! {
                    frame = outbound_rx.recv() => match frame {
                        Some(frame) => {
                            let text = match codec::encode(&frame) {
                                Ok(text) => text,
                                Err(e) => {
                                    warn!("Dropping unencodable outbound frame: {}", e);
                                    continue;
                                }
                            };
                            if let Err(e) = sink.send(text).await {
                                warn!("Send failed: {}", e);
                                break;
                            }
                        }
                        // Every sender gone: the last handle was dropped
                        None => {
                            let _ = sink.close().await;
                            for handle in self.registry.snapshot() {
                                handle.on_disconnect();
                            }
                            return;
                        }
                    },
                    inbound = stream.recv() => match inbound {
                        Ok(Some(text)) => self.dispatch(&text),
                        Ok(None) => break,
                        Err(e) => {
                            warn!("Receive failed: {}", e);
                            break;
                        }
                    },
                }
            }

            for handle in self.registry.snapshot() {
                handle.on_disconnect();
            }

            debug!(url = %self.url, delay_ms = self.timeout.as_millis() as u64, "Scheduling reconnect");
            tokio::time::sleep(self.timeout).await;
        }
    }

    /// Decode one inbound frame and dispatch it to every subscriber.
    ///
    /// Malformed frames are a per-frame failure: logged and skipped, never
    /// fatal to the connection. Each subscriber is evaluated independently
    /// against its own state; dispatch is not first-match-wins.
    fn dispatch(&self, text: &str) {
        let raw = match codec::decode(text) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Skipping malformed frame: {}", e);
                return;
            }
        };
        let event = match InboundEvent::classify(&raw) {
            Ok(event) => event,
            Err(e) => {
                warn!(event = %raw.event, "Skipping invalid frame: {}", e);
                return;
            }
        };

        for handle in self.registry.snapshot() {
            match (&event, handle.connection_state()) {
                (
                    InboundEvent::ConnectionEstablished { socket_id },
                    ConnectionState::Disconnected,
                ) => {
                    handle.on_connect(socket_id);
                }
                (_, ConnectionState::Connected) => {
                    handle.on_message(&raw, &event);
                }
                _ => {}
            }
        }
    }
}
