//! WebSocket transport implementation.
//!
//! This module provides the production socket using tokio-tungstenite.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message},
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, warn};

use crate::traits::{Connector, SocketSink, SocketStream, TransportError};

type WsStreamInner = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket connector.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl WsConnector {
    /// Create a new WebSocket connector.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(
        &self,
        url: &str,
    ) -> Result<(Box<dyn SocketSink>, Box<dyn SocketStream>), TransportError> {
        let (stream, response) = connect_async(url).await.map_err(|e| {
            error!(url = %url, "WebSocket handshake failed: {}", e);
            TransportError::ConnectionFailed(e.to_string())
        })?;

        debug!(url = %url, status = %response.status(), "WebSocket handshake completed");

        let (sink, stream) = stream.split();
        Ok((Box::new(WsSink { sink }), Box::new(WsStream { stream })))
    }

    fn name(&self) -> &'static str {
        "websocket"
    }
}

/// Write half of a WebSocket connection.
pub struct WsSink {
    sink: SplitSink<WsStreamInner, Message>,
}

#[async_trait]
impl SocketSink for WsSink {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.sink
            .send(Message::Text(text))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        match self.sink.close().await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(TransportError::SendFailed(e.to_string())),
        }
    }
}

/// Read half of a WebSocket connection.
pub struct WsStream {
    stream: SplitStream<WsStreamInner>,
}

#[async_trait]
impl SocketStream for WsStream {
    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text)),
                Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                    Ok(text) => return Ok(Some(text)),
                    Err(_) => {
                        warn!("Dropping non-UTF-8 binary frame");
                    }
                },
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                    // tungstenite queues the pong reply itself
                }
                Some(Ok(Message::Close(_))) => {
                    debug!("Received close frame");
                    return Ok(None);
                }
                Some(Ok(Message::Frame(_))) => {
                    // Raw frame, ignore
                }
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => {
                    debug!("Connection closed");
                    return Ok(None);
                }
                Some(Err(e)) => {
                    error!("WebSocket error: {}", e);
                    return Err(TransportError::ReceiveFailed(e.to_string()));
                }
                None => {
                    debug!("WebSocket stream ended");
                    return Ok(None);
                }
            }
        }
    }
}
