//! Outbound half of a client connection.
//!
//! The coordinator and delivery tasks only see the [`Transport`] trait; the
//! WebSocket implementation serializes writers through an async mutex so
//! concurrent deliveries to one client never interleave on the socket.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::SinkExt;
use futures::stream::SplitSink;
use std::time::Duration;
use tokio::sync::Mutex;

/// Failure of a single write to one client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The connection was already closed locally.
    #[error("connection already closed")]
    Closed,
    /// The write did not finish before its deadline.
    #[error("write timed out after {0:?}")]
    Timeout(Duration),
    /// The underlying socket rejected the write.
    #[error("send failed: {0}")]
    Send(String),
}

/// Write side of one client connection.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Send one text frame.
    async fn send_text(&self, text: &str) -> Result<(), TransportError>;

    /// Send a keepalive ping.
    async fn send_ping(&self) -> Result<(), TransportError>;

    /// Send a close frame and release the socket. Errors are ignored.
    async fn close(&self);
}

/// [`Transport`] over the sink half of an upgraded axum WebSocket.
#[derive(Debug)]
pub struct WsTransport {
    sink: Mutex<SplitSink<WebSocket, Message>>,
}

impl WsTransport {
    /// Wrap the sink half produced by `WebSocket::split`.
    pub fn new(sink: SplitSink<WebSocket, Message>) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send_text(&self, text: &str) -> Result<(), TransportError> {
        let mut sink = self.sink.lock().await;
        sink.send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn send_ping(&self) -> Result<(), TransportError> {
        let mut sink = self.sink.lock().await;
        sink.send(Message::Ping(Default::default()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn close(&self) {
        let mut sink = self.sink.lock().await;
        let _ = sink.send(Message::Close(None)).await;
        let _ = sink.close().await;
    }
}
