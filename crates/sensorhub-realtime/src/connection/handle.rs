//! Individual client connection handle.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::message::types::WireMessage;

use super::transport::{Transport, TransportError};

/// Unique connection identifier, minted once per upgraded socket.
pub type ConnectionId = Uuid;

/// A handle to a single open client connection.
///
/// Owned by the registry while registered. Writes go through the
/// [`Transport`]; [`close`](Self::close) releases it exactly once.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Peer address, when the listener exposes it
    pub remote_addr: Option<SocketAddr>,
    /// When the connection was established
    pub connected_at: DateTime<Utc>,
    transport: Box<dyn Transport>,
    closed: AtomicBool,
    shutdown: CancellationToken,
}

impl ConnectionHandle {
    /// Create a handle with a freshly generated id.
    pub fn new(remote_addr: Option<SocketAddr>, transport: Box<dyn Transport>) -> Self {
        Self::with_id(Uuid::new_v4(), remote_addr, transport)
    }

    /// Create a handle with a caller-chosen id.
    pub fn with_id(
        id: ConnectionId,
        remote_addr: Option<SocketAddr>,
        transport: Box<dyn Transport>,
    ) -> Self {
        Self {
            id,
            remote_addr,
            connected_at: Utc::now(),
            transport,
            closed: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        }
    }

    /// Peer address formatted for logs.
    pub fn peer(&self) -> String {
        self.remote_addr
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Write one message, giving up after `deadline`.
    pub async fn send(
        &self,
        message: &WireMessage,
        deadline: Duration,
    ) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        tokio::time::timeout(deadline, self.transport.send_text(message.as_str()))
            .await
            .map_err(|_| TransportError::Timeout(deadline))?
    }

    /// Write a keepalive ping, giving up after `deadline`.
    pub async fn ping(&self, deadline: Duration) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        tokio::time::timeout(deadline, self.transport.send_ping())
            .await
            .map_err(|_| TransportError::Timeout(deadline))?
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Resolves once the connection has been closed locally.
    pub async fn closed(&self) {
        self.shutdown.cancelled().await
    }

    /// Close the connection. Only the first call has any effect.
    ///
    /// The local state flips immediately; the close handshake runs on its
    /// own task, bounded by `deadline`, so a peer stuck mid-write cannot
    /// hold up the caller. Returns `false` if already closed.
    pub fn close(self: &Arc<Self>, deadline: Duration) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.shutdown.cancel();

        let conn = Arc::clone(self);
        tokio::spawn(async move {
            if tokio::time::timeout(deadline, conn.transport.close())
                .await
                .is_err()
            {
                tracing::debug!(conn_id = %conn.id, "Close handshake timed out");
            }
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::transport::memory::MemoryTransport;

    fn handle() -> (Arc<ConnectionHandle>, Arc<MemoryTransport>) {
        let transport = Arc::new(MemoryTransport::new());
        let conn = Arc::new(ConnectionHandle::new(None, Box::new(transport.clone())));
        (conn, transport)
    }

    #[tokio::test]
    async fn test_send_records_frame() {
        let (conn, transport) = handle();
        conn.send(&WireMessage::from("hello"), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(transport.frames(), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn test_close_runs_once() {
        let (conn, transport) = handle();
        assert!(conn.close(Duration::from_secs(1)));
        assert!(!conn.close(Duration::from_secs(1)));

        transport.wait_closed().await;
        tokio::task::yield_now().await;
        assert_eq!(transport.closes(), 1);
        assert!(conn.is_closed());
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let (conn, transport) = handle();
        conn.close(Duration::from_secs(1));

        let err = conn
            .send(&WireMessage::from("late"), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::Closed);
        assert!(transport.frames().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_send_times_out() {
        let (conn, transport) = handle();
        transport.stall_sends();

        let err = conn
            .send(&WireMessage::from("slow"), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::Timeout(Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn test_closed_resolves_after_close() {
        let (conn, _transport) = handle();
        let waiter = {
            let conn = Arc::clone(&conn);
            tokio::spawn(async move { conn.closed().await })
        };
        conn.close(Duration::from_secs(1));
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
