//! Delivery tasks. Each one makes a single send attempt of one message to one connection.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{trace, warn};

use crate::message::types::WireMessage;
use crate::metrics::RealtimeMetrics;

use super::handle::ConnectionHandle;
use super::manager::Command;

/// Spawn a task that writes `message` to `conn` once.
///
/// On failure the task submits an unregister for `conn` through `reports`
/// and ends. It never retries and never reports back to the broadcaster.
pub(crate) fn spawn_delivery(
    conn: Arc<ConnectionHandle>,
    message: WireMessage,
    deadline: Duration,
    reports: mpsc::WeakSender<Command>,
    metrics: Arc<RealtimeMetrics>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match conn.send(&message, deadline).await {
            Ok(()) => {
                trace!(conn_id = %conn.id, bytes = message.len(), "Delivered message");
            }
            Err(e) => {
                warn!(
                    conn_id = %conn.id,
                    remote_addr = %conn.peer(),
                    error = %e,
                    "Delivery failed, unregistering connection"
                );
                metrics.delivery_failed();
                if let Some(reports) = reports.upgrade() {
                    let _ = reports.send(Command::Unregister(conn.id)).await;
                }
            }
        }
    })
}
