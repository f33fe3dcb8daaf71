//! Ping heartbeat for WebSocket keepalive.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, warn};

use crate::metrics::RealtimeMetrics;

use super::handle::ConnectionHandle;
use super::manager::ConnectionManager;

/// Heartbeat configuration
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatConfig {
    /// Interval between pings
    pub ping_interval: Duration,
    /// Deadline for writing one ping
    pub write_timeout: Duration,
}

/// Run the heartbeat loop for a connection.
///
/// Sends a ping every interval until the connection is closed. A ping that
/// fails or misses its deadline unregisters the connection.
pub async fn run_heartbeat(
    conn: Arc<ConnectionHandle>,
    config: HeartbeatConfig,
    manager: ConnectionManager,
    metrics: Arc<RealtimeMetrics>,
) {
    let mut interval = time::interval_at(
        Instant::now() + config.ping_interval,
        config.ping_interval,
    );

    loop {
        tokio::select! {
            _ = conn.closed() => break,
            _ = interval.tick() => {
                if let Err(e) = conn.ping(config.write_timeout).await {
                    warn!(conn_id = %conn.id, error = %e, "Heartbeat ping failed");
                    metrics.delivery_failed();
                    manager.unregister(conn.id).await;
                    break;
                }
            }
        }
    }

    debug!(conn_id = %conn.id, "Heartbeat loop ended");
}

#[cfg(test)]
mod tests {
    use sensorhub_core::config::RealtimeConfig;

    use super::*;
    use crate::connection::transport::memory::MemoryTransport;

    fn setup() -> (
        Arc<ConnectionHandle>,
        Arc<MemoryTransport>,
        ConnectionManager,
        Arc<RealtimeMetrics>,
    ) {
        let metrics = Arc::new(RealtimeMetrics::new());
        let (manager, _task) =
            ConnectionManager::spawn(&RealtimeConfig::default(), metrics.clone());
        let transport = Arc::new(MemoryTransport::new());
        let conn = Arc::new(ConnectionHandle::new(None, Box::new(transport.clone())));
        (conn, transport, manager, metrics)
    }

    fn config() -> HeartbeatConfig {
        HeartbeatConfig {
            ping_interval: Duration::from_millis(20),
            write_timeout: Duration::from_millis(200),
        }
    }

    #[tokio::test]
    async fn test_pings_until_closed() {
        let (conn, transport, manager, metrics) = setup();
        manager.register(conn.clone()).await.unwrap();
        let task = tokio::spawn(run_heartbeat(conn.clone(), config(), manager.clone(), metrics));

        time::sleep(Duration::from_millis(110)).await;
        assert!(transport.pings() >= 2);

        manager.unregister(conn.id).await;
        time::timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_failed_ping_unregisters() {
        let (conn, transport, manager, metrics) = setup();
        manager.register(conn.clone()).await.unwrap();
        transport.fail_sends();

        let task = tokio::spawn(run_heartbeat(
            conn.clone(),
            config(),
            manager.clone(),
            metrics.clone(),
        ));
        time::timeout(Duration::from_secs(1), task).await.unwrap().unwrap();

        transport.wait_closed().await;
        assert_eq!(manager.connection_count().await.unwrap(), 0);
        assert_eq!(metrics.snapshot().deliveries_failed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_ping_times_out_and_unregisters() {
        let (conn, transport, manager, metrics) = setup();
        manager.register(conn.clone()).await.unwrap();
        transport.stall_sends();

        let config = HeartbeatConfig {
            ping_interval: Duration::from_millis(20),
            write_timeout: Duration::from_millis(50),
        };
        let task = tokio::spawn(run_heartbeat(
            conn.clone(),
            config,
            manager.clone(),
            metrics.clone(),
        ));
        time::timeout(Duration::from_secs(1), task).await.unwrap().unwrap();

        transport.wait_closed().await;
        assert!(conn.is_closed());
        assert_eq!(manager.connection_count().await.unwrap(), 0);
        assert_eq!(metrics.snapshot().deliveries_failed, 1);
        assert_eq!(transport.pings(), 0);
    }
}
