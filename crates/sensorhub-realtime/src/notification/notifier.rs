//! Reading notifier that pushes new readings to every connected client.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error};

use sensorhub_core::events::SensorReading;
use sensorhub_core::result::AppResult;
use sensorhub_core::traits::ReadingNotifier;

use crate::connection::manager::ConnectionManager;
use crate::message::serializer;

/// Serializes events to JSON and hands them to the coordinator for fan-out.
///
/// Returns as soon as the broadcast is queued. Per-client delivery outcomes
/// are never reported back here.
#[derive(Debug, Clone)]
pub struct WsNotifier {
    connections: ConnectionManager,
}

impl WsNotifier {
    /// Create a notifier bound to a coordinator.
    pub fn new(connections: ConnectionManager) -> Self {
        Self { connections }
    }

    /// Broadcast any serializable event.
    ///
    /// A serialization failure is logged and returned; nothing is broadcast.
    pub async fn publish<T: Serialize + ?Sized>(&self, event: &T) -> AppResult<()> {
        let message = serializer::encode(event).map_err(|e| {
            error!(error = %e, "Failed to serialize event for broadcast");
            e
        })?;

        debug!(bytes = message.len(), "Publishing event");
        self.connections.broadcast(message).await
    }
}

#[async_trait]
impl ReadingNotifier for WsNotifier {
    async fn notify_new_reading(&self, reading: &SensorReading) -> AppResult<()> {
        self.publish(reading).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use sensorhub_core::config::RealtimeConfig;
    use sensorhub_core::error::ErrorKind;

    use super::*;
    use crate::connection::handle::ConnectionHandle;
    use crate::connection::transport::memory::MemoryTransport;
    use crate::metrics::RealtimeMetrics;

    async fn setup() -> (WsNotifier, Arc<MemoryTransport>, Arc<RealtimeMetrics>) {
        let metrics = Arc::new(RealtimeMetrics::new());
        let (manager, _task) =
            ConnectionManager::spawn(&RealtimeConfig::default(), metrics.clone());
        let transport = Arc::new(MemoryTransport::new());
        manager
            .register(Arc::new(ConnectionHandle::new(None, Box::new(transport.clone()))))
            .await
            .unwrap();
        (WsNotifier::new(manager), transport, metrics)
    }

    #[tokio::test]
    async fn test_reading_reaches_client_as_json() {
        let (notifier, transport, _metrics) = setup().await;
        let reading = SensorReading::new("25", "1", "10", "70", "AA:BB:CC:DD:EE:FF").with_id(7);

        notifier.notify_new_reading(&reading).await.unwrap();
        transport.wait_for_frames(1).await;

        let frames = transport.frames();
        let received: SensorReading = serde_json::from_str(&frames[0]).unwrap();
        assert_eq!(received, reading);
        assert!(frames[0].contains(r#""temperatura":"25""#));
    }

    #[tokio::test]
    async fn test_serialization_failure_broadcasts_nothing() {
        let (notifier, transport, metrics) = setup().await;
        let mut bad = HashMap::new();
        bad.insert((1, 2), "tuple keys are not valid JSON object keys");

        let err = notifier.publish(&bad).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Serialization);

        notifier.connections.connection_count().await.unwrap();
        assert_eq!(metrics.snapshot().broadcasts, 0);
        assert!(transport.frames().is_empty());
    }
}
