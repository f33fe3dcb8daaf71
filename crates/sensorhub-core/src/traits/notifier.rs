//! Notifier port used by the ingestion layer.

use async_trait::async_trait;

use crate::events::SensorReading;
use crate::result::AppResult;

/// Pushes a freshly stored reading to live clients.
///
/// Implemented by the realtime engine. Producers call it after a successful
/// write; an `Ok` return means the reading was handed off for fan-out, not
/// that any client received it.
#[async_trait]
pub trait ReadingNotifier: Send + Sync + std::fmt::Debug {
    /// Serialize `reading` and submit it for broadcast.
    async fn notify_new_reading(&self, reading: &SensorReading) -> AppResult<()>;
}
