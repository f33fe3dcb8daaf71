//! Realtime engine metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Engine-level counters, updated lock-free from any task.
#[derive(Debug, Default)]
pub struct RealtimeMetrics {
    connections_opened: AtomicU64,
    connections_closed: AtomicU64,
    broadcasts: AtomicU64,
    deliveries_attempted: AtomicU64,
    deliveries_failed: AtomicU64,
}

impl RealtimeMetrics {
    /// Create new zeroed metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// A connection entered the registry.
    pub fn connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// A connection left the registry.
    pub fn connection_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// A broadcast command was processed, fanning out to `recipients`.
    pub fn broadcast_dispatched(&self, recipients: u64) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
        self.deliveries_attempted
            .fetch_add(recipients, Ordering::Relaxed);
    }

    /// A delivery (or ping) write failed or timed out.
    pub fn delivery_failed(&self) {
        self.deliveries_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let opened = self.connections_opened.load(Ordering::Relaxed);
        let closed = self.connections_closed.load(Ordering::Relaxed);
        MetricsSnapshot {
            connections_opened: opened,
            connections_closed: closed,
            connections_active: opened.saturating_sub(closed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            deliveries_attempted: self.deliveries_attempted.load(Ordering::Relaxed),
            deliveries_failed: self.deliveries_failed.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Connections ever registered.
    pub connections_opened: u64,
    /// Connections ever unregistered.
    pub connections_closed: u64,
    /// Currently registered connections.
    pub connections_active: u64,
    /// Broadcast commands processed.
    pub broadcasts: u64,
    /// Delivery tasks spawned.
    pub deliveries_attempted: u64,
    /// Writes that failed or hit their deadline.
    pub deliveries_failed: u64,
}
