//! Top-level real-time engine that ties together all subsystems.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::http::HeaderMap;
use axum::response::Response;
use tracing::info;

use sensorhub_core::config::RealtimeConfig;
use sensorhub_core::result::AppResult;
use sensorhub_core::traits::ReadingNotifier;

use crate::connection::lifecycle::{self, ConnectionContext, ConnectionSettings};
use crate::connection::manager::ConnectionManager;
use crate::connection::origin::OriginPolicy;
use crate::metrics::RealtimeMetrics;
use crate::notification::notifier::WsNotifier;

/// Central real-time engine: one coordinator, its notifier, and the
/// handshake policy applied to new sockets.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Connection coordinator handle.
    pub connections: ConnectionManager,
    /// Notifier handed to reading producers.
    pub notifier: Arc<WsNotifier>,
    /// Metrics collector.
    pub metrics: Arc<RealtimeMetrics>,
    origin_policy: OriginPolicy,
    settings: ConnectionSettings,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine")
            .field("origin_policy", &self.origin_policy)
            .field("settings", &self.settings)
            .finish()
    }
}

impl RealtimeEngine {
    /// Creates the engine and spawns its coordinator task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: &RealtimeConfig) -> Self {
        let metrics = Arc::new(RealtimeMetrics::new());
        let (connections, _task) = ConnectionManager::spawn(config, Arc::clone(&metrics));
        let notifier = Arc::new(WsNotifier::new(connections.clone()));
        let origin_policy = OriginPolicy::from_config(&config.allowed_origins);
        let settings = ConnectionSettings::from(config);

        info!(
            origin_policy = ?origin_policy,
            write_timeout_ms = config.write_timeout_ms,
            ping_interval_seconds = config.ping_interval_seconds,
            "Real-time engine initialized"
        );

        Self {
            connections,
            notifier,
            metrics,
            origin_policy,
            settings,
        }
    }

    /// Replace the origin policy derived from configuration.
    pub fn with_origin_policy(mut self, policy: OriginPolicy) -> Self {
        self.origin_policy = policy;
        self
    }

    /// The active origin policy.
    pub fn origin_policy(&self) -> &OriginPolicy {
        &self.origin_policy
    }

    /// Validate a WebSocket handshake and, if accepted, hand the socket to
    /// the coordinator once upgraded.
    pub fn upgrade(
        &self,
        ws: WebSocketUpgrade,
        headers: &HeaderMap,
        remote_addr: Option<SocketAddr>,
    ) -> AppResult<Response> {
        lifecycle::upgrade(
            ws,
            headers,
            remote_addr,
            &self.origin_policy,
            ConnectionContext {
                manager: self.connections.clone(),
                metrics: Arc::clone(&self.metrics),
                settings: self.settings,
            },
        )
    }

    /// The notifier as the port producers depend on.
    pub fn reading_notifier(&self) -> Arc<dyn ReadingNotifier> {
        self.notifier.clone()
    }

    /// Number of currently registered connections.
    pub async fn connection_count(&self) -> AppResult<usize> {
        self.connections.connection_count().await
    }

    /// Close every connection and stop the coordinator.
    ///
    /// Later notifications fail with a service-unavailable error.
    pub async fn shutdown(&self) -> AppResult<()> {
        info!("Shutting down real-time engine");
        self.connections.shutdown().await?;
        info!("Real-time engine shut down");
        Ok(())
    }
}
