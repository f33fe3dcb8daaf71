//! # sensorhub-realtime
//!
//! Real-time WebSocket engine for SensorHub. Provides:
//!
//! - A single coordinator task that owns the connection registry
//! - Per-connection delivery tasks with bounded write deadlines
//! - Upgrade handling with a configurable origin policy and a liveness read loop
//! - The reading notifier that producers call after a successful write

pub mod connection;
pub mod message;
pub mod metrics;
pub mod notification;
pub mod server;

pub use connection::manager::ConnectionManager;
pub use connection::origin::OriginPolicy;
pub use message::types::WireMessage;
pub use metrics::RealtimeMetrics;
pub use notification::notifier::WsNotifier;
pub use server::RealtimeEngine;
