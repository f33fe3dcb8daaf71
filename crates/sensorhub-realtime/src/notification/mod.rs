//! Notification of new readings to connected clients.

pub mod notifier;

pub use notifier::WsNotifier;
