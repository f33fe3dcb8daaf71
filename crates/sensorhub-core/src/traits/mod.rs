//! Ports defined in `sensorhub-core` and implemented by other crates.

pub mod notifier;

pub use notifier::ReadingNotifier;
