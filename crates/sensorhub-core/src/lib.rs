//! # sensorhub-core
//!
//! Core crate for SensorHub. Contains configuration schemas, the sensor
//! reading entity, the notifier port consumed by producers, and the
//! unified error system.
//!
//! This crate has **no** internal dependencies on other SensorHub crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;

pub use error::AppError;
pub use events::SensorReading;
pub use result::AppResult;
pub use traits::ReadingNotifier;
