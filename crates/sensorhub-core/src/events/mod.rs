//! Domain events pushed to live clients.

pub mod reading;

pub use reading::SensorReading;
