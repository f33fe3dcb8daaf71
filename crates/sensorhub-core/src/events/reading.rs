//! Sensor reading entity.

use serde::{Deserialize, Serialize};

/// One reading reported by a remote device.
///
/// The serialized field names are the wire contract consumed by the
/// dashboard: `id`, `temperatura`, `movimiento`, `distancia`, `peso`, `mac`.
/// Measurements travel as the strings the device reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Row identifier assigned by persistence (`0` when not yet known).
    #[serde(default)]
    pub id: i32,
    /// Temperature.
    #[serde(rename = "temperatura")]
    pub temperature: String,
    /// Motion flag as reported by the device.
    #[serde(rename = "movimiento")]
    pub motion: String,
    /// Distance.
    #[serde(rename = "distancia")]
    pub distance: String,
    /// Weight.
    #[serde(rename = "peso")]
    pub weight: String,
    /// MAC address of the reporting device.
    pub mac: String,
}

impl SensorReading {
    /// Create a reading that has not been persisted yet.
    pub fn new(
        temperature: impl Into<String>,
        motion: impl Into<String>,
        distance: impl Into<String>,
        weight: impl Into<String>,
        mac: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            temperature: temperature.into(),
            motion: motion.into(),
            distance: distance.into(),
            weight: weight.into(),
            mac: mac.into(),
        }
    }

    /// Attach the identifier assigned by persistence.
    pub fn with_id(mut self, id: i32) -> Self {
        self.id = id;
        self
    }
}
