//! JSON encoding for outbound events.

use serde::Serialize;

use sensorhub_core::result::AppResult;

use super::types::WireMessage;

/// Encode an event as the JSON text carried by one frame.
pub fn encode<T: Serialize + ?Sized>(event: &T) -> AppResult<WireMessage> {
    let text = serde_json::to_string(event)?;
    Ok(WireMessage::from(text))
}
