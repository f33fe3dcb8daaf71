//! Outbound wire message.

use std::fmt;
use std::sync::Arc;

/// One already-serialized event, shared unchanged by every delivery.
///
/// Cloning is a reference-count bump, so a single broadcast can hand the
/// same payload to any number of delivery tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireMessage(Arc<str>);

impl WireMessage {
    /// Wrap an already-encoded UTF-8 payload.
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self(text.into())
    }

    /// The payload as sent in the text frame.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for WireMessage {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<&str> for WireMessage {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl fmt::Display for WireMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
