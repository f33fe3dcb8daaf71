//! Real-time WebSocket engine configuration.

use serde::{Deserialize, Serialize};

/// Real-time (WebSocket) engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Capacity of the coordinator's command inbox.
    #[serde(default = "default_command_buffer")]
    pub command_buffer_size: usize,
    /// Deadline for a single write (delivery or ping) to one client.
    #[serde(default = "default_write_timeout")]
    pub write_timeout_ms: u64,
    /// Interval between server pings in seconds. `0` disables the heartbeat.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_seconds: u64,
    /// Origins accepted on the upgrade endpoint.
    ///
    /// `["*"]` accepts everything, `["well-formed"]` accepts any parseable
    /// http(s) origin except `null`, anything else is an exact allow-list.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    /// Optional shared token required as `?token=` on the upgrade endpoint.
    #[serde(default)]
    pub access_token: Option<String>,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            command_buffer_size: default_command_buffer(),
            write_timeout_ms: default_write_timeout(),
            ping_interval_seconds: default_ping_interval(),
            allowed_origins: default_allowed_origins(),
            access_token: None,
        }
    }
}

fn default_command_buffer() -> usize {
    256
}

fn default_write_timeout() -> u64 {
    5_000
}

fn default_ping_interval() -> u64 {
    30
}

fn default_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}
