//! Real-time delivery engine configuration.

use serde::{Deserialize, Serialize};

/// Real-time (WebSocket) delivery engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Per-connection outbound channel buffer size.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// Maximum pending messages replayed on (re)connect.
    #[serde(default = "default_replay_limit")]
    pub replay_limit: u32,
    /// Maximum WebSocket connections per user on this process.
    #[serde(default = "default_max_connections_per_user")]
    pub max_connections_per_user: usize,
    /// Redis URL for the cross-process backplane relay. When unset the
    /// backplane only fans out to connections on this process.
    #[serde(default)]
    pub redis_url: Option<String>,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: default_channel_buffer(),
            replay_limit: default_replay_limit(),
            max_connections_per_user: default_max_connections_per_user(),
            redis_url: None,
        }
    }
}

fn default_channel_buffer() -> usize {
    256
}

fn default_replay_limit() -> u32 {
    1000
}

fn default_max_connections_per_user() -> usize {
    5
}
