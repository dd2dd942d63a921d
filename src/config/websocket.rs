//! WebSocket gateway configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Gateway timing and capacity knobs
#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketConfig {
    /// Handshake authentication deadline in seconds
    #[serde(default = "default_auth_timeout")]
    pub auth_timeout_secs: u64,

    /// Interval between server pings in seconds
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,

    /// Unanswered pings tolerated before a connection is considered dead
    #[serde(default = "default_missed_pong_limit")]
    pub missed_pong_limit: u32,

    /// Per-room broadcast buffer; slower consumers lose oldest events
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl WebSocketConfig {
    /// Get the handshake deadline as Duration
    pub fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout_secs)
    }

    /// Get the ping interval as Duration
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    /// Validate gateway configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.auth_timeout_secs == 0 || self.heartbeat_interval_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            auth_timeout_secs: default_auth_timeout(),
            heartbeat_interval_secs: default_heartbeat_interval(),
            missed_pong_limit: default_missed_pong_limit(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_auth_timeout() -> u64 {
    10
}

fn default_heartbeat_interval() -> u64 {
    30
}

fn default_missed_pong_limit() -> u32 {
    2
}

fn default_channel_capacity() -> usize {
    128
}
