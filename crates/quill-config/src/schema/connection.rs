//! Persistent channel connection settings.

use serde::{Deserialize, Serialize};

/// Reconnect policy and timeouts for the persistent channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Time allowed for one connection attempt, in seconds (valid range: 1-120).
    pub connect_timeout_secs: u32,
    /// First reconnect delay in milliseconds (valid range: 10-60000).
    pub reconnect_delay_ms: u32,
    /// Upper bound for the doubling reconnect delay, in milliseconds.
    /// Equal to `reconnect_delay_ms` for a constant delay.
    pub max_reconnect_delay_ms: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 15,
            reconnect_delay_ms: 1000,
            max_reconnect_delay_ms: 30_000,
        }
    }
}
