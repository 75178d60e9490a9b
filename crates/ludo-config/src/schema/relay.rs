use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Per-connection relay tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Capacity of each connection's outbound queue (valid range: 1-65536).
    pub outbound_buffer: u32,
    /// How long a broadcast waits on one full recipient queue, in
    /// milliseconds (valid range: 10-60000).
    pub send_timeout_ms: u32,
    /// WebSocket upgrade deadline in seconds (valid range: 1-120).
    pub handshake_timeout_secs: u32,
    /// Largest inbound frame accepted, in bytes (valid range: 1 KiB-16 MiB).
    pub max_frame_bytes: u32,
}

impl RelayConfig {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.send_timeout_ms))
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.handshake_timeout_secs))
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            outbound_buffer: 256,
            send_timeout_ms: 1000,
            handshake_timeout_secs: 10,
            max_frame_bytes: 1024 * 1024,
        }
    }
}
