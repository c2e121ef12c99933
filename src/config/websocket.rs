//! WebSocket transport configuration types.

use super::defaults::{default_max_message_size, default_outgoing_queue_capacity, default_websocket_host};
use serde::{Deserialize, Serialize};

/// WebSocket configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebSocketConfig {
    /// Interface to bind the HTTP/WebSocket listener on.
    #[serde(default = "default_websocket_host")]
    pub host: String,
    /// Maximum accepted size, in bytes, of an inbound text frame.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Capacity of the per-connection outgoing message queue; sends beyond this are dropped.
    #[serde(default = "default_outgoing_queue_capacity")]
    pub outgoing_queue_capacity: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            host: default_websocket_host(),
            max_message_size: default_max_message_size(),
            outgoing_queue_capacity: default_outgoing_queue_capacity(),
        }
    }
}

impl WebSocketConfig {
    /// Validate websocket configuration, matching the validate-before-bind pattern used
    /// by `--validate-config`.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_message_size < 256 {
            anyhow::bail!(
                "websocket.max_message_size must be at least 256 bytes (configured: {})",
                self.max_message_size
            );
        }
        if self.outgoing_queue_capacity == 0 {
            anyhow::bail!("websocket.outgoing_queue_capacity must be at least 1");
        }
        Ok(())
    }
}
