//! Relay protocol configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Fixed cost of turning an antenna (and its carrier) before a send.
    pub slew_time_ms: u64,
    /// Main spacecraft answer delivered messages with an acknowledgement.
    pub auto_acknowledge: bool,
    /// Events buffered per subscriber before slow receivers start lagging.
    pub event_capacity: usize,
}

impl RelayConfig {
    pub fn slew_time(&self) -> Duration {
        Duration::from_millis(self.slew_time_ms)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            slew_time_ms: 1_000,
            auto_acknowledge: true,
            event_capacity: 1_024,
        }
    }
}
