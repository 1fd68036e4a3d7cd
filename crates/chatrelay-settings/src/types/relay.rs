//! Relay loop tuning.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Per-session relay settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelaySettings {
    /// Pause between forwarded fragments in milliseconds. `0` disables pacing.
    pub fragment_delay_ms: u64,
    /// Inbound messages buffered while a turn is streaming.
    pub inbound_queue_capacity: usize,
    /// Outbound frames buffered per session before the relay loop waits.
    pub outbound_queue_capacity: usize,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            fragment_delay_ms: 0,
            inbound_queue_capacity: 16,
            outbound_queue_capacity: 64,
        }
    }
}

impl RelaySettings {
    /// Pacing delay, or `None` when pacing is off.
    pub fn fragment_delay(&self) -> Option<Duration> {
        (self.fragment_delay_ms > 0).then(|| Duration::from_millis(self.fragment_delay_ms))
    }
}
