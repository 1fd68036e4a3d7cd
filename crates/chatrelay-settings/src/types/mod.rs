//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` for the JSON file
//! format. Each type implements [`Default`] with production default values.
//! Types marked with `#[serde(default)]` allow partial JSON: missing fields
//! get their default value during deserialization.

mod relay;
mod server;
mod ui;
mod upstream;

pub use relay::*;
pub use server::*;
pub use ui::*;
pub use upstream::*;

use serde::{Deserialize, Serialize};

/// Root settings type for the relay.
///
/// # JSON Format
///
/// ```json
/// {
///   "server": { "port": 9000 },
///   "upstream": { "model": "gpt-4o-mini" },
///   "relay": { "fragmentDelayMs": 100 }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatRelaySettings {
    /// HTTP listener settings.
    pub server: ServerSettings,
    /// Completion service settings.
    pub upstream: UpstreamSettings,
    /// Relay loop tuning.
    pub relay: RelaySettings,
    /// Homepage client settings.
    pub ui: UiSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl ChatRelaySettings {
    /// Clamp out-of-range values and correct invalid invariants.
    ///
    /// Called automatically during loading. Out-of-range values are clamped
    /// with a warning rather than rejected.
    pub fn validate(&mut self) {
        fn at_least_one(val: &mut usize, name: &str) {
            if *val == 0 {
                tracing::warn!("{name} must be at least 1, correcting");
                *val = 1;
            }
        }

        at_least_one(
            &mut self.relay.inbound_queue_capacity,
            "inbound_queue_capacity",
        );
        at_least_one(
            &mut self.relay.outbound_queue_capacity,
            "outbound_queue_capacity",
        );

        if let Some(t) = self.upstream.temperature
            && !(0.0..=2.0).contains(&t)
        {
            let clamped = t.clamp(0.0, 2.0);
            tracing::warn!("temperature out of range ({t}), clamped to {clamped}");
            self.upstream.temperature = Some(clamped);
        }

        if self.upstream.base_url.ends_with('/') {
            let trimmed = self.upstream.base_url.trim_end_matches('/').to_string();
            self.upstream.base_url = trimmed;
        }
    }
}
