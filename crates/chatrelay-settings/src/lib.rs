//! # chatrelay-settings
//!
//! Configuration management with layered sources for the chat relay.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`ChatRelaySettings::default()`]
//! 2. **User file**: `~/.chatrelay/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `CHATRELAY_*` overrides plus `OPENAI_API_KEY`
//!
//! Settings are loaded once at startup by the binary and handed to the server
//! as an `Arc`; nothing in the relay path reads the environment directly.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, deep_merge, load_settings, load_settings_from_path, settings_path,
};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _settings = ChatRelaySettings::default();
        let _path = settings_path();
    }

    #[test]
    fn deep_merge_re_exported() {
        let a = serde_json::json!({"x": 1});
        let b = serde_json::json!({"y": 2});
        let merged = deep_merge(a, b);
        assert_eq!(merged["x"], 1);
        assert_eq!(merged["y"], 2);
    }

    #[test]
    fn default_settings_are_valid() {
        let settings = ChatRelaySettings::default();
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 8000);
        assert_eq!(settings.upstream.model, "gpt-3.5-turbo");
        assert_eq!(settings.relay.fragment_delay_ms, 0);
        assert_eq!(settings.ui.transport, ClientTransport::Http);
        assert!(settings.upstream.api_key.is_none());
    }
}
