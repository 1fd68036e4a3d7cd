//! Settings file discovery, deep merge, and environment overrides.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::Value;

use crate::errors::{Result, SettingsError};
use crate::types::{ChatRelaySettings, LogFormat};

/// Directory name under `$HOME` holding the settings file.
const SETTINGS_DIR: &str = ".chatrelay";

/// Settings file name.
const SETTINGS_FILE: &str = "settings.json";

/// Default settings file location: `$CHATRELAY_HOME/settings.json`, falling
/// back to `~/.chatrelay/settings.json`.
pub fn settings_path() -> PathBuf {
    if let Ok(home) = std::env::var("CHATRELAY_HOME") {
        return PathBuf::from(home).join(SETTINGS_FILE);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(SETTINGS_DIR).join(SETTINGS_FILE)
}

/// Load settings from the default path with environment overrides.
pub fn load_settings() -> Result<ChatRelaySettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from `path`, deep-merged over defaults, then apply
/// environment overrides and validate.
///
/// A missing file is not an error: the defaults are used as-is.
pub fn load_settings_from_path(path: &Path) -> Result<ChatRelaySettings> {
    let defaults = serde_json::to_value(ChatRelaySettings::default())?;

    let merged = match std::fs::read_to_string(path) {
        Ok(raw) => {
            let user: Value = serde_json::from_str(&raw)?;
            tracing::debug!(?path, "loaded settings file");
            deep_merge(defaults, user)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(?path, "no settings file, using defaults");
            defaults
        }
        Err(source) => {
            return Err(SettingsError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let mut settings: ChatRelaySettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings.validate();
    Ok(settings)
}

/// Recursively merge `overlay` into `base`. Objects merge key by key; every
/// other value in `overlay` replaces the one in `base`. `null` in `overlay`
/// leaves the base value untouched.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_val) => deep_merge(base_val, overlay_val),
                    None => overlay_val,
                };
                let _ = base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Apply environment overrides using `lookup` to resolve variables.
///
/// Unparseable values are ignored with a warning.
pub fn apply_env_overrides(
    settings: &mut ChatRelaySettings,
    lookup: impl Fn(&str) -> Option<String>,
) {
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(host) = var("CHATRELAY_HOST") {
        settings.server.host = host;
    }
    if let Some(port) = parse_var(&var, "CHATRELAY_PORT") {
        settings.server.port = port;
    }
    if let Some(model) = var("CHATRELAY_MODEL") {
        settings.upstream.model = model;
    }
    if let Some(url) = var("CHATRELAY_BASE_URL") {
        settings.upstream.base_url = url;
    }
    if let Some(delay) = parse_var(&var, "CHATRELAY_FRAGMENT_DELAY_MS") {
        settings.relay.fragment_delay_ms = delay;
    }
    if let Some(level) = var("CHATRELAY_LOG_LEVEL") {
        settings.logging.level = level;
    }
    if let Some(format) = var("CHATRELAY_LOG_FORMAT") {
        match format.as_str() {
            "json" => settings.logging.format = LogFormat::Json,
            "pretty" => settings.logging.format = LogFormat::Pretty,
            other => tracing::warn!(value = other, "ignoring unknown CHATRELAY_LOG_FORMAT"),
        }
    }
    if let Some(key) = var("OPENAI_API_KEY") {
        settings.upstream.api_key = Some(key);
    }
}

fn parse_var<T: FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = var(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable environment override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn deep_merge_nested_objects() {
        let base = json!({"server": {"host": "a", "port": 1}});
        let overlay = json!({"server": {"port": 2}});
        let merged = deep_merge(base, overlay);
        assert_eq!(merged, json!({"server": {"host": "a", "port": 2}}));
    }

    #[test]
    fn deep_merge_null_keeps_base() {
        let merged = deep_merge(json!({"x": 1}), json!({"x": null}));
        assert_eq!(merged["x"], 1);
    }

    #[test]
    fn deep_merge_scalar_replaces_object() {
        let merged = deep_merge(json!({"x": {"y": 1}}), json!({"x": 5}));
        assert_eq!(merged["x"], 5);
    }

    #[test]
    fn deep_merge_arrays_replace() {
        let merged = deep_merge(json!({"x": [1, 2]}), json!({"x": [3]}));
        assert_eq!(merged["x"], json!([3]));
    }

    // ── file loading ────────────────────────────────────────────────

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_settings_from_path(&dir.path().join("nope.json")).unwrap();
        assert_eq!(s.upstream.model, "gpt-3.5-turbo");
    }

    #[test]
    fn file_values_merge_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"upstream": {"model": "gpt-4o-mini"}, "relay": {"fragmentDelayMs": 50}}"#,
        )
        .unwrap();
        let s = load_settings_from_path(&path).unwrap();
        assert_eq!(s.upstream.model, "gpt-4o-mini");
        assert_eq!(s.relay.fragment_delay_ms, 50);
        assert_eq!(s.server.port, 8000);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_matches!(load_settings_from_path(&path), Err(SettingsError::Json(_)));
    }

    #[test]
    fn directory_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert_matches!(
            load_settings_from_path(dir.path()),
            Err(SettingsError::Io { .. })
        );
    }

    #[test]
    fn loaded_settings_are_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"relay": {"inboundQueueCapacity": 0}}"#).unwrap();
        let s = load_settings_from_path(&path).unwrap();
        assert_eq!(s.relay.inbound_queue_capacity, 1);
    }

    // ── env overrides ───────────────────────────────────────────────

    #[test]
    fn env_overrides_apply() {
        let mut s = ChatRelaySettings::default();
        apply_env_overrides(
            &mut s,
            env(&[
                ("CHATRELAY_HOST", "0.0.0.0"),
                ("CHATRELAY_PORT", "9001"),
                ("CHATRELAY_MODEL", "gpt-4o"),
                ("CHATRELAY_BASE_URL", "http://localhost:1234"),
                ("CHATRELAY_FRAGMENT_DELAY_MS", "100"),
                ("CHATRELAY_LOG_LEVEL", "debug"),
                ("CHATRELAY_LOG_FORMAT", "json"),
                ("OPENAI_API_KEY", "sk-env"),
            ]),
        );
        assert_eq!(s.server.host, "0.0.0.0");
        assert_eq!(s.server.port, 9001);
        assert_eq!(s.upstream.model, "gpt-4o");
        assert_eq!(s.upstream.base_url, "http://localhost:1234");
        assert_eq!(s.relay.fragment_delay_ms, 100);
        assert_eq!(s.logging.level, "debug");
        assert_eq!(s.logging.format, LogFormat::Json);
        assert_eq!(s.upstream.api_key.as_deref(), Some("sk-env"));
    }

    #[test]
    fn unparseable_env_values_ignored() {
        let mut s = ChatRelaySettings::default();
        apply_env_overrides(
            &mut s,
            env(&[
                ("CHATRELAY_PORT", "eighty"),
                ("CHATRELAY_FRAGMENT_DELAY_MS", "-5"),
                ("CHATRELAY_LOG_FORMAT", "xml"),
            ]),
        );
        assert_eq!(s.server.port, 8000);
        assert_eq!(s.relay.fragment_delay_ms, 0);
        assert_eq!(s.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn empty_env_values_ignored() {
        let mut s = ChatRelaySettings::default();
        s.upstream.api_key = Some("sk-file".into());
        apply_env_overrides(&mut s, env(&[("OPENAI_API_KEY", "  ")]));
        assert_eq!(s.upstream.api_key.as_deref(), Some("sk-file"));
    }

    #[test]
    fn no_env_leaves_settings_untouched() {
        let mut s = ChatRelaySettings::default();
        apply_env_overrides(&mut s, |_| None);
        assert_eq!(s.server.port, 8000);
        assert!(s.upstream.api_key.is_none());
    }
}
