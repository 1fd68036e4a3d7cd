//! Homepage and logging settings.

use serde::{Deserialize, Serialize};

/// Which endpoint the homepage client script drives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientTransport {
    /// One-shot `POST /query` with a streamed body.
    #[default]
    Http,
    /// Persistent `/ws` connection.
    Websocket,
}

/// Homepage settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UiSettings {
    /// Transport used by the embedded client script.
    pub transport: ClientTransport,
}

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default `EnvFilter` directive, overridden by `RUST_LOG`.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_wire_names() {
        assert_eq!(
            serde_json::to_value(ClientTransport::Websocket).unwrap(),
            "websocket"
        );
        let t: ClientTransport = serde_json::from_value(serde_json::json!("http")).unwrap();
        assert_eq!(t, ClientTransport::Http);
    }

    #[test]
    fn unknown_transport_rejected() {
        let r: Result<ClientTransport, _> = serde_json::from_value(serde_json::json!("carrier"));
        assert!(r.is_err());
    }

    #[test]
    fn log_format_json() {
        let s: LoggingSettings =
            serde_json::from_value(serde_json::json!({"format": "json"})).unwrap();
        assert_eq!(s.format, LogFormat::Json);
        assert_eq!(s.level, "info");
    }
}
