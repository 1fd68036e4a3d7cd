//! Completion service settings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Settings for the upstream completion service.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpstreamSettings {
    /// API base URL (without the `/v1/...` path).
    pub base_url: String,
    /// Model ID sent with every request.
    pub model: String,
    /// Sampling temperature override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Max output tokens override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Whole-request timeout in seconds, covering the full streamed response.
    pub request_timeout_secs: u64,
    /// Bearer credential. Read from the file or `OPENAI_API_KEY`, never written back.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            temperature: None,
            max_tokens: None,
            request_timeout_secs: 120,
            api_key: None,
        }
    }
}

impl fmt::Debug for UpstreamSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamSettings")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
