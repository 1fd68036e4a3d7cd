//! `OpenAI` Chat Completions wire types and provider configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default base URL for the `OpenAI` API.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Default model.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Chat Completions path, appended to the base URL.
pub const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// `OpenAI` provider configuration.
#[derive(Clone)]
pub struct OpenAIConfig {
    /// Model ID.
    pub model: String,
    /// Bearer API key. Omitted from requests when `None`.
    pub api_key: Option<String>,
    /// Base URL override.
    pub base_url: Option<String>,
    /// Temperature override.
    pub temperature: Option<f64>,
    /// Max output tokens override.
    pub max_tokens: Option<u32>,
    /// Whole-request timeout, covering the streamed body.
    pub request_timeout: Option<Duration>,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            base_url: None,
            temperature: None,
            max_tokens: None,
            request_timeout: None,
        }
    }
}

impl std::fmt::Debug for OpenAIConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIConfig")
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request
// ─────────────────────────────────────────────────────────────────────────────

/// One chat message.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    /// `user`, `assistant`, or `system`.
    pub role: String,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Streaming Chat Completions request body.
#[derive(Clone, Debug, Serialize)]
pub struct ChatCompletionRequest {
    /// Model ID.
    pub model: String,
    /// Conversation. The relay always sends a single user message.
    pub messages: Vec<ChatMessage>,
    /// Always `true`.
    pub stream: bool,
    /// Temperature override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Max output tokens override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Streaming response
// ─────────────────────────────────────────────────────────────────────────────

/// One `data:` payload of a streaming response.
///
/// Every field defaults so structurally odd chunks decode to an empty chunk
/// and are skipped instead of failing the stream.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChatCompletionChunk {
    /// Choices carried by this chunk; the relay reads only the first.
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    /// In-band error, sent by some gateways instead of an HTTP status.
    #[serde(default)]
    pub error: Option<ChunkError>,
}

/// One choice within a chunk.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChunkChoice {
    /// Incremental content.
    #[serde(default)]
    pub delta: Option<ChunkDelta>,
    /// Set on the final chunk of the choice.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Incremental message content.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChunkDelta {
    /// Present on the first chunk only.
    #[serde(default)]
    pub role: Option<String>,
    /// Text fragment.
    #[serde(default)]
    pub content: Option<String>,
}

/// In-band stream error.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChunkError {
    /// Error detail.
    #[serde(default)]
    pub message: Option<String>,
    /// Error type.
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,
    /// Error code (string or number).
    #[serde(default)]
    pub code: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_serializes_minimal() {
        let req = ChatCompletionRequest {
            model: "gpt-3.5-turbo".into(),
            messages: vec![ChatMessage::user("Hi")],
            stream: true,
            temperature: None,
            max_tokens: None,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(
            v,
            json!({
                "model": "gpt-3.5-turbo",
                "messages": [{"role": "user", "content": "Hi"}],
                "stream": true
            })
        );
    }

    #[test]
    fn request_includes_overrides() {
        let req = ChatCompletionRequest {
            model: "m".into(),
            messages: vec![],
            stream: true,
            temperature: Some(0.5),
            max_tokens: Some(256),
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["temperature"], 0.5);
        assert_eq!(v["max_tokens"], 256);
    }

    #[test]
    fn chunk_with_content() {
        let chunk: ChatCompletionChunk = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion.chunk",
            "choices": [{"index": 0, "delta": {"content": "Hel"}, "finish_reason": null}]
        }))
        .unwrap();
        let delta = chunk.choices[0].delta.as_ref().unwrap();
        assert_eq!(delta.content.as_deref(), Some("Hel"));
        assert!(chunk.choices[0].finish_reason.is_none());
    }

    #[test]
    fn chunk_missing_everything_decodes_empty() {
        let chunk: ChatCompletionChunk = serde_json::from_value(json!({"id": "x"})).unwrap();
        assert!(chunk.choices.is_empty());
        assert!(chunk.error.is_none());
    }

    #[test]
    fn chunk_error_numeric_code() {
        let chunk: ChatCompletionChunk = serde_json::from_value(json!({
            "error": {"message": "overloaded", "code": 503}
        }))
        .unwrap();
        let err = chunk.error.unwrap();
        assert_eq!(err.message.as_deref(), Some("overloaded"));
        assert_eq!(err.code, Some(json!(503)));
    }

    #[test]
    fn config_debug_redacts_key() {
        let cfg = OpenAIConfig {
            api_key: Some("sk-live".into()),
            ..OpenAIConfig::default()
        };
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("sk-live"));
    }
}
