//! `OpenAI` provider implementing the [`Provider`] trait.
//!
//! Sends one streaming Chat Completions request per call with a single user
//! message and decodes the SSE response through the shared pipeline.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::{debug, error, instrument};

use super::stream_handler::OpenAIStreamState;
use super::types::{
    CHAT_COMPLETIONS_PATH, ChatCompletionRequest, ChatMessage, DEFAULT_BASE_URL, OpenAIConfig,
};
use crate::error_parsing::{parse_api_error, parse_retry_after_header};
use crate::provider::{Provider, ProviderError, ProviderResult, StreamEventStream};
use crate::stream_pipeline::{sse_to_event_stream, wrap_provider_stream};

/// `OpenAI` Chat Completions provider.
pub struct OpenAIProvider {
    config: OpenAIConfig,
    client: reqwest::Client,
}

impl OpenAIProvider {
    /// Create a new provider with its own HTTP client.
    #[must_use]
    pub fn new(config: OpenAIConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Full request URL.
    fn endpoint(&self) -> String {
        let base = self.config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        format!("{}{CHAT_COMPLETIONS_PATH}", base.trim_end_matches('/'))
    }

    /// Build HTTP headers for the request.
    fn build_headers(&self) -> ProviderResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let _ = headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));

        if let Some(api_key) = &self.config.api_key {
            let auth_value = format!("Bearer {api_key}");
            let _ = headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth_value).map_err(|e| ProviderError::Auth {
                    message: format!("Invalid API key header: {e}"),
                })?,
            );
        }

        Ok(headers)
    }

    fn build_request(&self, prompt: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage::user(prompt)],
            stream: true,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        }
    }

    /// Perform the streaming HTTP request and return the event stream.
    async fn stream_internal(&self, prompt: &str) -> ProviderResult<StreamEventStream> {
        let request = self.build_request(prompt);
        let headers = self.build_headers()?;

        debug!(
            model = %request.model,
            prompt_chars = prompt.chars().count(),
            "sending chat completion request"
        );

        let mut builder = self
            .client
            .post(self.endpoint())
            .headers(headers)
            .json(&request);
        if let Some(timeout) = self.config.request_timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(ProviderError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after_header);
            let body_text = response.text().await.unwrap_or_default();
            let err_info = parse_api_error(&body_text, status.as_u16());
            error!(
                status = status.as_u16(),
                code = err_info.code.as_deref().unwrap_or("unknown"),
                retryable = err_info.retryable,
                "OpenAI API error"
            );
            return Err(match status {
                StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited {
                    retry_after_ms: retry_after.unwrap_or(0),
                    message: err_info.message,
                },
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Auth {
                    message: err_info.message,
                },
                _ => ProviderError::Api {
                    status: status.as_u16(),
                    message: err_info.message,
                    code: err_info.code,
                    retryable: err_info.retryable,
                },
            });
        }

        Ok(sse_to_event_stream(
            response.bytes_stream(),
            OpenAIStreamState::new(),
        ))
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    #[instrument(skip_all, fields(provider = "openai", model = %self.config.model))]
    async fn stream(&self, prompt: &str) -> ProviderResult<StreamEventStream> {
        let started = Instant::now();
        wrap_provider_stream(self.name(), started, self.stream_internal(prompt).await)
    }
}
