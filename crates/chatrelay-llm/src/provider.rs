//! Provider trait and the shared streaming vocabulary.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

/// One item produced by an upstream completion stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    /// Incremental text content, exactly as the upstream emitted it.
    TextDelta {
        /// Text fragment.
        delta: String,
    },
    /// The upstream signalled completion. Always the last item of a
    /// successful stream.
    Done {
        /// Normalized stop reason (see [`crate::stop_reason`]).
        stop_reason: &'static str,
    },
}

impl StreamEvent {
    /// Text carried by a `TextDelta`, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::TextDelta { delta } => Some(delta),
            Self::Done { .. } => None,
        }
    }
}

/// Errors from a provider call, either while opening the stream or mid-stream.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Transport failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Request serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Credential rejected or unusable.
    #[error("authentication failed: {message}")]
    Auth {
        /// Error detail.
        message: String,
    },

    /// The upstream refused the request with 429.
    #[error("rate limited: {message}")]
    RateLimited {
        /// Suggested wait before retrying, `0` when unknown.
        retry_after_ms: u64,
        /// Error detail.
        message: String,
    },

    /// Non-success HTTP status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error detail.
        message: String,
        /// Provider error code, if reported.
        code: Option<String>,
        /// Whether the failure is transient.
        retryable: bool,
    },

    /// The stream broke after it was opened.
    #[error("stream error: {message}")]
    Stream {
        /// Error detail.
        message: String,
    },
}

impl ProviderError {
    /// Short label used for metrics and structured logs.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::Json(_) => "json",
            Self::Auth { .. } => "auth",
            Self::RateLimited { .. } => "rate_limited",
            Self::Api { .. } => "api",
            Self::Stream { .. } => "stream",
        }
    }
}

/// Convenience alias for provider results.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Lazy, finite sequence of provider events.
///
/// Ends after `Done`, or after the first `Err` item.
pub type StreamEventStream = Pin<Box<dyn Stream<Item = ProviderResult<StreamEvent>> + Send>>;

/// An upstream completion service.
///
/// Each call to [`stream`](Provider::stream) is one independent upstream
/// request. Dropping the returned stream abandons the request.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name for logs and metric labels.
    fn name(&self) -> &'static str;

    /// Model ID requests are sent with.
    fn model(&self) -> &str;

    /// Open a streaming completion for a single user message.
    async fn stream(&self, prompt: &str) -> ProviderResult<StreamEventStream>;
}
