//! `POST /query`: one prompt in, one streamed NDJSON response out.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderName, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use chatrelay_llm::{Provider, StreamEvent};
use futures::{Stream, StreamExt};
use metrics::counter;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use super::framing::{NDJSON_CONTENT_TYPE, ResponseUnit, encode_unit};
use crate::errors::RelayError;
use crate::metrics::{
    QUERY_REJECTED_TOTAL, QUERY_REQUESTS_TOTAL, RELAY_FRAGMENTS_TOTAL, RELAY_TURN_ERRORS_TOTAL,
    RELAY_TURNS_TOTAL,
};
use crate::state::AppState;

const TRANSPORT: &str = "http";

/// Handle `POST /query`.
///
/// The body is decoded by hand so any content type is accepted and every
/// malformed request gets the same error envelope.
pub async fn query_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, RelayError> {
    let prompt = match parse_prompt(&body) {
        Ok(prompt) => prompt,
        Err(e) => {
            counter!(QUERY_REJECTED_TOTAL).increment(1);
            debug!(error = %e, "rejecting query");
            return Err(e);
        }
    };
    counter!(QUERY_REQUESTS_TOTAL).increment(1);

    let stream = ndjson_stream(
        Arc::clone(&state.provider),
        prompt,
        state.settings.relay.fragment_delay(),
    );
    Ok((
        [
            (header::CONTENT_TYPE, NDJSON_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

/// Extract a non-empty `text` string from a JSON request body.
///
/// Whitespace-only text is a valid prompt and is forwarded as-is.
pub fn parse_prompt(body: &[u8]) -> Result<String, RelayError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| RelayError::InvalidJson(e.to_string()))?;
    value
        .get("text")
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
        .ok_or(RelayError::InvalidInput)
}

/// Open the provider lazily and yield one encoded line per fragment.
///
/// A start failure yields nothing. A mid-stream failure stops after the
/// lines already produced. Only a clean finish yields the terminal unit.
pub fn ndjson_stream(
    provider: Arc<dyn Provider>,
    prompt: String,
    fragment_delay: Option<Duration>,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    async_stream::stream! {
        counter!(RELAY_TURNS_TOTAL, "transport" => TRANSPORT).increment(1);
        let started = Instant::now();

        let mut upstream = match provider.stream(&prompt).await {
            Ok(stream) => stream,
            Err(e) => {
                counter!(RELAY_TURN_ERRORS_TOTAL, "transport" => TRANSPORT).increment(1);
                warn!(error = %e, kind = e.category(), "upstream request failed");
                return;
            }
        };

        let mut fragments = 0usize;
        let mut full_text = String::new();
        while let Some(event) = upstream.next().await {
            match event {
                Ok(StreamEvent::TextDelta { delta }) => {
                    if delta.is_empty() {
                        continue;
                    }
                    if fragments > 0 {
                        if let Some(delay) = fragment_delay {
                            tokio::time::sleep(delay).await;
                        }
                    }
                    debug!(
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        chars = delta.len(),
                        "fragment received"
                    );
                    match encode_unit(&ResponseUnit::message(&delta)) {
                        Ok(line) => {
                            fragments += 1;
                            full_text.push_str(&delta);
                            counter!(RELAY_FRAGMENTS_TOTAL, "transport" => TRANSPORT).increment(1);
                            yield Ok(line);
                        }
                        Err(e) => {
                            warn!(error = %e, "failed to encode fragment");
                            return;
                        }
                    }
                }
                Ok(StreamEvent::Done { stop_reason }) => {
                    debug!(
                        fragments,
                        chars = full_text.len(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        stop_reason,
                        "query complete"
                    );
                    trace!(text = %full_text, "full response");
                    if let Ok(line) = encode_unit(&ResponseUnit::done(stop_reason)) {
                        yield Ok(line);
                    }
                    return;
                }
                Err(e) => {
                    counter!(RELAY_TURN_ERRORS_TOTAL, "transport" => TRANSPORT).increment(1);
                    warn!(error = %e, kind = e.category(), fragments, "upstream stream failed mid-response");
                    return;
                }
            }
        }
        debug!(fragments, "upstream stream ended without a stop reason");
    }
}
