//! Shared SSE → [`StreamEvent`] pipeline and provider stream instrumentation.
//!
//! Providers implement [`SseEventHandler`] for their wire format; the
//! pipeline owns SSE framing, the `[DONE]` sentinel, malformed-event
//! skipping, and early-EOF detection.

use std::fmt::Display;
use std::time::Instant;

use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use metrics::{counter, histogram};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::provider::{ProviderError, ProviderResult, StreamEvent, StreamEventStream};

/// Data payload that terminates an SSE completion stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Per-stream decoder for one provider's SSE payloads.
pub trait SseEventHandler: Send + 'static {
    /// Deserialized form of one SSE `data:` payload.
    type Event: DeserializeOwned + Send;

    /// Translate one decoded event into zero or more stream events.
    ///
    /// Returning `Err` ends the stream with that error.
    fn on_event(&mut self, event: Self::Event) -> ProviderResult<Vec<StreamEvent>>;

    /// Whether the upstream has signalled completion in-band.
    fn is_complete(&self) -> bool;

    /// Emit the terminal event. Called once, at `[DONE]` or clean EOF.
    fn finish(&mut self) -> StreamEvent;
}

/// Decode an SSE byte stream into provider events.
///
/// Events whose payload fails to deserialize are skipped. A transport error
/// yields one `Err` and ends the stream. EOF without `[DONE]` is accepted
/// only if the handler already saw an in-band completion.
pub fn sse_to_event_stream<S, B, E, H>(bytes: S, mut handler: H) -> StreamEventStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
    H: SseEventHandler,
{
    Box::pin(async_stream::stream! {
        let mut events = std::pin::pin!(bytes.eventsource());
        let mut skipped = 0u32;

        while let Some(item) = events.next().await {
            let sse = match item {
                Ok(sse) => sse,
                Err(e) => {
                    yield Err(ProviderError::Stream { message: e.to_string() });
                    return;
                }
            };

            let data = sse.data.trim();
            if data.is_empty() {
                continue;
            }
            if data == DONE_SENTINEL {
                yield Ok(handler.finish());
                return;
            }

            let decoded = match serde_json::from_str::<H::Event>(data) {
                Ok(decoded) => decoded,
                Err(e) => {
                    skipped += 1;
                    debug!(error = %e, skipped, "skipping malformed SSE event");
                    continue;
                }
            };

            match handler.on_event(decoded) {
                Ok(out) => {
                    for event in out {
                        yield Ok(event);
                    }
                }
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }

        if handler.is_complete() {
            yield Ok(handler.finish());
        } else {
            yield Err(ProviderError::Stream {
                message: "upstream closed the stream before completion".into(),
            });
        }
    })
}

/// Record request-level metrics around a provider stream.
///
/// Counts the request, counts setup and mid-stream errors by category, and
/// records time-to-first-fragment and total duration.
pub fn wrap_provider_stream(
    provider: &'static str,
    started: Instant,
    result: ProviderResult<StreamEventStream>,
) -> ProviderResult<StreamEventStream> {
    counter!("provider_requests_total", "provider" => provider).increment(1);

    let inner = match result {
        Ok(inner) => inner,
        Err(e) => {
            counter!("provider_errors_total", "provider" => provider, "kind" => e.category())
                .increment(1);
            warn!(provider, error = %e, "provider stream failed to open");
            return Err(e);
        }
    };

    Ok(Box::pin(async_stream::stream! {
        let mut inner = inner;
        let mut first_fragment = true;
        while let Some(item) = inner.next().await {
            match &item {
                Ok(StreamEvent::TextDelta { .. }) if first_fragment => {
                    first_fragment = false;
                    histogram!("provider_ttft_seconds", "provider" => provider)
                        .record(started.elapsed().as_secs_f64());
                }
                Err(e) => {
                    counter!("provider_errors_total", "provider" => provider, "kind" => e.category())
                        .increment(1);
                }
                _ => {}
            }
            yield item;
        }
        histogram!("provider_request_duration_seconds", "provider" => provider)
            .record(started.elapsed().as_secs_f64());
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use bytes::Bytes;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Piece {
        text: String,
        #[serde(default)]
        last: bool,
    }

    #[derive(Default)]
    struct PieceHandler {
        complete: bool,
    }

    impl SseEventHandler for PieceHandler {
        type Event = Piece;

        fn on_event(&mut self, event: Piece) -> ProviderResult<Vec<StreamEvent>> {
            if event.text == "explode" {
                return Err(ProviderError::Stream {
                    message: "exploded".into(),
                });
            }
            self.complete |= event.last;
            Ok(vec![StreamEvent::TextDelta { delta: event.text }])
        }

        fn is_complete(&self) -> bool {
            self.complete
        }

        fn finish(&mut self) -> StreamEvent {
            StreamEvent::Done {
                stop_reason: "end_turn",
            }
        }
    }

    fn byte_stream(
        chunks: &[&str],
    ) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static {
        let owned: Vec<Result<Bytes, std::io::Error>> = chunks
            .iter()
            .map(|c| Ok(Bytes::from((*c).to_string())))
            .collect();
        futures::stream::iter(owned)
    }

    async fn collect(stream: StreamEventStream) -> Vec<ProviderResult<StreamEvent>> {
        stream.collect().await
    }

    fn texts(items: &[ProviderResult<StreamEvent>]) -> Vec<String> {
        items
            .iter()
            .filter_map(|i| i.as_ref().ok().and_then(StreamEvent::as_text))
            .map(str::to_string)
            .collect()
    }

    #[tokio::test]
    async fn decodes_events_until_done_sentinel() {
        let stream = sse_to_event_stream(
            byte_stream(&[
                "data: {\"text\":\"Hel\"}\n\n",
                "data: {\"text\":\"lo\"}\n\n",
                "data: [DONE]\n\n",
                "data: {\"text\":\"ignored\"}\n\n",
            ]),
            PieceHandler::default(),
        );
        let items = collect(stream).await;
        assert_eq!(texts(&items), vec!["Hel", "lo"]);
        assert_matches!(items.last(), Some(Ok(StreamEvent::Done { .. })));
    }

    #[tokio::test]
    async fn event_split_across_chunks() {
        let stream = sse_to_event_stream(
            byte_stream(&["data: {\"te", "xt\":\"abc\"}\n", "\ndata: [DONE]\n\n"]),
            PieceHandler::default(),
        );
        let items = collect(stream).await;
        assert_eq!(texts(&items), vec!["abc"]);
    }

    #[tokio::test]
    async fn malformed_events_are_skipped() {
        let stream = sse_to_event_stream(
            byte_stream(&[
                "data: {\"text\":\"a\"}\n\n",
                "data: {not json}\n\n",
                "data: {\"other\":1}\n\n",
                "data: {\"text\":\"b\"}\n\n",
                "data: [DONE]\n\n",
            ]),
            PieceHandler::default(),
        );
        let items = collect(stream).await;
        assert_eq!(texts(&items), vec!["a", "b"]);
        assert!(items.iter().all(Result::is_ok));
    }

    #[tokio::test]
    async fn handler_error_ends_stream() {
        let stream = sse_to_event_stream(
            byte_stream(&[
                "data: {\"text\":\"Par\"}\n\n",
                "data: {\"text\":\"explode\"}\n\n",
                "data: {\"text\":\"never\"}\n\n",
            ]),
            PieceHandler::default(),
        );
        let items = collect(stream).await;
        assert_eq!(items.len(), 2);
        assert_eq!(texts(&items), vec!["Par"]);
        assert_matches!(items[1], Err(ProviderError::Stream { .. }));
    }

    #[tokio::test]
    async fn eof_without_completion_is_an_error() {
        let stream = sse_to_event_stream(
            byte_stream(&["data: {\"text\":\"cut\"}\n\n"]),
            PieceHandler::default(),
        );
        let items = collect(stream).await;
        assert_eq!(texts(&items), vec!["cut"]);
        assert_matches!(items.last(), Some(Err(ProviderError::Stream { .. })));
    }

    #[tokio::test]
    async fn eof_after_in_band_completion_is_clean() {
        let stream = sse_to_event_stream(
            byte_stream(&["data: {\"text\":\"end\",\"last\":true}\n\n"]),
            PieceHandler::default(),
        );
        let items = collect(stream).await;
        assert_matches!(items.last(), Some(Ok(StreamEvent::Done { .. })));
    }

    #[tokio::test]
    async fn transport_error_ends_stream() {
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"data: {\"text\":\"x\"}\n\n")),
            Err(std::io::Error::other("reset by peer")),
            Ok(Bytes::from_static(b"data: {\"text\":\"y\"}\n\n")),
        ];
        let stream = sse_to_event_stream(futures::stream::iter(chunks), PieceHandler::default());
        let items = collect(stream).await;
        assert_eq!(texts(&items), vec!["x"]);
        assert_eq!(items.len(), 2);
        assert_matches!(items[1], Err(ProviderError::Stream { .. }));
    }

    #[tokio::test]
    async fn wrap_passes_setup_error_through() {
        let result = wrap_provider_stream(
            "test",
            Instant::now(),
            Err(ProviderError::Auth {
                message: "no key".into(),
            }),
        );
        assert_matches!(result.map(|_| ()), Err(ProviderError::Auth { .. }));
    }

    #[tokio::test]
    async fn wrap_preserves_items_and_order() {
        let inner: StreamEventStream = Box::pin(futures::stream::iter(vec![
            Ok(StreamEvent::TextDelta { delta: "1".into() }),
            Ok(StreamEvent::TextDelta { delta: "2".into() }),
            Ok(StreamEvent::Done {
                stop_reason: "end_turn",
            }),
        ]));
        let wrapped = wrap_provider_stream("test", Instant::now(), Ok(inner)).unwrap();
        let items = collect(wrapped).await;
        assert_eq!(texts(&items), vec!["1", "2"]);
        assert_eq!(items.len(), 3);
    }
}
