//! Chat Completions chunk → [`StreamEvent`] translation.

use serde_json::Value;
use tracing::debug;

use super::types::ChatCompletionChunk;
use crate::provider::{ProviderError, ProviderResult, StreamEvent};
use crate::stop_reason::map_openai_stop_reason;
use crate::stream_pipeline::SseEventHandler;

/// Per-stream decoding state.
#[derive(Debug, Default)]
pub struct OpenAIStreamState {
    finish_reason: Option<String>,
}

impl OpenAIStreamState {
    /// Fresh state for a new stream.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SseEventHandler for OpenAIStreamState {
    type Event = ChatCompletionChunk;

    fn on_event(&mut self, chunk: ChatCompletionChunk) -> ProviderResult<Vec<StreamEvent>> {
        if let Some(err) = chunk.error {
            let code = match err.code {
                Some(Value::String(s)) => Some(s),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => err.error_type,
            };
            return Err(ProviderError::Stream {
                message: match code {
                    Some(code) => format!(
                        "{} ({code})",
                        err.message.as_deref().unwrap_or("upstream error")
                    ),
                    None => err.message.unwrap_or_else(|| "upstream error".into()),
                },
            });
        }

        let Some(choice) = chunk.choices.into_iter().next() else {
            debug!("skipping chunk without choices");
            return Ok(Vec::new());
        };

        if let Some(reason) = choice.finish_reason {
            self.finish_reason = Some(reason);
        }

        match choice.delta.and_then(|d| d.content) {
            Some(content) if !content.is_empty() => Ok(vec![StreamEvent::TextDelta { delta: content }]),
            _ => Ok(Vec::new()),
        }
    }

    fn is_complete(&self) -> bool {
        self.finish_reason.is_some()
    }

    fn finish(&mut self) -> StreamEvent {
        StreamEvent::Done {
            stop_reason: map_openai_stop_reason(self.finish_reason.as_deref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn chunk(v: Value) -> ChatCompletionChunk {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn content_delta_becomes_text_delta() {
        let mut state = OpenAIStreamState::new();
        let out = state
            .on_event(chunk(json!({"choices": [{"delta": {"content": "Hel"}}]})))
            .unwrap();
        assert_eq!(out, vec![StreamEvent::TextDelta { delta: "Hel".into() }]);
        assert!(!state.is_complete());
    }

    #[test]
    fn role_only_delta_is_skipped() {
        let mut state = OpenAIStreamState::new();
        let out = state
            .on_event(chunk(json!({"choices": [{"delta": {"role": "assistant"}}]})))
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn empty_content_is_skipped() {
        let mut state = OpenAIStreamState::new();
        let out = state
            .on_event(chunk(json!({"choices": [{"delta": {"content": ""}}]})))
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn missing_choices_or_delta_is_skipped() {
        let mut state = OpenAIStreamState::new();
        assert!(state.on_event(chunk(json!({}))).unwrap().is_empty());
        assert!(
            state
                .on_event(chunk(json!({"choices": [{}]})))
                .unwrap()
                .is_empty()
        );
        assert!(!state.is_complete());
    }

    #[test]
    fn only_first_choice_is_read() {
        let mut state = OpenAIStreamState::new();
        let out = state
            .on_event(chunk(json!({"choices": [
                {"delta": {"content": "first"}},
                {"delta": {"content": "second"}}
            ]})))
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_text(), Some("first"));
    }

    #[test]
    fn finish_reason_marks_complete() {
        let mut state = OpenAIStreamState::new();
        let _ = state
            .on_event(chunk(
                json!({"choices": [{"delta": {}, "finish_reason": "length"}]}),
            ))
            .unwrap();
        assert!(state.is_complete());
        assert_eq!(
            state.finish(),
            StreamEvent::Done {
                stop_reason: "max_tokens"
            }
        );
    }

    #[test]
    fn finish_without_reason_is_end_turn() {
        let mut state = OpenAIStreamState::new();
        assert_eq!(
            state.finish(),
            StreamEvent::Done {
                stop_reason: "end_turn"
            }
        );
    }

    #[test]
    fn in_band_error_fails_stream() {
        let mut state = OpenAIStreamState::new();
        let result = state.on_event(chunk(json!({
            "error": {"message": "server overloaded", "type": "server_error"}
        })));
        assert_matches!(result, Err(ProviderError::Stream { message }) if message == "server overloaded (server_error)");
    }
}
