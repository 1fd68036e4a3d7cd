//! # chatrelay-llm
//!
//! Upstream completion providers for the chat relay.
//!
//! - **Provider trait**: [`Provider`] opens one streaming completion for a
//!   prompt and returns a [`StreamEventStream`] of text fragments
//! - **SSE pipeline**: [`stream_pipeline::sse_to_event_stream`] turns a raw
//!   byte stream into provider events, skipping malformed events
//! - **`OpenAI`**: [`openai::OpenAIProvider`] speaks the Chat Completions
//!   streaming protocol
//! - **Test provider**: `testutil::ScriptedProvider` (feature `test-util`)
//!
//! ## Crate Position
//!
//! Leaf crate. Depended on by `chatrelay-server` and the `chatrelay` binary.

#![deny(unsafe_code)]

pub mod error_parsing;
pub mod openai;
pub mod provider;
pub mod stop_reason;
pub mod stream_pipeline;

#[cfg(any(test, feature = "test-util"))]
pub mod testutil;

pub use provider::{Provider, ProviderError, ProviderResult, StreamEvent, StreamEventStream};
