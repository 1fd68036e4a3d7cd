//! `OpenAI` Chat Completions provider.
//!
//! Follows the composition pattern shared across providers:
//! `provider` (entry point), `stream_handler` (SSE → `StreamEvent`), `types`.

pub mod provider;
pub mod stream_handler;
pub mod types;

pub use provider::OpenAIProvider;
pub use types::OpenAIConfig;
