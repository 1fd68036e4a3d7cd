//! # Stop Reason Mapping
//!
//! Maps provider-specific finish reasons to the relay's stop reason strings,
//! which are reported in the one-shot endpoint's terminal unit.

/// Map a Chat Completions `finish_reason` to a stop reason string.
///
/// Chat Completions uses:
/// - `"stop"` -> normal completion
/// - `"length"` -> max tokens reached
/// - `"content_filter"` -> output withheld by the safety filter
/// - `"tool_calls"` / `"function_call"` -> model wants to call tools
/// - `null` -> default to `end_turn`
pub fn map_openai_stop_reason(reason: Option<&str>) -> &'static str {
    match reason {
        Some("length") => "max_tokens",
        Some("content_filter") => "content_filter",
        Some("tool_calls" | "function_call") => "tool_use",
        _ => "end_turn",
    }
}
