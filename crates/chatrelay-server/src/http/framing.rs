//! Newline-delimited JSON framing for streamed `/query` responses.

use bytes::Bytes;
use serde::Serialize;

/// Content type of a streamed `/query` body.
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// One line of a `/query` response body.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ResponseUnit<'a> {
    /// A relayed fragment.
    Message {
        /// Fragment text, unmodified.
        message: &'a str,
    },
    /// Normal end of the response.
    Done {
        /// Always `true`.
        done: bool,
        /// Why the upstream stopped.
        #[serde(rename = "stopReason")]
        stop_reason: &'a str,
    },
}

impl<'a> ResponseUnit<'a> {
    /// Unit carrying one fragment.
    pub fn message(message: &'a str) -> Self {
        Self::Message { message }
    }

    /// Terminal unit.
    pub fn done(stop_reason: &'a str) -> Self {
        Self::Done {
            done: true,
            stop_reason,
        }
    }
}

/// Serialize `unit` as a single line, newline included.
pub fn encode_unit(unit: &ResponseUnit<'_>) -> serde_json::Result<Bytes> {
    let mut buf = serde_json::to_vec(unit)?;
    buf.push(b'\n');
    Ok(Bytes::from(buf))
}
