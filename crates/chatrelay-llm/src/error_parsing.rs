//! Provider error body parsing.

use serde_json::Value;

/// Parsed view of an upstream error response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiErrorInfo {
    /// Human-readable message.
    pub message: String,
    /// Provider error code or type, if present.
    pub code: Option<String>,
    /// Whether a later attempt could succeed.
    pub retryable: bool,
}

/// Extract a message and code from an error response body.
///
/// Understands the `{"error": {"message", "type", "code"}}` envelope and
/// falls back to the raw body (or the status) for anything else.
pub fn parse_api_error(body: &str, status: u16) -> ApiErrorInfo {
    let retryable = status == 429 || status >= 500;
    let parsed = serde_json::from_str::<Value>(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));

    let message = error
        .and_then(|e| e.get("message").or(Some(e)))
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| format!("HTTP {status}"));

    let code = error.and_then(|e| {
        e.get("code")
            .and_then(value_to_code)
            .or_else(|| e.get("type").and_then(value_to_code))
    });

    ApiErrorInfo {
        message,
        code,
        retryable,
    }
}

fn value_to_code(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a `Retry-After` header given in seconds into milliseconds.
pub fn parse_retry_after_header(value: &str) -> Option<u64> {
    let secs: f64 = value.trim().parse().ok()?;
    (secs.is_finite() && secs >= 0.0).then(|| (secs * 1000.0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_error_envelope() {
        let body = r#"{"error": {"message": "Invalid API key", "type": "invalid_request_error", "code": "invalid_api_key"}}"#;
        let info = parse_api_error(body, 401);
        assert_eq!(info.message, "Invalid API key");
        assert_eq!(info.code.as_deref(), Some("invalid_api_key"));
        assert!(!info.retryable);
    }

    #[test]
    fn falls_back_to_type_when_code_null() {
        let body = r#"{"error": {"message": "Too many", "type": "requests", "code": null}}"#;
        let info = parse_api_error(body, 429);
        assert_eq!(info.code.as_deref(), Some("requests"));
        assert!(info.retryable);
    }

    #[test]
    fn string_error_field() {
        let info = parse_api_error(r#"{"error": "boom"}"#, 500);
        assert_eq!(info.message, "boom");
        assert!(info.retryable);
    }

    #[test]
    fn plain_text_body() {
        let info = parse_api_error("upstream unavailable\n", 503);
        assert_eq!(info.message, "upstream unavailable");
        assert!(info.code.is_none());
    }

    #[test]
    fn empty_body_uses_status() {
        let info = parse_api_error("", 502);
        assert_eq!(info.message, "HTTP 502");
    }

    #[test]
    fn retry_after_seconds() {
        assert_eq!(parse_retry_after_header("2"), Some(2000));
        assert_eq!(parse_retry_after_header(" 0.5 "), Some(500));
    }

    #[test]
    fn retry_after_invalid() {
        assert_eq!(parse_retry_after_header("soon"), None);
        assert_eq!(parse_retry_after_header("-1"), None);
    }
}
