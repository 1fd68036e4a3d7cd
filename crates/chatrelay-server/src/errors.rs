//! Server error types and their HTTP rendering.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Errors surfaced by the server.
///
/// Upstream failures are not represented here: they are contained inside the
/// relay loop and the query bridge and never reach a client as an error.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// `text` missing, not a string, or empty.
    #[error("No text provided")]
    InvalidInput,

    /// Request body could not be decoded as JSON.
    #[error("invalid request body: {0}")]
    InvalidJson(String),

    /// Listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The server loop failed.
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),

    /// The metrics recorder could not be installed.
    #[error("failed to install metrics recorder: {0}")]
    Metrics(String),
}

impl RelayError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::InvalidJson(_) => "INVALID_JSON",
            Self::Bind { .. } | Self::Serve(_) | Self::Metrics(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput | Self::InvalidJson(_) => StatusCode::BAD_REQUEST,
            Self::Bind { .. } | Self::Serve(_) | Self::Metrics(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        });
        (self.status(), Json(body)).into_response()
    }
}
