use crate::types::EnrichedGamepass;
use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Result type alias for aggregator operations
pub type Result<T, E = UpstreamError> = std::result::Result<T, E>;

/// Errors produced while talking to an upstream resource. These never reach
/// API callers directly: the pipeline degrades them into partial results.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("upstream returned {status} for {url}")]
    Status { url: String, status: StatusCode },

    #[error("unexpected payload shape from {0}")]
    UnexpectedPayload(String),
}

/// Errors surfaced by the HTTP API layer.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error body shared by every failing endpoint. The lists are present but
/// empty so callers can always index into `gamepasses`.
#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    gamepasses: Vec<EnrichedGamepass>,
    count: usize,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            success: false,
            error: self.to_string(),
            gamepasses: Vec::new(),
            count: 0,
        });

        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_shape() {
        let body = ErrorBody {
            success: false,
            error: "invalid identifier: abc".to_string(),
            gamepasses: Vec::new(),
            count: 0,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["gamepasses"], serde_json::json!([]));
        assert_eq!(json["count"], 0);
    }
}
