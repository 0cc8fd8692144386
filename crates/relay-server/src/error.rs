//! HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use relay_core::{RelayError, UpstreamError};
use serde_json::json;

/// Error returned to API clients as OpenAI-style JSON:
/// `{"error": {"message": ..., "type": ...}}`.
#[derive(Debug)]
pub struct ApiError {
    /// HTTP status to answer with.
    pub status: StatusCode,
    /// Human-readable message.
    pub message: String,
    /// Machine-readable error type.
    pub code: String,
}

impl ApiError {
    /// Create an error with explicit status and code.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code: code.into(),
        }
    }

    /// 400 with `invalid_request_error`.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, "invalid_request_error")
    }

    /// 503 with `server_overloaded`, sent while shedding load.
    #[must_use]
    pub fn overloaded(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            message,
            "server_overloaded",
        )
    }

    /// 502 with `upstream_error`.
    #[must_use]
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message, "upstream_error")
    }

    /// 500 with `internal_error`.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message, "internal_error")
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        Self::new(err.status_code(), err.to_string(), err.code())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "message": self.message,
                "type": self.code,
            }
        });
        (self.status, Json(body)).into_response()
    }
}

/// Render a provider-declared error at the upstream's original status.
#[must_use]
pub fn upstream_error_response(error: &UpstreamError, status: StatusCode) -> Response {
    (status, Json(json!({ "error": error }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let err = ApiError::bad_request("missing model");
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "invalid_request_error");

        let err = ApiError::overloaded("busy");
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_from_relay_error() {
        let err: ApiError = RelayError::DecodeBody("bad json".into()).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code, "unmarshal_response_body_failed");
        assert!(err.message.contains("bad json"));
    }

    #[test]
    fn test_into_response_status() {
        let response = ApiError::bad_gateway("upstream down").into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
