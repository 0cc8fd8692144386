//! Error types for relay operations.

use http::StatusCode;

/// Result type alias for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;

/// Errors produced while relaying an upstream response.
///
/// All variants are transport- or decode-level failures that abort the
/// current relay call. Recoverable conditions (an undecodable stream chunk,
/// a masking re-encode failure) are handled inline by degrading to
/// unmodified forwarding and never surface here.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Reading the complete upstream response body failed.
    #[error("failed to read upstream response body: {0}")]
    ReadBody(String),

    /// The upstream byte stream failed mid-read.
    #[error("upstream stream read failed: {0}")]
    StreamRead(String),

    /// A complete upstream body could not be decoded as JSON.
    #[error("failed to decode upstream response body: {0}")]
    DecodeBody(String),

    /// Forwarding bytes to the client failed, usually because the client
    /// disconnected.
    #[error("failed to copy response to client: {0}")]
    CopyBody(String),
}

impl RelayError {
    /// Machine-readable code reported to clients and logs.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ReadBody(_) => "read_response_body_failed",
            Self::StreamRead(_) => "stream_read_failed",
            Self::DecodeBody(_) => "unmarshal_response_body_failed",
            Self::CopyBody(_) => "copy_response_body_failed",
        }
    }

    /// HTTP status reported when this error terminates a request.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            RelayError::ReadBody("eof".into()).code(),
            "read_response_body_failed"
        );
        assert_eq!(
            RelayError::StreamRead("reset".into()).code(),
            "stream_read_failed"
        );
        assert_eq!(
            RelayError::DecodeBody("bad json".into()).code(),
            "unmarshal_response_body_failed"
        );
        assert_eq!(
            RelayError::CopyBody("broken pipe".into()).code(),
            "copy_response_body_failed"
        );
    }

    #[test]
    fn test_error_display() {
        let err = RelayError::StreamRead("connection reset".into());
        assert_eq!(
            err.to_string(),
            "upstream stream read failed: connection reset"
        );
    }

    #[test]
    fn test_status_code() {
        assert_eq!(
            RelayError::DecodeBody("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
