//! Full-body (non-streaming) relay.
//!
//! Nothing of the client response exists until the upstream body has been
//! read, decoded, and rewritten: the relay returns a fully materialized
//! [`RelayedResponse`] or an error, so status and headers can never reach
//! the client ahead of a body that later fails to parse.

use std::future::Future;

use bytes::Bytes;
use http::header::{CONNECTION, CONTENT_LENGTH, TRANSFER_ENCODING};
use http::{HeaderMap, StatusCode};
use relay_core::{
    ChatResponse, RedirectionContext, RelayError, RelayResult, TokenCounter, UpstreamError, Usage,
};

use crate::mask;

/// Fully materialized response ready for the HTTP layer.
#[derive(Debug)]
pub struct RelayedResponse {
    /// Upstream status code.
    pub status: StatusCode,
    /// Upstream headers, minus hop-by-hop and length fields.
    pub headers: HeaderMap,
    /// Final, possibly masked, body bytes.
    pub body: Bytes,
    /// Authoritative usage for billing.
    pub usage: Usage,
}

/// Result of relaying a complete upstream body.
#[derive(Debug)]
pub enum BodyOutcome {
    /// Body forwarded, possibly masked; usage is authoritative.
    Relayed(RelayedResponse),
    /// The provider embedded an error object; it is surfaced to the client
    /// at the upstream's original status, and nothing is billed.
    UpstreamError {
        /// Decoded error payload.
        error: UpstreamError,
        /// Status the upstream answered with.
        status: StatusCode,
    },
}

/// Full-body relay for one request.
#[derive(Debug)]
pub struct BodyRelay {
    redirection: RedirectionContext,
    prompt_tokens: u32,
    model: String,
}

impl BodyRelay {
    /// Create a relay.
    ///
    /// `prompt_tokens` is the gateway's own count of the prompt side, used
    /// when usage must be recomputed. `model` is the counting fallback for
    /// bodies that do not declare one.
    #[must_use]
    pub fn new(
        redirection: RedirectionContext,
        prompt_tokens: u32,
        model: impl Into<String>,
    ) -> Self {
        Self {
            redirection,
            prompt_tokens,
            model: model.into(),
        }
    }

    /// Read, decode, and rewrite one complete upstream body.
    ///
    /// Read and decode failures are fatal: an unparseable body cannot be
    /// forwarded while claiming success.
    pub async fn run<F, E>(
        &self,
        status: StatusCode,
        headers: &HeaderMap,
        body: F,
        counter: &dyn TokenCounter,
    ) -> RelayResult<BodyOutcome>
    where
        F: Future<Output = Result<Bytes, E>>,
        E: std::fmt::Display,
    {
        let raw = body
            .await
            .map_err(|e| RelayError::ReadBody(e.to_string()))?;

        let decoded: ChatResponse = serde_json::from_slice(&raw)
            .map_err(|e| RelayError::DecodeBody(e.to_string()))?;

        if let Some(error) = decoded.upstream_error() {
            return Ok(BodyOutcome::UpstreamError {
                error: error.clone(),
                status,
            });
        }

        let body = if self.redirection.was_redirected {
            mask::mask_body(&raw, &self.redirection)
        } else {
            raw
        };

        Ok(BodyOutcome::Relayed(RelayedResponse {
            status,
            headers: sanitize_headers(headers),
            body,
            usage: self.resolve_usage(&decoded, counter),
        }))
    }

    /// Upstream usage when trustworthy, otherwise recomputed from the
    /// response text against the gateway's own prompt count.
    fn resolve_usage(&self, response: &ChatResponse, counter: &dyn TokenCounter) -> Usage {
        if !response.usage.is_untrustworthy() {
            return response.usage;
        }
        let model = if response.model.is_empty() {
            &self.model
        } else {
            &response.model
        };
        let completion_tokens = response
            .choices
            .iter()
            .map(|choice| counter.count(choice.message.text(), model))
            .sum();
        Usage::new(self.prompt_tokens, completion_tokens)
    }
}

/// Copy upstream headers, dropping the fields the relay owns.
///
/// The body may change length under masking and the client connection is
/// framed by this server, so length and hop-by-hop fields never pass
/// through.
#[must_use]
pub fn sanitize_headers(headers: &HeaderMap) -> HeaderMap {
    let mut out = headers.clone();
    out.remove(CONTENT_LENGTH);
    out.remove(TRANSFER_ENCODING);
    out.remove(CONNECTION);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    /// Counter with fixed per-text values; panics on unexpected input so
    /// tests catch unwanted consultations.
    struct MapCounter;

    impl TokenCounter for MapCounter {
        fn count(&self, text: &str, _model: &str) -> u32 {
            match text {
                "five tokens here" => 5,
                "seven tokens over here" => 7,
                "" => 0,
                other => panic!("unexpected text counted: {other}"),
            }
        }
    }

    /// Counter that must never be consulted.
    struct UntouchableCounter;

    impl TokenCounter for UntouchableCounter {
        fn count(&self, _text: &str, _model: &str) -> u32 {
            panic!("counter consulted for trustworthy usage");
        }
    }

    fn ok_body(raw: &'static [u8]) -> impl Future<Output = Result<Bytes, Infallible>> {
        std::future::ready(Ok(Bytes::from_static(raw)))
    }

    fn relay() -> BodyRelay {
        BodyRelay::new(RedirectionContext::none(), 10, "gpt-4")
    }

    fn relayed(outcome: BodyOutcome) -> RelayedResponse {
        match outcome {
            BodyOutcome::Relayed(r) => r,
            BodyOutcome::UpstreamError { error, .. } => {
                panic!("unexpected upstream error: {}", error.kind)
            }
        }
    }

    #[tokio::test]
    async fn test_trustworthy_usage_passes_through() {
        let body = br#"{"model":"gpt-4","choices":[{"index":0,"message":{"role":"assistant","content":"hi"}}],"usage":{"prompt_tokens":10,"completion_tokens":5,"total_tokens":15}}"#;
        let outcome = relay()
            .run(StatusCode::OK, &HeaderMap::new(), ok_body(body), &UntouchableCounter)
            .await
            .unwrap();
        let response = relayed(outcome);
        assert_eq!(response.usage, Usage::new(10, 5));
    }

    #[tokio::test]
    async fn test_untrustworthy_usage_recomputed_per_choice() {
        let body = br#"{"model":"gpt-4","choices":[
            {"index":0,"message":{"role":"assistant","content":"five tokens here"}},
            {"index":1,"message":{"role":"assistant","content":"seven tokens over here"}}
        ],"usage":{"prompt_tokens":0,"completion_tokens":0,"total_tokens":0}}"#;
        let outcome = relay()
            .run(StatusCode::OK, &HeaderMap::new(), ok_body(body), &MapCounter)
            .await
            .unwrap();
        let response = relayed(outcome);
        assert_eq!(response.usage.prompt_tokens, 10);
        assert_eq!(response.usage.completion_tokens, 12);
        assert_eq!(response.usage.total_tokens, 22);
    }

    #[tokio::test]
    async fn test_missing_usage_field_recomputed() {
        let body = br#"{"model":"gpt-4","choices":[{"index":0,"message":{"content":"five tokens here"}}]}"#;
        let outcome = relay()
            .run(StatusCode::OK, &HeaderMap::new(), ok_body(body), &MapCounter)
            .await
            .unwrap();
        assert_eq!(relayed(outcome).usage, Usage::new(10, 5));
    }

    #[tokio::test]
    async fn test_decode_failure_is_fatal() {
        let err = relay()
            .run(
                StatusCode::OK,
                &HeaderMap::new(),
                ok_body(b"<html>bad gateway</html>"),
                &UntouchableCounter,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "unmarshal_response_body_failed");
    }

    #[tokio::test]
    async fn test_read_failure_is_fatal() {
        let body = std::future::ready(Err::<Bytes, _>("connection reset".to_string()));
        let err = relay()
            .run(StatusCode::OK, &HeaderMap::new(), body, &UntouchableCounter)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "read_response_body_failed");
    }

    #[tokio::test]
    async fn test_upstream_error_short_circuits() {
        let body = br#"{"error":{"type":"insufficient_quota","message":"quota exceeded"},"choices":[]}"#;
        let outcome = relay()
            .run(
                StatusCode::TOO_MANY_REQUESTS,
                &HeaderMap::new(),
                ok_body(body),
                &UntouchableCounter,
            )
            .await
            .unwrap();
        match outcome {
            BodyOutcome::UpstreamError { error, status } => {
                assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
                assert_eq!(error.kind, "insufficient_quota");
            }
            BodyOutcome::Relayed(_) => panic!("error body must not be relayed as success"),
        }
    }

    #[tokio::test]
    async fn test_masking_applied_when_redirected() {
        let body = br#"{"model":"gpt-4-turbo","choices":[{"index":0,"message":{"content":"hi"}}],"usage":{"prompt_tokens":1,"completion_tokens":1,"total_tokens":2}}"#;
        let relay = BodyRelay::new(
            RedirectionContext::redirected("gpt-4", "gpt-4-turbo"),
            0,
            "gpt-4-turbo",
        );
        let outcome = relay
            .run(StatusCode::OK, &HeaderMap::new(), ok_body(body), &UntouchableCounter)
            .await
            .unwrap();
        let response = relayed(outcome);
        let value: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(value["model"], "gpt-4");
    }

    #[tokio::test]
    async fn test_headers_sanitized() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, "42".parse().unwrap());
        headers.insert(TRANSFER_ENCODING, "chunked".parse().unwrap());
        headers.insert("content-type", "application/json".parse().unwrap());
        headers.insert("x-ratelimit-remaining", "99".parse().unwrap());

        let body = br#"{"model":"m","choices":[],"usage":{"prompt_tokens":1,"completion_tokens":1,"total_tokens":2}}"#;
        let outcome = relay()
            .run(StatusCode::OK, &headers, ok_body(body), &UntouchableCounter)
            .await
            .unwrap();
        let response = relayed(outcome);
        assert!(response.headers.get(CONTENT_LENGTH).is_none());
        assert!(response.headers.get(TRANSFER_ENCODING).is_none());
        assert_eq!(
            response.headers.get("content-type").unwrap(),
            "application/json"
        );
        assert_eq!(response.headers.get("x-ratelimit-remaining").unwrap(), "99");
    }

    #[tokio::test]
    async fn test_empty_choices_recompute_to_prompt_only() {
        let body = br#"{"model":"m","choices":[]}"#;
        let outcome = relay()
            .run(StatusCode::OK, &HeaderMap::new(), ok_body(body), &MapCounter)
            .await
            .unwrap();
        assert_eq!(relayed(outcome).usage, Usage::new(10, 0));
    }
}
