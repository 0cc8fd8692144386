//! Complete (non-streaming) response types.
//!
//! These are deliberately tolerant views: every field defaults when absent so
//! a provider omitting optional parts never fails the decode. The relay only
//! interprets the fields it needs (model, choices, usage, error) and forwards
//! the raw bytes for everything else.

use serde::{Deserialize, Serialize};

/// Token accounting for one completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens consumed by the prompt.
    #[serde(default)]
    pub prompt_tokens: u32,
    /// Tokens produced by the completion.
    #[serde(default)]
    pub completion_tokens: u32,
    /// Total billed tokens.
    #[serde(default)]
    pub total_tokens: u32,
}

impl Usage {
    /// Build usage from prompt and completion counts.
    #[must_use]
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    /// Whether these numbers are unusable for billing.
    ///
    /// Some providers return zeroed usage on certain responses; a zero total,
    /// or zero on both sides, means the figures must be recomputed from the
    /// response text.
    #[must_use]
    pub fn is_untrustworthy(&self) -> bool {
        self.total_tokens == 0 || (self.prompt_tokens == 0 && self.completion_tokens == 0)
    }
}

/// Error object a provider may embed in a response body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamError {
    /// Error category, e.g. `insufficient_quota`. Empty means no error.
    #[serde(default, rename = "type")]
    pub kind: String,
    /// Human-readable description.
    #[serde(default)]
    pub message: String,
    /// Parameter the error refers to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<serde_json::Value>,
    /// Provider-specific error code, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<serde_json::Value>,
}

impl UpstreamError {
    /// Whether the provider actually declared an error.
    ///
    /// Providers signal errors through a non-empty `type`; an error object
    /// with an empty kind is treated as absent.
    #[must_use]
    pub fn is_present(&self) -> bool {
        !self.kind.is_empty()
    }
}

/// Message carried by one response choice.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseMessage {
    /// Role of the author, normally `assistant`.
    #[serde(default)]
    pub role: String,
    /// Message content. Providers send a string, `null`, or structured parts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<serde_json::Value>,
}

impl ResponseMessage {
    /// The plain-text content, or empty for null/structured content.
    #[must_use]
    pub fn text(&self) -> &str {
        self.content
            .as_ref()
            .and_then(serde_json::Value::as_str)
            .unwrap_or("")
    }
}

/// One choice of a complete response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseChoice {
    /// Position of this choice.
    #[serde(default)]
    pub index: u32,
    /// The generated message.
    #[serde(default)]
    pub message: ResponseMessage,
    /// Why generation stopped, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Decoded view of a complete completion response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    /// Model the upstream reports having served.
    #[serde(default)]
    pub model: String,
    /// Generated choices.
    #[serde(default)]
    pub choices: Vec<ResponseChoice>,
    /// Upstream-reported usage, zeroed when absent.
    #[serde(default)]
    pub usage: Usage,
    /// Embedded error object, if the provider declared one.
    #[serde(default)]
    pub error: Option<UpstreamError>,
}

impl ChatResponse {
    /// The embedded upstream error, if one was actually declared.
    #[must_use]
    pub fn upstream_error(&self) -> Option<&UpstreamError> {
        self.error.as_ref().filter(|e| e.is_present())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_new_sums_total() {
        let usage = Usage::new(10, 12);
        assert_eq!(usage.total_tokens, 22);
    }

    #[test]
    fn test_usage_trust() {
        assert!(Usage::default().is_untrustworthy());
        assert!(Usage {
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 15
        }
        .is_untrustworthy());
        assert!(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 0
        }
        .is_untrustworthy());
        assert!(!Usage::new(10, 5).is_untrustworthy());
    }

    #[test]
    fn test_response_decodes_minimal_body() {
        let body = r#"{"id":"cmpl-1","object":"chat.completion","choices":[]}"#;
        let response: ChatResponse = serde_json::from_str(body).unwrap();
        assert!(response.model.is_empty());
        assert!(response.usage.is_untrustworthy());
        assert!(response.upstream_error().is_none());
    }

    #[test]
    fn test_response_null_error_tolerated() {
        let body = r#"{"model":"gpt-4","choices":[],"error":null}"#;
        let response: ChatResponse = serde_json::from_str(body).unwrap();
        assert!(response.upstream_error().is_none());
    }

    #[test]
    fn test_response_empty_error_kind_not_present() {
        let body = r#"{"model":"gpt-4","error":{"type":"","message":"ignored"}}"#;
        let response: ChatResponse = serde_json::from_str(body).unwrap();
        assert!(response.upstream_error().is_none());
    }

    #[test]
    fn test_response_declared_error() {
        let body = r#"{"error":{"type":"insufficient_quota","message":"quota exceeded"}}"#;
        let response: ChatResponse = serde_json::from_str(body).unwrap();
        let err = response.upstream_error().unwrap();
        assert_eq!(err.kind, "insufficient_quota");
        assert_eq!(err.message, "quota exceeded");
    }

    #[test]
    fn test_message_text_flattens_content() {
        let msg: ResponseMessage = serde_json::from_str(r#"{"role":"assistant","content":"hi"}"#).unwrap();
        assert_eq!(msg.text(), "hi");

        let null_msg: ResponseMessage =
            serde_json::from_str(r#"{"role":"assistant","content":null}"#).unwrap();
        assert_eq!(null_msg.text(), "");

        let parts_msg: ResponseMessage =
            serde_json::from_str(r#"{"role":"assistant","content":[{"type":"text"}]}"#).unwrap();
        assert_eq!(parts_msg.text(), "");
    }
}
