//! Model-identifier masking.
//!
//! After a model redirect the upstream answers with the model it actually
//! served, which would reveal the redirect to the client. Masking rewrites
//! that identifier back to the one the client requested. Every failure path
//! degrades to forwarding the original bytes: masking must never turn a
//! deliverable response into an error.

use bytes::Bytes;
use relay_core::{ChatChunk, RedirectionContext};
use serde_json::Value;
use tracing::debug;

/// Rewrite a decoded chunk's model field and re-encode it.
///
/// Returns the masked payload, or `None` when re-encoding fails and the
/// caller must fall back to the original line.
pub fn mask_chunk(chunk: &mut ChatChunk, redirection: &RedirectionContext) -> Option<String> {
    chunk.model = redirection.original_model.clone();
    match serde_json::to_string(chunk) {
        Ok(encoded) => Some(encoded),
        Err(e) => {
            debug!(error = %e, "Chunk re-encode failed, forwarding original line");
            None
        }
    }
}

/// Rewrite the model field of a complete response body.
///
/// The structured path decodes the body, overwrites a non-empty string
/// `model` field, and re-encodes. When no usable model field exists the
/// crude fallback replaces the literal `"model":"<target>"` substring, which
/// assumes the upstream serialized the field without whitespace. Bodies that
/// match neither path come back unchanged.
#[must_use]
pub fn mask_body(raw: &Bytes, redirection: &RedirectionContext) -> Bytes {
    if let Ok(mut value) = serde_json::from_slice::<Value>(raw) {
        let has_model = value
            .get("model")
            .and_then(Value::as_str)
            .is_some_and(|model| !model.is_empty());
        if has_model {
            value["model"] = Value::String(redirection.original_model.clone());
            match serde_json::to_vec(&value) {
                Ok(encoded) => return Bytes::from(encoded),
                Err(e) => {
                    debug!(error = %e, "Body re-encode failed, keeping original bytes");
                    return raw.clone();
                }
            }
        }
    }

    let Ok(text) = std::str::from_utf8(raw) else {
        return raw.clone();
    };
    let needle = format!("\"model\":\"{}\"", redirection.target_model);
    let replacement = format!("\"model\":\"{}\"", redirection.original_model);
    Bytes::from(text.replace(&needle, &replacement))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redirect() -> RedirectionContext {
        RedirectionContext::redirected("gpt-4", "gpt-4-turbo")
    }

    #[test]
    fn test_mask_chunk_rewrites_model() {
        let mut chunk: ChatChunk = serde_json::from_str(
            r#"{"model":"gpt-4-turbo","choices":[{"index":0,"delta":{"content":"hi"}}]}"#,
        )
        .unwrap();
        let encoded = mask_chunk(&mut chunk, &redirect()).unwrap();
        let round: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(round["model"], "gpt-4");
        assert_eq!(round["choices"][0]["delta"]["content"], "hi");
    }

    #[test]
    fn test_mask_body_structured_path() {
        let raw = Bytes::from_static(
            br#"{"model":"gpt-4-turbo","choices":[],"vendor_extra":{"nested":true}}"#,
        );
        let masked = mask_body(&raw, &redirect());
        let value: Value = serde_json::from_slice(&masked).unwrap();
        assert_eq!(value["model"], "gpt-4");
        // Unknown fields survive the rewrite.
        assert_eq!(value["vendor_extra"]["nested"], true);
    }

    #[test]
    fn test_mask_body_substring_fallback() {
        // No top-level model field, but the target appears nested in the raw
        // bytes: the fallback rewrites it literally.
        let raw = Bytes::from_static(br#"{"meta":{"model":"gpt-4-turbo"},"choices":[]}"#);
        let masked = mask_body(&raw, &redirect());
        let value: Value = serde_json::from_slice(&masked).unwrap();
        assert_eq!(value["meta"]["model"], "gpt-4");
    }

    #[test]
    fn test_mask_body_fallback_misses_spaced_field() {
        // The fallback only matches the whitespace-free serialization.
        let raw = Bytes::from_static(br#"not json, but mentions "model": "gpt-4-turbo" spaced"#);
        let masked = mask_body(&raw, &redirect());
        assert_eq!(masked, raw);
    }

    #[test]
    fn test_mask_body_non_string_model_uses_fallback() {
        let raw = Bytes::from_static(br#"{"model":123,"meta":{"model":"gpt-4-turbo"}}"#);
        let masked = mask_body(&raw, &redirect());
        // The numeric field is not usable; the literal nested occurrence is
        // rewritten instead.
        let value: Value = serde_json::from_slice(&masked).unwrap();
        assert_eq!(value["model"], 123);
        assert_eq!(value["meta"]["model"], "gpt-4");
    }

    #[test]
    fn test_mask_body_invalid_utf8_unchanged() {
        let raw = Bytes::from_static(&[0xff, 0xfe, 0x01]);
        let masked = mask_body(&raw, &redirect());
        assert_eq!(masked, raw);
    }
}
