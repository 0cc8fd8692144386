//! Streaming chunk types.
//!
//! Chunk shapes follow the OpenAI streaming dialects. Decoding is tolerant
//! (most fields default when absent) because the relay must survive the
//! shape drift between providers; re-encoding after masking preserves the
//! fields the relay understands and drops nothing it decoded.

use serde::{Deserialize, Serialize};

use crate::response::Usage;

/// Incremental content carried by one chat chunk choice.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkDelta {
    /// Author role, only present on the first chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Text fragment appended by this chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Tool call fragments, forwarded opaquely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<serde_json::Value>,
}

/// One choice of a chat streaming chunk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkChoice {
    /// Position of this choice.
    #[serde(default)]
    pub index: u32,
    /// Incremental content.
    #[serde(default)]
    pub delta: ChunkDelta,
    /// Why generation stopped, on the final content chunk.
    #[serde(default)]
    pub finish_reason: Option<String>,
    /// Log probabilities, forwarded opaquely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<serde_json::Value>,
}

/// One decoded chat-mode streaming chunk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatChunk {
    /// Chunk identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Object type, normally `chat.completion.chunk`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    /// Creation timestamp (unix seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
    /// Model that produced the chunk; the field masking rewrites.
    #[serde(default)]
    pub model: String,
    /// Incremental choices; empty on keep-alive and usage-only chunks.
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    /// Backend fingerprint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_fingerprint: Option<String>,
    /// Usage totals, carried by the final chunk on some providers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl ChatChunk {
    /// Whether this chunk carries neither content nor usage.
    ///
    /// Some providers emit such frames as keep-alives; they are suppressed
    /// rather than forwarded.
    #[must_use]
    pub fn is_keep_alive(&self) -> bool {
        self.choices.is_empty() && self.usage.is_none()
    }
}

/// One choice of a legacy completion streaming chunk.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionChunkChoice {
    /// Text fragment appended by this chunk.
    #[serde(default)]
    pub text: String,
    /// Position of this choice.
    #[serde(default)]
    pub index: u32,
    /// Why generation stopped, on the final chunk.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// One decoded legacy completion-mode streaming chunk.
///
/// Completion chunks are decoded only for text accumulation; the raw line is
/// always what gets forwarded, so no `Serialize` impl exists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionChunk {
    /// Incremental choices.
    #[serde(default)]
    pub choices: Vec<CompletionChunkChoice>,
}
