//! # Relay Core
//!
//! Core types shared by every crate in the LLM relay gateway:
//!
//! - **Wire types**: streaming chunk and complete-response shapes for the
//!   OpenAI-compatible dialects the gateway relays
//! - **Error taxonomy**: transport and decode failures with their
//!   machine-readable codes
//! - **Redirection**: the record of a model redirect that masking consults
//! - **Token counting**: the trait the relay uses to attribute completion
//!   tokens when an upstream's own accounting cannot be trusted

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod redirect;
pub mod response;
pub mod streaming;
pub mod tokens;
pub mod types;

// Re-export commonly used types
pub use error::{RelayError, RelayResult};
pub use redirect::RedirectionContext;
pub use response::{ChatResponse, ResponseChoice, ResponseMessage, UpstreamError, Usage};
pub use streaming::{ChatChunk, ChunkChoice, ChunkDelta, CompletionChunk, CompletionChunkChoice};
pub use tokens::{HeuristicTokenCounter, TokenCounter};
pub use types::RelayMode;
