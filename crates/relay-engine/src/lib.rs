//! # Relay Engine
//!
//! The response-relay layer of the gateway:
//!
//! - **SSE scanning**: line framing and classification for upstream
//!   event streams
//! - **Streaming relay**: forwards chunks line by line while accumulating
//!   response text and usage for billing
//! - **Full-body relay**: parses a complete upstream body before any part of
//!   the response is released to the client
//! - **Masking**: rewrites upstream model identifiers back to the
//!   client-requested one after a model redirect
//! - **Sinks**: the client-facing write abstraction, bounded-channel backed
//!   in production

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod body;
pub mod mask;
pub mod sink;
pub mod sse;
pub mod stream;

// Re-export commonly used types
pub use body::{sanitize_headers, BodyOutcome, BodyRelay, RelayedResponse};
pub use sink::{ChannelSink, CollectSink, EventSink};
pub use sse::{LineBuffer, SseLine, DATA_PREFIX, DONE_SENTINEL};
pub use stream::{LineDisposition, StreamOutcome, StreamRelay};
