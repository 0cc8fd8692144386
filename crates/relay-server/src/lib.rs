//! # Relay Server
//!
//! The HTTP surface of the relay gateway:
//!
//! - **Routes**: OpenAI-compatible completion endpoints, health probes, and
//!   an admin stats endpoint
//! - **Handlers**: admission gating, model-redirect resolution, upstream
//!   dispatch, and hand-off to the relay engine
//! - **Upstream client**: the outbound HTTP dispatcher
//! - **Server**: listener lifecycle with graceful shutdown

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;
pub mod upstream;

// Re-export commonly used types
pub use error::ApiError;
pub use routes::create_router;
pub use server::{Server, ServerConfig, ServerError};
pub use state::{AppState, AppStateBuilder};
pub use upstream::{DispatchError, UpstreamClient};
