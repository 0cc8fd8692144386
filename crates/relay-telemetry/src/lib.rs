//! # Relay Telemetry
//!
//! Observability for the relay gateway:
//!
//! - **Logging**: tracing-subscriber setup with env-filter support and
//!   optional JSON output
//! - **Usage ledger**: in-memory intake of per-request token usage, the
//!   hand-off point to the billing pipeline

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod logging;
pub mod usage;

// Re-export commonly used types
pub use logging::{init_logging, LoggingConfig, TelemetryError};
pub use usage::{UsageEvent, UsageLedger, UsageTotals};
