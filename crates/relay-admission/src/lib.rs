//! # Relay Admission
//!
//! Background load monitoring for admission control:
//!
//! - **Signals**: pluggable boolean load predicates, with a marker-file
//!   implementation for host-level load flags
//! - **Monitor**: a polling task that samples the signal on a fixed
//!   interval and publishes the result through a lock-protected flag
//!
//! Request handlers read the flag on their hot path; the polling task is the
//! only writer, so reads never contend with anything slow.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod monitor;
pub mod signal;

// Re-export commonly used types
pub use monitor::{AdmissionConfig, AdmissionMonitor, HighLoadFlag};
pub use signal::{LoadSignal, MarkerFileSignal};
