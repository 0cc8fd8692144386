//! Load signals.

use std::path::{Path, PathBuf};

/// A boolean load predicate sampled by the admission monitor.
///
/// Implementations should answer quickly; the monitor polls from a single
/// task and a slow probe delays the next sample, not request handling.
pub trait LoadSignal: Send + Sync + 'static {
    /// Whether the host is currently under high load.
    fn is_high_load(&self) -> bool;
}

impl<F> LoadSignal for F
where
    F: Fn() -> bool + Send + Sync + 'static,
{
    fn is_high_load(&self) -> bool {
        self()
    }
}

/// Signal derived from the presence of a marker file.
///
/// Host tooling creates the file when the machine should shed load and
/// removes it when pressure clears; the gateway only ever stats the path.
#[derive(Debug, Clone)]
pub struct MarkerFileSignal {
    path: PathBuf,
}

impl MarkerFileSignal {
    /// Conventional marker location.
    pub const DEFAULT_PATH: &'static str = "/tmp/high_load_flag";

    /// Probe the given path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The path being probed.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for MarkerFileSignal {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PATH)
    }
}

impl LoadSignal for MarkerFileSignal {
    fn is_high_load(&self) -> bool {
        self.path.exists()
    }
}
