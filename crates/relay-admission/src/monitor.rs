//! Admission monitor.
//!
//! Samples a [`LoadSignal`] on a fixed interval from a dedicated task and
//! publishes the latest value through [`HighLoadFlag`]. Starting returns a
//! running monitor, so a second start of the same monitor cannot exist, and
//! the first sample is taken synchronously: callers never observe the flag
//! before it reflects the signal at least once.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::signal::LoadSignal;

/// Polling settings for the admission monitor.
#[derive(Debug, Clone)]
pub struct AdmissionConfig {
    /// Interval between signal samples.
    pub poll_interval: Duration,
}

impl AdmissionConfig {
    /// Default sampling interval.
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

    /// Create a config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sampling interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Shared read handle to the current load state.
///
/// Cloneable and cheap to read on the request hot path. Only the monitor's
/// polling task writes it.
#[derive(Debug, Clone, Default)]
pub struct HighLoadFlag {
    inner: Arc<RwLock<bool>>,
}

impl HighLoadFlag {
    /// Current load state.
    #[must_use]
    pub fn is_high_load(&self) -> bool {
        *self.inner.read()
    }

    /// Store a new value, returning the previous one. Read-modify-write
    /// happens under a single write lock.
    fn replace(&self, value: bool) -> bool {
        let mut guard = self.inner.write();
        std::mem::replace(&mut *guard, value)
    }
}

/// Background monitor owning the polling task.
pub struct AdmissionMonitor {
    flag: HighLoadFlag,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl AdmissionMonitor {
    /// Start polling `signal`.
    ///
    /// The first sample happens before this returns; subsequent samples run
    /// on the configured interval until [`stop`](Self::stop).
    #[must_use]
    pub fn start<S: LoadSignal>(signal: S, config: AdmissionConfig) -> Self {
        let flag = HighLoadFlag::default();
        sample(&flag, &signal);

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let poll_flag = flag.clone();
        let interval = config.poll_interval;
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick resolves immediately and the initial sample is
            // already taken; consume it so the loop waits a full interval.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => sample(&poll_flag, &signal),
                    _ = shutdown_rx.changed() => break,
                }
            }
            debug!("Admission monitor stopped polling");
        });

        Self {
            flag,
            shutdown,
            task,
        }
    }

    /// A read handle for request handlers.
    #[must_use]
    pub fn flag(&self) -> HighLoadFlag {
        self.flag.clone()
    }

    /// Current load state.
    #[must_use]
    pub fn is_high_load(&self) -> bool {
        self.flag.is_high_load()
    }

    /// Signal the polling task and wait for it to exit.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Admission monitor task did not exit cleanly");
        }
    }
}

/// Take one sample, logging only on change.
fn sample<S: LoadSignal>(flag: &HighLoadFlag, signal: &S) {
    let value = signal.is_high_load();
    let previous = flag.replace(value);
    if previous != value {
        info!(high_load = value, "High load state changed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::MarkerFileSignal;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn fast_config() -> AdmissionConfig {
        AdmissionConfig::new().with_poll_interval(Duration::from_millis(20))
    }

    #[tokio::test]
    async fn test_initial_sample_taken_before_start_returns() {
        let monitor = AdmissionMonitor::start(|| true, fast_config());
        // No sleep: the constructor itself must have sampled.
        assert!(monitor.is_high_load());
        monitor.stop().await;
    }

    #[tokio::test]
    async fn test_flag_follows_marker_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("high_load_flag");
        let monitor =
            AdmissionMonitor::start(MarkerFileSignal::new(&path), fast_config());
        assert!(!monitor.is_high_load());

        std::fs::File::create(&path).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(monitor.is_high_load());

        std::fs::remove_file(&path).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!monitor.is_high_load());

        monitor.stop().await;
    }

    #[tokio::test]
    async fn test_flag_handle_shares_state() {
        let shared = Arc::new(AtomicBool::new(false));
        let probe = shared.clone();
        let monitor =
            AdmissionMonitor::start(move || probe.load(Ordering::SeqCst), fast_config());
        let flag = monitor.flag();
        assert!(!flag.is_high_load());

        shared.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(flag.is_high_load());

        monitor.stop().await;
    }

    #[tokio::test]
    async fn test_stop_terminates_polling() {
        let shared = Arc::new(AtomicBool::new(false));
        let probe = shared.clone();
        let monitor =
            AdmissionMonitor::start(move || probe.load(Ordering::SeqCst), fast_config());
        let flag = monitor.flag();
        monitor.stop().await;

        // Samples taken after stop would flip the flag; none may happen.
        shared.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!flag.is_high_load());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_readers() {
        let shared = Arc::new(AtomicBool::new(false));
        let probe = shared.clone();
        let monitor = AdmissionMonitor::start(
            move || probe.load(Ordering::SeqCst),
            AdmissionConfig::new().with_poll_interval(Duration::from_millis(5)),
        );

        let mut readers = Vec::new();
        for _ in 0..4 {
            let flag = monitor.flag();
            readers.push(tokio::spawn(async move {
                for _ in 0..200 {
                    // Reads are either true or false, never torn or blocked.
                    let _ = flag.is_high_load();
                    tokio::task::yield_now().await;
                }
            }));
        }
        for i in 0..20 {
            shared.store(i % 2 == 0, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        for reader in readers {
            reader.await.unwrap();
        }
        monitor.stop().await;
    }
}
