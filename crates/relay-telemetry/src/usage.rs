//! Usage accounting.
//!
//! The relay reports authoritative token numbers per request; the ledger
//! buffers them in memory with aggregate counters. A billing exporter drains
//! [`recent`](UsageLedger::recent) out of band; bounded retention keeps the
//! buffer from growing without limit if it never does.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One recorded relay completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageEvent {
    /// When the relay finished.
    pub timestamp: DateTime<Utc>,
    /// Request identifier.
    pub request_id: String,
    /// Model the client requested.
    pub model: String,
    /// Prompt-side tokens.
    pub prompt_tokens: u32,
    /// Completion-side tokens.
    pub completion_tokens: u32,
    /// Billed total.
    pub total_tokens: u32,
    /// Whether the response was streamed.
    pub streamed: bool,
}

impl UsageEvent {
    /// Create an event stamped now.
    #[must_use]
    pub fn new(
        request_id: impl Into<String>,
        model: impl Into<String>,
        prompt_tokens: u32,
        completion_tokens: u32,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            request_id: request_id.into(),
            model: model.into(),
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            streamed: false,
        }
    }

    /// Mark the event as coming from a streamed response.
    #[must_use]
    pub fn with_streamed(mut self, streamed: bool) -> Self {
        self.streamed = streamed;
        self
    }
}

/// Aggregate counters across all recorded events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageTotals {
    /// Requests recorded.
    pub requests: u64,
    /// Prompt tokens across all requests.
    pub prompt_tokens: u64,
    /// Completion tokens across all requests.
    pub completion_tokens: u64,
    /// Total billed tokens.
    pub total_tokens: u64,
}

/// In-memory usage intake.
pub struct UsageLedger {
    max_events: usize,
    events: RwLock<VecDeque<UsageEvent>>,
    requests: AtomicU64,
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
}

impl UsageLedger {
    /// Default retention before old events are evicted.
    pub const DEFAULT_MAX_EVENTS: usize = 10_000;

    /// Create a ledger retaining up to `max_events` events.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            max_events,
            events: RwLock::new(VecDeque::new()),
            requests: AtomicU64::new(0),
            prompt_tokens: AtomicU64::new(0),
            completion_tokens: AtomicU64::new(0),
        }
    }

    /// Create a ledger with default retention.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(Self::DEFAULT_MAX_EVENTS)
    }

    /// Record one completed relay.
    pub fn record(&self, event: UsageEvent) {
        debug!(
            request_id = %event.request_id,
            model = %event.model,
            total_tokens = event.total_tokens,
            streamed = event.streamed,
            "Recording usage event"
        );
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.prompt_tokens
            .fetch_add(u64::from(event.prompt_tokens), Ordering::Relaxed);
        self.completion_tokens
            .fetch_add(u64::from(event.completion_tokens), Ordering::Relaxed);

        let mut events = self.events.write();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Aggregate counters.
    #[must_use]
    pub fn totals(&self) -> UsageTotals {
        let prompt_tokens = self.prompt_tokens.load(Ordering::Relaxed);
        let completion_tokens = self.completion_tokens.load(Ordering::Relaxed);
        UsageTotals {
            requests: self.requests.load(Ordering::Relaxed),
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    /// Most recent events, newest first.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<UsageEvent> {
        let events = self.events.read();
        events.iter().rev().take(limit).cloned().collect()
    }

    /// Number of retained events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Whether no events are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}
