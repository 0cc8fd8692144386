//! Shared application state.

use std::sync::Arc;

use relay_admission::HighLoadFlag;
use relay_config::RelayConfig;
use relay_core::{HeuristicTokenCounter, TokenCounter};
use relay_telemetry::UsageLedger;

use crate::upstream::UpstreamClient;

/// State shared across request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<RelayConfig>,
    /// Upstream dispatcher.
    pub upstream: UpstreamClient,
    /// Admission monitor read handle.
    pub high_load: HighLoadFlag,
    /// Usage intake for billing.
    pub ledger: Arc<UsageLedger>,
    /// Token counting collaborator.
    pub token_counter: Arc<dyn TokenCounter>,
}

impl AppState {
    /// Start building a state.
    #[must_use]
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::default()
    }
}

/// Builder for [`AppState`]; unset collaborators get working defaults.
#[derive(Default)]
pub struct AppStateBuilder {
    config: Option<RelayConfig>,
    upstream: Option<UpstreamClient>,
    high_load: Option<HighLoadFlag>,
    ledger: Option<Arc<UsageLedger>>,
    token_counter: Option<Arc<dyn TokenCounter>>,
}

impl AppStateBuilder {
    /// Set the configuration.
    #[must_use]
    pub fn config(mut self, config: RelayConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the upstream client.
    #[must_use]
    pub fn upstream(mut self, upstream: UpstreamClient) -> Self {
        self.upstream = Some(upstream);
        self
    }

    /// Set the admission flag handle.
    #[must_use]
    pub fn high_load(mut self, high_load: HighLoadFlag) -> Self {
        self.high_load = Some(high_load);
        self
    }

    /// Set the usage ledger.
    #[must_use]
    pub fn ledger(mut self, ledger: Arc<UsageLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Set the token counter.
    #[must_use]
    pub fn token_counter(mut self, counter: Arc<dyn TokenCounter>) -> Self {
        self.token_counter = Some(counter);
        self
    }

    /// Build the state.
    #[must_use]
    pub fn build(self) -> AppState {
        AppState {
            config: Arc::new(self.config.unwrap_or_default()),
            upstream: self.upstream.unwrap_or_else(UpstreamClient::unconfigured),
            high_load: self.high_load.unwrap_or_default(),
            ledger: self
                .ledger
                .unwrap_or_else(|| Arc::new(UsageLedger::with_defaults())),
            token_counter: self
                .token_counter
                .unwrap_or_else(|| Arc::new(HeuristicTokenCounter)),
        }
    }
}
