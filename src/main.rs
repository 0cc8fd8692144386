//! # LLM Relay Gateway
//!
//! OpenAI-compatible relay that sits between clients and an upstream LLM
//! provider, forwarding completions while keeping billing and model naming
//! under the gateway's control.
//!
//! ## Features
//!
//! - Streaming (SSE) and full-body relay with token accounting
//! - Model redirection with response masking
//! - Host-level admission control via a marker file
//! - Usage ledger exposed on an admin surface
//!
//! ## Usage
//!
//! ```bash
//! # Start with default configuration
//! llm-relay-gateway
//!
//! # Start with a custom config file
//! RELAY_CONFIG=/path/to/config.yaml llm-relay-gateway
//!
//! # Start with environment overrides
//! RELAY_PORT=9000 llm-relay-gateway
//! ```

use std::sync::Arc;

use relay_admission::{AdmissionConfig, AdmissionMonitor, MarkerFileSignal};
use relay_config::{load_config, RelayConfig};
use relay_server::{AppState, Server, ServerConfig, UpstreamClient};
use relay_telemetry::{init_logging, LoggingConfig, UsageLedger};
use tracing::{error, info};

/// Application entry point
#[tokio::main]
async fn main() {
    // Configuration drives the logging setup, so load it first.
    let config = match load_config().await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(
        &LoggingConfig::new()
            .with_level(&config.logging.level)
            .with_json(config.logging.json),
    ) {
        eprintln!("Failed to initialize logging: {e}");
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting LLM Relay Gateway"
    );

    if let Err(e) = run(config).await {
        error!(error = %e, "Application failed");
        std::process::exit(1);
    }
}

/// Main application logic
async fn run(config: RelayConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        host = %config.server.host,
        port = config.server.port,
        upstream = %config.upstream.base_url,
        "Configuration loaded"
    );
    if !config.model_redirects.is_empty() {
        info!(
            redirects = config.model_redirects.len(),
            "Model redirects configured"
        );
    }

    // The monitor takes its first sample before start() returns, so the
    // admission flag is meaningful from the first request onward.
    let monitor = AdmissionMonitor::start(
        MarkerFileSignal::new(&config.admission.marker_path),
        AdmissionConfig::new().with_poll_interval(config.admission.poll_interval()),
    );

    let upstream = UpstreamClient::new(
        &config.upstream.base_url,
        config.upstream.api_key.clone(),
        config.upstream.connect_timeout(),
        config.upstream.request_timeout(),
    )?;

    let ledger = Arc::new(UsageLedger::with_defaults());

    let server_config = ServerConfig::new()
        .with_host(&config.server.host)
        .with_port(config.server.port);

    let state = AppState::builder()
        .config(config)
        .upstream(upstream)
        .high_load(monitor.flag())
        .ledger(ledger)
        .build();

    let result = Server::new(server_config, state).run().await;

    // Stop polling before reporting the outcome so the process never exits
    // with the sampler task still running.
    monitor.stop().await;
    result?;

    info!("Relay gateway shut down cleanly");
    Ok(())
}
