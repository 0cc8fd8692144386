//! # Relay Config
//!
//! Configuration for the relay gateway, loaded from a YAML file with
//! environment-variable overrides:
//!
//! - `RELAY_CONFIG`: path of the config file (default `config.yaml`)
//! - `RELAY_HOST` / `RELAY_PORT`: listener overrides
//! - `RELAY_UPSTREAM_BASE_URL` / `RELAY_UPSTREAM_API_KEY`: upstream overrides
//! - `RELAY_LOG_LEVEL`: logging override
//!
//! A missing config file is not an error; defaults apply and the overrides
//! still run.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Default config file path when `RELAY_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Reading the config file failed.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path that could not be read.
        path: String,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The config file is not valid YAML.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A field failed validation.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level gateway configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// HTTP listener settings.
    pub server: ServerSection,
    /// Upstream provider settings.
    pub upstream: UpstreamSection,
    /// Admission monitor settings.
    pub admission: AdmissionSection,
    /// Logging settings.
    pub logging: LoggingSection,
    /// Requested-model to upstream-model redirects.
    pub model_redirects: HashMap<String, String>,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Upstream provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamSection {
    /// Base URL of the OpenAI-compatible upstream.
    pub base_url: String,
    /// Bearer token sent upstream, if any.
    pub api_key: Option<String>,
    /// Connection timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds for non-streaming calls.
    pub request_timeout_secs: u64,
}

impl UpstreamSection {
    /// Connection timeout as a duration.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Request timeout as a duration.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for UpstreamSection {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key: None,
            connect_timeout_secs: 10,
            request_timeout_secs: 300,
        }
    }
}

/// Admission monitor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionSection {
    /// Marker file whose presence flags high load.
    pub marker_path: String,
    /// Seconds between marker probes.
    pub poll_interval_secs: u64,
}

impl AdmissionSection {
    /// Poll interval as a duration.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Default for AdmissionSection {
    fn default() -> Self {
        Self {
            marker_path: "/tmp/high_load_flag".to_string(),
            poll_interval_secs: 5,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level filter, e.g. `info` or `relay_engine=debug`.
    pub level: String,
    /// Emit JSON-formatted logs.
    pub json: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl RelayConfig {
    /// Parse a YAML document and validate it.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a YAML file and validate it.
    pub async fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_yaml_str(&yaml)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream.base_url.is_empty() {
            return Err(ConfigError::Invalid(
                "upstream.base_url must not be empty".to_string(),
            ));
        }
        if self.admission.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "admission.poll_interval_secs must be positive".to_string(),
            ));
        }
        if self.admission.marker_path.is_empty() {
            return Err(ConfigError::Invalid(
                "admission.marker_path must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply environment-variable overrides on top of file values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("RELAY_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("RELAY_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!(value = %port, "Ignoring unparseable RELAY_PORT"),
            }
        }
        if let Ok(base_url) = std::env::var("RELAY_UPSTREAM_BASE_URL") {
            self.upstream.base_url = base_url;
        }
        if let Ok(api_key) = std::env::var("RELAY_UPSTREAM_API_KEY") {
            self.upstream.api_key = Some(api_key);
        }
        if let Ok(level) = std::env::var("RELAY_LOG_LEVEL") {
            self.logging.level = level;
        }
    }
}

/// Load configuration from `RELAY_CONFIG` (or the default path) plus
/// environment overrides.
pub async fn load_config() -> Result<RelayConfig, ConfigError> {
    let path =
        std::env::var("RELAY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = if Path::new(&path).exists() {
        info!(path = %path, "Loading configuration file");
        RelayConfig::from_yaml_file(&path).await?
    } else {
        info!(path = %path, "No configuration file found, using defaults");
        RelayConfig::default()
    };
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}
