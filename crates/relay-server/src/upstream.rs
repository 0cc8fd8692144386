//! Upstream HTTP dispatch.

use std::time::Duration;

use relay_core::RelayMode;
use reqwest::Client;
use tracing::debug;

/// Upstream dispatch failures, surfaced to clients as 502-class errors.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Building the HTTP client failed.
    #[error("failed to build upstream client: {0}")]
    Build(String),

    /// The upstream request itself failed (connect, TLS, timeout).
    #[error("upstream request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// HTTP client for the configured OpenAI-compatible upstream.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    request_timeout: Duration,
}

impl UpstreamClient {
    /// Build a client for `base_url`.
    ///
    /// `request_timeout` caps non-streaming calls only; streamed responses
    /// are open-ended and bounded by the connection itself.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, DispatchError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| DispatchError::Build(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            request_timeout,
        })
    }

    /// Placeholder client for states built without upstream config.
    pub(crate) fn unconfigured() -> Self {
        Self {
            client: Client::new(),
            base_url: "https://api.openai.com".to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(300),
        }
    }

    /// The upstream base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, mode: RelayMode) -> String {
        match mode {
            RelayMode::Chat => format!("{}/v1/chat/completions", self.base_url),
            RelayMode::Completion => format!("{}/v1/completions", self.base_url),
        }
    }

    /// POST the prepared JSON payload upstream and return the raw response.
    pub async fn dispatch(
        &self,
        mode: RelayMode,
        payload: &serde_json::Value,
        streaming: bool,
    ) -> Result<reqwest::Response, DispatchError> {
        let url = self.endpoint(mode);
        debug!(url = %url, streaming, "Dispatching upstream request");

        let mut request = self.client.post(&url).json(payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        if !streaming {
            request = request.timeout(self.request_timeout);
        }
        Ok(request.send().await?)
    }
}
