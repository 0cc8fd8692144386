//! Request handlers.
//!
//! A completion request flows through: admission gate, minimal payload
//! parse, model-redirect resolution, upstream dispatch, then hand-off to the
//! streaming or full-body relay. Everything the relay does not interpret
//! passes through opaquely.

use std::convert::Infallible;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use relay_core::{RedirectionContext, RelayMode, TokenCounter, Usage};
use relay_engine::{sanitize_headers, BodyOutcome, BodyRelay, ChannelSink, StreamRelay};
use relay_telemetry::UsageEvent;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument};

use crate::error::{upstream_error_response, ApiError};
use crate::extractors::RequestId;
use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status string.
    pub status: String,
    /// Crate version.
    pub version: String,
}

/// Liveness probe.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness probe; reports the admission flag without failing on it.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ready",
        "high_load": state.high_load.is_high_load(),
    }))
}

/// Gateway statistics for the admin surface.
#[derive(Debug, Serialize)]
pub struct RelayStats {
    /// Requests recorded by the ledger.
    pub requests: u64,
    /// Prompt tokens across all requests.
    pub prompt_tokens: u64,
    /// Completion tokens across all requests.
    pub completion_tokens: u64,
    /// Total billed tokens.
    pub total_tokens: u64,
    /// Current admission flag.
    pub high_load: bool,
}

/// Admin stats endpoint.
pub async fn relay_stats(State(state): State<AppState>) -> Json<RelayStats> {
    let totals = state.ledger.totals();
    Json(RelayStats {
        requests: totals.requests,
        prompt_tokens: totals.prompt_tokens,
        completion_tokens: totals.completion_tokens,
        total_tokens: totals.total_tokens,
        high_load: state.high_load.is_high_load(),
    })
}

/// Chat completions relay endpoint.
#[instrument(skip(state, body), fields(request_id = %request_id))]
pub async fn chat_completions(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    body: Bytes,
) -> Result<Response, ApiError> {
    relay_completion(state, request_id, RelayMode::Chat, &body).await
}

/// Legacy completions relay endpoint.
#[instrument(skip(state, body), fields(request_id = %request_id))]
pub async fn completions(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    body: Bytes,
) -> Result<Response, ApiError> {
    relay_completion(state, request_id, RelayMode::Completion, &body).await
}

async fn relay_completion(
    state: AppState,
    request_id: String,
    mode: RelayMode,
    body: &[u8],
) -> Result<Response, ApiError> {
    // Admission gate: shed work while the host is flagged.
    if state.high_load.is_high_load() {
        info!(request_id = %request_id, "Rejecting request, host under high load");
        return Err(ApiError::overloaded(
            "The server is currently under high load, please try again later",
        ));
    }

    let mut payload: Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {e}")))?;
    let request = RequestView::parse(&payload)?;

    debug!(
        request_id = %request_id,
        model = %request.model,
        streaming = request.stream,
        mode = %mode,
        "Relaying completion request"
    );

    let redirection = resolve_redirect(&state, &mut payload, &request.model);
    let served_model = if redirection.was_redirected {
        redirection.target_model.clone()
    } else {
        request.model.clone()
    };
    let prompt_tokens =
        estimate_prompt_tokens(state.token_counter.as_ref(), &payload, mode, &served_model);

    let upstream_response = state
        .upstream
        .dispatch(mode, &payload, request.stream)
        .await
        .map_err(|e| {
            error!(request_id = %request_id, error = %e, "Upstream dispatch failed");
            ApiError::bad_gateway(format!("Upstream request failed: {e}"))
        })?;

    if request.stream {
        handle_streaming(
            state,
            request_id,
            mode,
            redirection,
            request.model,
            served_model,
            prompt_tokens,
            upstream_response,
        )
        .await
    } else {
        handle_buffered(
            state,
            request_id,
            redirection,
            request.model,
            served_model,
            prompt_tokens,
            upstream_response,
        )
        .await
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_streaming(
    state: AppState,
    request_id: String,
    mode: RelayMode,
    redirection: RedirectionContext,
    requested_model: String,
    served_model: String,
    prompt_tokens: u32,
    upstream: reqwest::Response,
) -> Result<Response, ApiError> {
    let status = upstream.status();
    if !status.is_success() {
        // The upstream refused the stream; its error body is not SSE, so
        // forward it as-is instead of scanning it.
        let headers = sanitize_headers(upstream.headers());
        let body = upstream.bytes().await.unwrap_or_default();
        debug!(
            request_id = %request_id,
            status = status.as_u16(),
            "Upstream refused stream, forwarding its response"
        );
        let mut response = Response::new(Body::from(body));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        return Ok(response);
    }

    let (sink, rx) = ChannelSink::bounded(ChannelSink::DEFAULT_CAPACITY);
    let relay = StreamRelay::new(mode, redirection);
    let ledger = state.ledger.clone();
    let counter = state.token_counter.clone();

    tokio::spawn(async move {
        let mut sink = sink;
        let outcome = relay.run(upstream.bytes_stream(), &mut sink).await;

        if let Some(e) = &outcome.error {
            error!(request_id = %request_id, code = e.code(), error = %e, "Stream relay ended abnormally");
        }
        debug!(
            request_id = %request_id,
            forwarded = outcome.forwarded,
            dropped = outcome.dropped,
            passed_through_raw = outcome.passed_through_raw,
            "Stream relay finished"
        );

        // Billing happens even for partially delivered streams.
        let usage = match outcome.usage {
            Some(usage) if !usage.is_untrustworthy() => usage,
            _ => Usage::new(prompt_tokens, counter.count(&outcome.text, &served_model)),
        };
        ledger.record(
            UsageEvent::new(
                request_id,
                requested_model,
                usage.prompt_tokens,
                usage.completion_tokens,
            )
            .with_streamed(true),
        );
    });

    let stream = async_stream::stream! {
        let mut rx = rx;
        while let Some(bytes) = rx.recv().await {
            yield Ok::<Bytes, Infallible>(bytes);
        }
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(Body::from_stream(stream))
        .map_err(|e| ApiError::internal(format!("Failed to build streaming response: {e}")))
}

async fn handle_buffered(
    state: AppState,
    request_id: String,
    redirection: RedirectionContext,
    requested_model: String,
    served_model: String,
    prompt_tokens: u32,
    upstream: reqwest::Response,
) -> Result<Response, ApiError> {
    let status = upstream.status();
    let headers = upstream.headers().clone();

    let relay = BodyRelay::new(redirection, prompt_tokens, served_model);
    let outcome = relay
        .run(status, &headers, upstream.bytes(), state.token_counter.as_ref())
        .await
        .map_err(|e| {
            error!(request_id = %request_id, code = e.code(), error = %e, "Body relay failed");
            ApiError::from(e)
        })?;

    match outcome {
        BodyOutcome::UpstreamError { error, status } => {
            info!(
                request_id = %request_id,
                status = status.as_u16(),
                kind = %error.kind,
                "Upstream returned an error body"
            );
            Ok(upstream_error_response(&error, status))
        }
        BodyOutcome::Relayed(relayed) => {
            let usage = relayed.usage;
            debug!(
                request_id = %request_id,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Relayed complete response"
            );
            state.ledger.record(UsageEvent::new(
                request_id,
                requested_model,
                usage.prompt_tokens,
                usage.completion_tokens,
            ));

            let mut response = Response::new(Body::from(relayed.body));
            *response.status_mut() = relayed.status;
            *response.headers_mut() = relayed.headers;
            Ok(response)
        }
    }
}

/// Minimal view of the inbound payload; everything else stays opaque.
#[derive(Debug)]
struct RequestView {
    model: String,
    stream: bool,
}

impl RequestView {
    fn parse(payload: &Value) -> Result<Self, ApiError> {
        let model = payload
            .get("model")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::bad_request("Missing required field: model"))?;
        if model.is_empty() {
            return Err(ApiError::bad_request("Field model must not be empty"));
        }
        let stream = payload
            .get("stream")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        Ok(Self {
            model: model.to_string(),
            stream,
        })
    }
}

/// Apply the configured model redirect to the outbound payload.
///
/// An empty requested model never redirects, and a request for a model with
/// no mapping passes through untouched.
fn resolve_redirect(state: &AppState, payload: &mut Value, requested: &str) -> RedirectionContext {
    if requested.is_empty() {
        return RedirectionContext::none();
    }
    let Some(target) = state.config.model_redirects.get(requested) else {
        return RedirectionContext::none();
    };
    payload["model"] = Value::String(target.clone());
    info!(original = %requested, target = %target, "Model redirected");
    RedirectionContext::redirected(requested, target)
}

/// Count prompt-side tokens from the inbound payload.
///
/// The gateway, not the upstream, is authoritative for prompt size when
/// usage has to be synthesized later.
fn estimate_prompt_tokens(
    counter: &dyn TokenCounter,
    payload: &Value,
    mode: RelayMode,
    model: &str,
) -> u32 {
    match mode {
        RelayMode::Chat => payload
            .get("messages")
            .and_then(Value::as_array)
            .map_or(0, |messages| {
                messages
                    .iter()
                    .filter_map(|message| message.get("content").and_then(Value::as_str))
                    .map(|content| counter.count(content, model))
                    .sum()
            }),
        RelayMode::Completion => match payload.get("prompt") {
            Some(Value::String(prompt)) => counter.count(prompt, model),
            Some(Value::Array(parts)) => parts
                .iter()
                .filter_map(Value::as_str)
                .map(|part| counter.count(part, model))
                .sum(),
            _ => 0,
        },
    }
}
