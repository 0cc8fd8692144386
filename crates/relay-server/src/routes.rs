//! Route configuration.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health probes
        .route("/health", get(handlers::health_check))
        .route("/healthz", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        // OpenAI-compatible API
        .nest("/v1", completion_routes())
        // Admin surface
        .nest("/admin", admin_routes())
        // Middleware, outermost first at runtime
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(axum::middleware::from_fn(middleware::logging_middleware))
        .layer(middleware::cors_layer())
        .with_state(state)
}

fn completion_routes() -> Router<AppState> {
    Router::new()
        .route("/chat/completions", post(handlers::chat_completions))
        .route("/completions", post(handlers::completions))
}

fn admin_routes() -> Router<AppState> {
    Router::new().route("/stats", get(handlers::relay_stats))
}
