//! Router assembly: HTTP endpoints, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - REST-ish API under `/api/v1/...`
/// - CORS (allow any origin/method/headers) – adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(http::http_health))
        // Progress
        .route(
            "/api/v1/students/:student_id/sequences/:sequence_id/progress",
            get(http::http_sequence_progress),
        )
        .route(
            "/api/v1/students/:student_id/stages/:stage_id/progress",
            get(http::http_get_progress),
        )
        .route(
            "/api/v1/students/:student_id/stages/:stage_id/complete",
            post(http::http_complete_stage),
        )
        // Attempts & hints
        .route(
            "/api/v1/students/:student_id/stages/:stage_id/attempts",
            post(http::http_record_attempt),
        )
        .route(
            "/api/v1/attempts/:attempt_id/hints/:hint_id/view",
            post(http::http_view_hint),
        )
        .route("/api/v1/stages/:stage_id/hints", get(http::http_stage_hints))
        // Analytics
        .route("/api/v1/stages/:stage_id/analytics", get(http::http_stage_analytics))
        .route("/api/v1/analytics/difficult-stages", get(http::http_difficult_stages))
        .route("/api/v1/analytics/dashboard", get(http::http_dashboard))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}
