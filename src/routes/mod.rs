//! HTTP surface.
//!
//! - `POST /generate`: multipart image upload, answered per [`GenerationMode`]
//! - `POST /check-status`: one status query for a task id
//! - `GET /health`: liveness plus the active mode and provider
//!
//! [`GenerationMode`]: crate::config::GenerationMode

mod generate;
mod health;
mod status;

use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn cors_layer(allowed_origins: Option<&str>) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new().allow_headers(Any).allow_methods(Any);
    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(origins)
    }
}

/// Build the complete router.
pub fn build(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_bytes;
    let cors = cors_layer(state.config.cors_allowed_origins.as_deref());

    Router::new()
        .merge(generate::router())
        .merge(status::router())
        .merge(health::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
