//! System endpoints: health check and connection status.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::app_state::AppState;
use crate::domain::ConnectionSummary;

/// Health check response.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health` — Service health status.
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Connection status response.
#[derive(Debug, Serialize)]
struct StatusResponse {
    connections: usize,
    workers: Vec<ConnectionSummary>,
}

/// `GET /status` — Registered worker connections.
///
/// The registry never expires entries on its own, so this is the
/// operator's window into churn growth.
pub async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let workers = state.registry.list().await;
    (
        StatusCode::OK,
        Json(StatusResponse {
            connections: workers.len(),
            workers,
        }),
    )
}

/// System routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
}
