//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::Serialize;

use crate::ui::state::AppState;

/// Hub statistics
#[derive(Debug, Serialize)]
pub struct StatsDto {
    pub clients: usize,
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Number of clients currently registered with the hub
pub async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsDto> {
    Json(StatsDto {
        clients: state.hub.client_count(),
    })
}
