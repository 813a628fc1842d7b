// HTTP request handlers
use crate::application::pipeline::PipelineState;
use crate::domain::sample::HistoryRecord;
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Latest pipeline snapshot
pub async fn get_state(State(state): State<Arc<AppState>>) -> Json<PipelineState> {
    Json(state.pipeline.current())
}

/// Five most recent history records, newest first
pub async fn get_history(State(state): State<Arc<AppState>>) -> Json<Vec<HistoryRecord>> {
    Json(state.pipeline.current().history)
}

/// Dismiss a single alert by id
pub async fn dismiss_alert(Path(id): Path<u64>, State(state): State<Arc<AppState>>) -> StatusCode {
    if state.pipeline.dismiss_alert(id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}
