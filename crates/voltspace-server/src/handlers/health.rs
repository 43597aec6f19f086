//! Health handler

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

/// Which collaborators are configured
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub text_generation: bool,
    pub mesh: bool,
}

/// GET /health - Report configured collaborators (no network calls)
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        text_generation: state.assistant.is_configured(),
        mesh: state.mesh.is_configured(),
    })
}
