//! Insight handlers

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::AppState;
use voltspace_core::insights::{evaluate, evaluate_augmented};
use voltspace_core::{DeviceSnapshot, InsightsResponse};

/// POST /insights - Rule-based insights for a device snapshot
pub async fn rule_insights(
    State(state): State<Arc<AppState>>,
    Json(devices): Json<Vec<DeviceSnapshot>>,
) -> Json<InsightsResponse> {
    let now = (state.clock)();
    Json(InsightsResponse {
        insights: evaluate(&devices, &now),
    })
}

/// POST /insights_ai - Model-written insights, falling back to the rules
pub async fn ai_insights(
    State(state): State<Arc<AppState>>,
    Json(devices): Json<Vec<DeviceSnapshot>>,
) -> Json<InsightsResponse> {
    let now = (state.clock)();
    let insights = evaluate_augmented(&devices, &now, state.insights_ai.as_ref()).await;
    Json(InsightsResponse { insights })
}
