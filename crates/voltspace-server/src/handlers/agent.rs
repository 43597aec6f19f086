//! Energy assistant handler

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::{AppError, AppState};

/// Request body for the assistant
#[derive(Debug, Deserialize)]
pub struct AgentQuery {
    #[serde(default)]
    pub question: String,
    /// Free-form dashboard context (string or JSON)
    #[serde(default)]
    pub context: Option<Value>,
    /// Accepted for compatibility; not used
    #[serde(default)]
    pub user_id: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct AgentAnswer {
    pub answer: String,
}

/// POST /agent - Answer an energy question
pub async fn ask_agent(
    State(state): State<Arc<AppState>>,
    Json(query): Json<AgentQuery>,
) -> Result<Json<AgentAnswer>, AppError> {
    let question = query.question.trim();
    if question.is_empty() {
        return Err(AppError::bad_request("Missing question"));
    }

    debug!(
        user_id = ?query.user_id,
        has_context = query.context.is_some(),
        "Assistant question"
    );
    let answer = state.assistant.answer(question, query.context.as_ref()).await;
    Ok(Json(AgentAnswer { answer }))
}
