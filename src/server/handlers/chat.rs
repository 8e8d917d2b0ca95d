use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::history::DEFAULT_SESSION_ID;
use crate::state::AppState;

/// Turns of context handed to the model per question.
const HISTORY_LIMIT: i64 = 40;

#[derive(Debug, Deserialize)]
pub struct ChatApiRequest {
    pub session_id: Option<String>,
    pub question: String,
}

/// Answer one question. The turn is appended to the session history only
/// after generation succeeds, so a failed call leaves the conversation
/// unchanged.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatApiRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session_id = payload
        .session_id
        .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string());

    let history = state.history.get_history(&session_id, HISTORY_LIMIT).await?;

    let response = state.chain.ask(&payload.question, &history).await?;

    state
        .history
        .append_turn(&session_id, payload.question.trim(), &response.answer)
        .await?;

    Ok(Json(json!({
        "session_id": session_id,
        "answer": response.answer,
        "sources": response.sources,
    })))
}
