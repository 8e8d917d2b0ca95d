use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn health(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let index = state.chain.retriever().index();
    let llm_reachable = state.llm.health_check().await;

    Ok(Json(json!({
        "initialized": true,
        "index_entries": index.len(),
        "embedding_model": index.embedder_id(),
        "chat_model": state.settings.models.chat_model,
        "llm_reachable": llm_reachable,
    })))
}
