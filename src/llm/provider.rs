use async_trait::async_trait;

use crate::core::errors::GenerationError;

use super::types::ChatRequest;

/// A chat-completion backend. Generation can block for several seconds;
/// callers treat it as a long-running, timeout-able operation.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g. "ollama").
    fn name(&self) -> &str;

    /// Whether the backend is reachable.
    async fn health_check(&self) -> bool;

    /// Non-streaming chat completion.
    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, GenerationError>;
}
