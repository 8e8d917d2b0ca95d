//! Text embedding. The index and retriever only see the [`Embedder`]
//! trait; the Ollama-backed implementation lives in [`ollama`].

pub mod ollama;

use async_trait::async_trait;

use crate::core::errors::EmbeddingError;

pub use ollama::OllamaEmbedder;

/// Maps text to fixed-dimension vectors. Implementations must be
/// deterministic for a fixed model configuration and must preserve input
/// order in `embed_many`.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier of the backing model. Stored with the index and
    /// validated on restore so build-time and query-time embeddings can
    /// never come from different models.
    fn model_id(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// One vector per input, same order. Inputs must all be non-empty.
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}
