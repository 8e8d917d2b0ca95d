//! Deterministic in-process doubles for the embedding and generation
//! backends, used by unit and integration tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::errors::{EmbeddingError, GenerationError};
use crate::embedding::Embedder;
use crate::llm::{ChatRequest, LlmProvider};

/// An embedder with canned vectors for known texts and a deterministic
/// byte-derived vector for everything else.
pub struct FakeEmbedder {
    model: String,
    known: HashMap<String, Vec<f32>>,
    dimension: usize,
}

impl FakeEmbedder {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            known: HashMap::new(),
            dimension: 3,
        }
    }

    pub fn with(mut self, text: &str, vector: impl Into<Vec<f32>>) -> Self {
        let vector = vector.into();
        self.dimension = vector.len();
        self.known.insert(text.to_string(), vector);
        self
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        if let Some(vector) = self.known.get(text) {
            return vector.clone();
        }

        // Unknown text gets a stable vector derived from its bytes, so
        // repeated embeddings of the same input always match.
        let mut vector = vec![1.0_f32; self.dimension];
        for (i, byte) in text.bytes().enumerate() {
            vector[i % self.dimension] += f32::from(byte) / 255.0;
        }
        vector
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }
        Ok(self.vector_for(text))
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(EmbeddingError::EmptyInput);
        }
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }
}

/// A chat backend that returns a fixed reply and records every request
/// it receives, so tests can assert on the exact prompt the chain built.
pub struct FakeLlm {
    reply: String,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl FakeLlm {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// The prompts (final user message contents) seen so far.
    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter_map(|req| req.messages.last().map(|m| m.content.clone()))
            .collect()
    }
}

#[async_trait]
impl LlmProvider for FakeLlm {
    fn name(&self) -> &str {
        "fake-llm"
    }

    async fn health_check(&self) -> bool {
        true
    }

    async fn chat(&self, request: ChatRequest, _model_id: &str) -> Result<String, GenerationError> {
        self.requests.lock().unwrap().push(request);
        Ok(self.reply.clone())
    }
}

/// A chat backend that always fails, for error-path tests.
pub struct FailingLlm;

#[async_trait]
impl LlmProvider for FailingLlm {
    fn name(&self) -> &str {
        "failing-llm"
    }

    async fn health_check(&self) -> bool {
        false
    }

    async fn chat(
        &self,
        _request: ChatRequest,
        _model_id: &str,
    ) -> Result<String, GenerationError> {
        Err(GenerationError::Unavailable(
            "backend is down for this test".to_string(),
        ))
    }
}
