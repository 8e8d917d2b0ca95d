//! Embeddings via the Ollama batch embedding endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::config::settings::ModelSettings;
use crate::core::errors::EmbeddingError;

use super::Embedder;

pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    batch_size: usize,
    client: Client,
}

impl OllamaEmbedder {
    pub fn new(base_url: String, model: String, batch_size: usize) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            batch_size: batch_size.max(1),
            client: Client::new(),
        }
    }

    pub fn from_settings(settings: &ModelSettings) -> Self {
        Self::new(
            settings.ollama_base_url.clone(),
            settings.embedding_model.clone(),
            settings.embed_batch_size,
        )
    }

    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let url = format!("{}/api/embed", self.base_url);
        let body = json!({
            "model": self.model,
            "input": inputs,
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmbeddingError::Backend(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(EmbeddingError::Backend(format!(
                "embedding request failed ({status}): {text}"
            )));
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|e| EmbeddingError::Backend(e.to_string()))?;

        let mut embeddings = Vec::with_capacity(inputs.len());
        if let Some(data) = payload["embeddings"].as_array() {
            for item in data {
                let vector: Vec<f32> = item
                    .as_array()
                    .map(|vals| {
                        vals.iter()
                            .filter_map(|v| v.as_f64().map(|f| f as f32))
                            .collect()
                    })
                    .unwrap_or_default();
                embeddings.push(vector);
            }
        }

        if embeddings.len() != inputs.len() || embeddings.iter().any(|v| v.is_empty()) {
            return Err(EmbeddingError::ShapeMismatch {
                expected: inputs.len(),
                actual: embeddings.iter().filter(|v| !v.is_empty()).count(),
            });
        }

        Ok(embeddings)
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        Ok(vectors.remove(0))
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(EmbeddingError::EmptyInput);
        }

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            embeddings.extend(self.embed_batch(batch).await?);
        }
        Ok(embeddings)
    }
}
