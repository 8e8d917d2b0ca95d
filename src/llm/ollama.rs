//! Ollama chat backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::errors::GenerationError;

use super::provider::LlmProvider;
use super::types::ChatRequest;

#[derive(Clone)]
pub struct OllamaProvider {
    base_url: String,
    client: Client,
}

impl OllamaProvider {
    pub fn new(base_url: String, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, GenerationError> {
        let url = format!("{}/api/chat", self.base_url);

        let mut options = json!({});
        if let Some(obj) = options.as_object_mut() {
            if let Some(t) = request.temperature {
                obj.insert("temperature".to_string(), json!(t));
            }
            if let Some(n) = request.max_tokens {
                obj.insert("num_predict".to_string(), json!(n));
            }
            if let Some(s) = &request.stop {
                obj.insert("stop".to_string(), json!(s));
            }
        }

        let body = json!({
            "model": model_id,
            "messages": request.messages,
            "stream": false,
            "options": options,
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout
                } else if e.is_connect() {
                    GenerationError::Unavailable(e.to_string())
                } else {
                    GenerationError::Backend(e.to_string())
                }
            })?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(GenerationError::Backend(format!(
                "ollama chat error ({status}): {text}"
            )));
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|e| GenerationError::Backend(e.to_string()))?;

        let content = payload["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        if content.is_empty() {
            return Err(GenerationError::Backend(
                "ollama returned an empty completion".to_string(),
            ));
        }

        Ok(content)
    }
}
