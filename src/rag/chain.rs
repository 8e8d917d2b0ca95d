//! The conversational chain: retrieve, assemble the prompt, generate.
//!
//! The chain holds no per-session state. History is passed in by the
//! caller on every call, so one chain instance is safely shared across
//! concurrent sessions; the caller appends the new turn afterwards.

use std::sync::Arc;

use crate::core::config::settings::ModelSettings;
use crate::core::errors::ApiError;
use crate::history::Turn;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};

use super::prompt::render_prompt;
use super::retriever::Retriever;

#[derive(Debug, Clone)]
pub struct ChainResponse {
    pub answer: String,
    /// Distinct origins of the retrieved segments, in retrieval order.
    pub sources: Vec<String>,
}

pub struct ConversationalChain {
    retriever: Retriever,
    llm: Arc<dyn LlmProvider>,
    chat_model: String,
    temperature: f64,
}

impl ConversationalChain {
    pub fn new(retriever: Retriever, llm: Arc<dyn LlmProvider>, settings: &ModelSettings) -> Self {
        Self {
            retriever,
            llm,
            chat_model: settings.chat_model.clone(),
            temperature: settings.temperature,
        }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Answer one question against the indexed corpus.
    ///
    /// Retrieval uses the current question only; prior turns are passed
    /// to the model as conversation messages, not folded into the
    /// retrieval query. Generation failures propagate; no fabricated
    /// answer is returned in their place.
    pub async fn ask(&self, question: &str, history: &[Turn]) -> Result<ChainResponse, ApiError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ApiError::BadRequest("question must not be empty".to_string()));
        }

        let segments = self.retriever.retrieve(question).await?;
        tracing::debug!("Retrieved {} segment(s) for question", segments.len());

        let prompt = render_prompt(&segments, question);

        let mut messages = Vec::with_capacity(history.len() * 2 + 1);
        for turn in history {
            messages.push(ChatMessage::user(&turn.question));
            messages.push(ChatMessage::assistant(&turn.answer));
        }
        messages.push(ChatMessage::user(prompt));

        let request = ChatRequest::new(messages).with_temperature(self.temperature);
        let answer = self.llm.chat(request, &self.chat_model).await?;

        let mut sources: Vec<String> = Vec::new();
        for segment in &segments {
            let label = segment.source.label();
            if !sources.contains(&label) {
                sources.push(label);
            }
        }

        Ok(ChainResponse { answer, sources })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ingest::SourceRef;
    use crate::rag::chunker::Segment;
    use crate::rag::index::VectorIndex;
    use crate::testing::{FailingLlm, FakeEmbedder, FakeLlm};

    fn segment(text: &str, origin: &str, chunk_index: usize) -> Segment {
        Segment {
            text: text.to_string(),
            source: SourceRef::file(origin, None),
            chunk_index,
            start_offset: 0,
        }
    }

    fn corpus_embedder() -> FakeEmbedder {
        FakeEmbedder::new("fake-embed")
            .with("Returns are accepted within 30 days.", [1.0, 0.0, 0.0])
            .with("Standard shipping takes 5 business days.", [0.0, 1.0, 0.0])
            .with("refund policy", [0.95, 0.05, 0.0])
    }

    async fn chain_over(
        segments: Vec<Segment>,
        embedder: FakeEmbedder,
        llm: Arc<dyn LlmProvider>,
    ) -> ConversationalChain {
        let embedder = Arc::new(embedder);
        let index = Arc::new(VectorIndex::build(segments, embedder.as_ref()).await.unwrap());
        let retriever = Retriever::new(index, embedder, 8);
        ConversationalChain::new(retriever, llm, &ModelSettings::default())
    }

    fn corpus() -> Vec<Segment> {
        vec![
            segment("Returns are accepted within 30 days.", "returns.pdf", 0),
            segment("Standard shipping takes 5 business days.", "shipping.pdf", 1),
        ]
    }

    #[tokio::test]
    async fn prompt_contains_retrieved_context_and_question() {
        let llm = Arc::new(FakeLlm::new("You have 30 days to return items."));
        let chain = chain_over(corpus(), corpus_embedder(), llm.clone()).await;

        let response = chain.ask("refund policy", &[]).await.unwrap();
        assert_eq!(response.answer, "You have 30 days to return items.");
        assert_eq!(response.sources[0], "returns.pdf");

        let prompts = llm.prompts();
        assert!(prompts[0].contains("Returns are accepted within 30 days."));
        assert!(prompts[0].contains("refund policy"));
    }

    #[tokio::test]
    async fn retrieval_is_deterministic_for_identical_questions() {
        let llm = Arc::new(FakeLlm::new("answer"));
        let chain = chain_over(corpus(), corpus_embedder(), llm.clone()).await;

        chain.ask("refund policy", &[]).await.unwrap();
        chain.ask("refund policy", &[]).await.unwrap();

        let prompts = llm.prompts();
        assert_eq!(prompts[0], prompts[1]);
    }

    #[tokio::test]
    async fn empty_index_still_invokes_the_model() {
        let llm = Arc::new(FakeLlm::new("I don't know based on the retrieved documents."));
        let chain = chain_over(Vec::new(), corpus_embedder(), llm.clone()).await;

        let response = chain.ask("What is the boiling point of mercury?", &[]).await.unwrap();
        assert!(response.sources.is_empty());
        assert_eq!(
            response.answer,
            "I don't know based on the retrieved documents."
        );

        // The model was called with an empty CONTEXT section; the
        // template's fallback rule covers insufficient context.
        let prompts = llm.prompts();
        assert!(prompts[0].contains("CONTEXT:\n\n"));
    }

    #[tokio::test]
    async fn history_turns_become_chat_messages() {
        let llm = Arc::new(FakeLlm::new("answer"));
        let chain = chain_over(corpus(), corpus_embedder(), llm.clone()).await;

        let history = vec![Turn {
            question: "What about shipping?".to_string(),
            answer: "Five business days.".to_string(),
            created_at: String::new(),
        }];
        chain.ask("refund policy", &history).await.unwrap();

        let requests = llm.requests.lock().unwrap();
        let messages = &requests[0].messages;
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[0].content, "What about shipping?");
        assert_eq!(messages[1].role, "assistant");
        assert_eq!(messages[1].content, "Five business days.");
        assert_eq!(messages[2].role, "user");
    }

    #[tokio::test]
    async fn cleared_history_matches_fresh_session() {
        let llm = Arc::new(FakeLlm::new("answer"));
        let chain = chain_over(corpus(), corpus_embedder(), llm.clone()).await;

        let history = vec![Turn {
            question: "old question".to_string(),
            answer: "old answer".to_string(),
            created_at: String::new(),
        }];
        chain.ask("refund policy", &history).await.unwrap();
        // After an explicit clear the caller passes an empty history.
        chain.ask("refund policy", &[]).await.unwrap();

        let requests = llm.requests.lock().unwrap();
        assert_eq!(requests[1].messages.len(), 1);
        // The rendered prompt is identical to the one a fresh session
        // would produce for the same question.
        assert_eq!(
            requests[0].messages.last().unwrap().content,
            requests[1].messages.last().unwrap().content
        );
    }

    #[tokio::test]
    async fn blank_question_is_rejected() {
        let llm = Arc::new(FakeLlm::new("answer"));
        let chain = chain_over(corpus(), corpus_embedder(), llm).await;

        let err = chain.ask("   ", &[]).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn generation_failure_propagates() {
        let chain = chain_over(corpus(), corpus_embedder(), Arc::new(FailingLlm)).await;

        let err = chain.ask("refund policy", &[]).await.unwrap_err();
        assert!(matches!(err, ApiError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn sources_are_deduplicated_in_order() {
        let llm = Arc::new(FakeLlm::new("answer"));
        let segments = vec![
            segment("Returns are accepted within 30 days.", "returns.pdf", 0),
            segment("Standard shipping takes 5 business days.", "returns.pdf", 1),
        ];
        let embedder = FakeEmbedder::new("fake-embed")
            .with("Returns are accepted within 30 days.", [1.0, 0.0, 0.0])
            .with("Standard shipping takes 5 business days.", [0.9, 0.1, 0.0])
            .with("refund policy", [1.0, 0.0, 0.0]);
        let chain = chain_over(segments, embedder, llm).await;

        let response = chain.ask("refund policy", &[]).await.unwrap();
        assert_eq!(response.sources, vec!["returns.pdf".to_string()]);
    }
}
