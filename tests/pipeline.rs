//! End-to-end pipeline test with in-process backends: documents →
//! chunker → index → persist → restore → retriever → chain.

use std::sync::Arc;

use everstorm_backend::core::config::settings::ModelSettings;
use everstorm_backend::history::{HistoryStore, Turn};
use everstorm_backend::ingest::{Document, SourceRef};
use everstorm_backend::rag::{Chunker, ConversationalChain, Retriever, VectorIndex};
use everstorm_backend::testing::{FakeEmbedder, FakeLlm};

const RETURNS_TEXT: &str = "Returns are accepted within 30 days of delivery. \
Refunds are issued to the original payment method within 5 business days.";
const SHIPPING_TEXT: &str = "Standard shipping takes 5 business days. \
Expedited shipping arrives in 2 business days.";

fn policy_documents() -> Vec<Document> {
    vec![
        Document::new(
            RETURNS_TEXT,
            SourceRef::file("data/Everstorm_Returns.pdf", Some(1)),
        ),
        Document::new(SHIPPING_TEXT, SourceRef::url("https://example.com/shipping")),
    ]
}

fn embedder() -> FakeEmbedder {
    // The chunk size used below keeps each fixture document in a single
    // segment, so these canned vectors cover the whole corpus.
    FakeEmbedder::new("fake-embed")
        .with(RETURNS_TEXT, [1.0, 0.0, 0.0])
        .with(SHIPPING_TEXT, [0.0, 0.0, 1.0])
        .with("what is the refund policy?", [1.0, 0.1, 0.0])
        .with("how long does shipping take?", [0.0, 0.1, 1.0])
}

#[tokio::test]
async fn full_pipeline_answers_from_persisted_index() {
    let documents = policy_documents();
    let segments = Chunker::new(400, 40).chunk(&documents);
    assert_eq!(segments.len(), 2);

    let embedder = Arc::new(embedder());
    let index = VectorIndex::build(segments, embedder.as_ref())
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let index_path = dir.path().join("policy_index.db");
    index.persist(&index_path).await.unwrap();

    let restored = VectorIndex::restore(&index_path, embedder.as_ref())
        .await
        .unwrap();
    assert_eq!(restored.len(), 2);

    let retriever = Retriever::new(Arc::new(restored), embedder.clone(), 1);
    let llm = Arc::new(FakeLlm::new(
        "Returns are accepted within 30 days of delivery.",
    ));
    let chain = ConversationalChain::new(retriever, llm.clone(), &ModelSettings::default());

    let response = chain.ask("what is the refund policy?", &[]).await.unwrap();
    assert!(response.answer.contains("30 days"));
    assert_eq!(
        response.sources,
        vec!["data/Everstorm_Returns.pdf (page 1)".to_string()]
    );

    // The prompt the model saw quotes the returns document, not the
    // shipping one (top_k is 1).
    let prompts = llm.prompts();
    assert!(prompts[0].contains("Returns are accepted within 30 days"));
    assert!(!prompts[0].contains("Standard shipping"));
}

#[tokio::test]
async fn restored_index_retrieves_identically_to_the_original() {
    let documents = policy_documents();
    let segments = Chunker::new(400, 40).chunk(&documents);

    let embedder = Arc::new(embedder());
    let index = VectorIndex::build(segments, embedder.as_ref())
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let index_path = dir.path().join("policy_index.db");
    index.persist(&index_path).await.unwrap();
    let restored = VectorIndex::restore(&index_path, embedder.as_ref())
        .await
        .unwrap();

    for question in ["what is the refund policy?", "how long does shipping take?"] {
        let before = index.query(question, 8, embedder.as_ref()).await.unwrap();
        let after = restored.query(question, 8, embedder.as_ref()).await.unwrap();

        let texts = |results: &[everstorm_backend::rag::index::SearchResult]| {
            results
                .iter()
                .map(|r| r.segment.text.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(texts(&before), texts(&after));
    }
}

#[tokio::test]
async fn conversation_round_trip_with_history_store() {
    let documents = policy_documents();
    let segments = Chunker::new(400, 40).chunk(&documents);

    let embedder = Arc::new(embedder());
    let index = Arc::new(
        VectorIndex::build(segments, embedder.as_ref())
            .await
            .unwrap(),
    );
    let retriever = Retriever::new(index, embedder, 8);
    let llm = Arc::new(FakeLlm::new("Standard shipping takes 5 business days."));
    let chain = ConversationalChain::new(retriever, llm.clone(), &ModelSettings::default());

    let dir = tempfile::tempdir().unwrap();
    let history = HistoryStore::new(dir.path().join("history.db"))
        .await
        .unwrap();

    // First turn: empty history.
    let turns = history.get_history("default", 40).await.unwrap();
    let first = chain
        .ask("how long does shipping take?", &turns)
        .await
        .unwrap();
    history
        .append_turn("default", "how long does shipping take?", &first.answer)
        .await
        .unwrap();

    // Second turn: the prior exchange rides along as chat messages.
    let turns = history.get_history("default", 40).await.unwrap();
    assert_eq!(turns.len(), 1);
    chain
        .ask("what is the refund policy?", &turns)
        .await
        .unwrap();

    let requests = llm.requests.lock().unwrap();
    assert_eq!(requests[0].messages.len(), 1);
    assert_eq!(requests[1].messages.len(), 3);
    assert_eq!(requests[1].messages[0].content, "how long does shipping take?");
    assert_eq!(
        requests[1].messages[1].content,
        "Standard shipping takes 5 business days."
    );

    // Clearing history puts the session back to the fresh state.
    history.clear_session("default").await.unwrap();
    let turns: Vec<Turn> = history.get_history("default", 40).await.unwrap();
    assert!(turns.is_empty());
}
