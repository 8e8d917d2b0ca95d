use std::sync::Arc;

use anyhow::Context;

use crate::core::config::{AppPaths, Settings};
use crate::embedding::{Embedder, OllamaEmbedder};
use crate::history::HistoryStore;
use crate::llm::{LlmProvider, OllamaProvider};
use crate::rag::{ConversationalChain, Retriever, VectorIndex};

/// Application state shared across all routes.
///
/// Everything here is either immutable after startup (settings, the
/// restored index inside the chain) or internally synchronized (the
/// history store), so concurrent requests never contend on locks.
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub settings: Settings,
    pub history: HistoryStore,
    pub chain: ConversationalChain,
    pub llm: Arc<dyn LlmProvider>,
}

impl AppState {
    /// Build the serving state: load settings, open the history store,
    /// restore the persisted index, and wire retriever + chain.
    ///
    /// The index is restored, never rebuilt, here. Rebuilding is the
    /// ingest binary's job and must not overlap with serving.
    pub async fn initialize(paths: Arc<AppPaths>) -> anyhow::Result<Arc<Self>> {
        let settings = Settings::load(&paths)?;

        let history_db = settings.data_dir(&paths).join("history.db");
        let history = HistoryStore::new(history_db)
            .await
            .context("failed to open history store")?;

        let embedder: Arc<dyn Embedder> = Arc::new(OllamaEmbedder::from_settings(&settings.models));

        let index_path = settings.index_path(&paths);
        let index = VectorIndex::restore(&index_path, embedder.as_ref())
            .await
            .with_context(|| {
                format!(
                    "failed to restore vector index from {}; run `everstorm-ingest` to build it",
                    index_path.display()
                )
            })?;
        tracing::info!(
            "Restored index with {} entries (model {})",
            index.len(),
            index.embedder_id()
        );

        let retriever = Retriever::new(Arc::new(index), embedder, settings.retrieval.top_k);

        let llm: Arc<dyn LlmProvider> = Arc::new(OllamaProvider::new(
            settings.models.ollama_base_url.clone(),
            settings.models.generation_timeout_secs,
        ));
        let chain = ConversationalChain::new(retriever, llm.clone(), &settings.models);

        Ok(Arc::new(AppState {
            paths,
            settings,
            history,
            chain,
            llm,
        }))
    }
}
