//! Offline index builder: load sources, chunk, embed, persist.
//!
//! Runs to completion and exits; the serving process only ever restores
//! the index this binary wrote.

use std::sync::Arc;

use everstorm_backend::core::config::{AppPaths, Settings};
use everstorm_backend::embedding::OllamaEmbedder;
use everstorm_backend::ingest::DocumentLoader;
use everstorm_backend::logging;
use everstorm_backend::rag::{Chunker, VectorIndex};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    logging::init(&paths);

    let settings = Settings::load(&paths)?;

    let loader = DocumentLoader::new(settings.data_dir(&paths), &settings.ingest);
    let documents = loader.load().await?;
    tracing::info!("Loaded {} document(s)", documents.len());

    let chunker = Chunker::from_settings(&settings.chunking);
    let segments = chunker.chunk(&documents);
    tracing::info!("{} segment(s) ready for embedding", segments.len());

    let embedder = OllamaEmbedder::from_settings(&settings.models);
    let index = VectorIndex::build(segments, &embedder).await?;
    tracing::info!(
        "Built index with {} embedding(s) (dimension {})",
        index.len(),
        index.dimension()
    );

    let index_path = settings.index_path(&paths);
    index.persist(&index_path).await?;
    tracing::info!("Index persisted to {}", index_path.display());

    Ok(())
}
