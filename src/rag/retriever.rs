//! Thin adapter over the vector index. Kept separate so a different
//! retrieval strategy (hybrid lexical+vector, reranking) can be swapped
//! in without touching the index itself.

use std::sync::Arc;

use crate::core::errors::IndexError;
use crate::embedding::Embedder;

use super::chunker::Segment;
use super::index::VectorIndex;

pub struct Retriever {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl Retriever {
    pub fn new(index: Arc<VectorIndex>, embedder: Arc<dyn Embedder>, top_k: usize) -> Self {
        Self {
            index,
            embedder,
            top_k,
        }
    }

    /// Top-k segments for the query, best first, scores discarded.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<Segment>, IndexError> {
        let results = self
            .index
            .query(query, self.top_k, self.embedder.as_ref())
            .await?;
        Ok(results.into_iter().map(|r| r.segment).collect())
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }
}
