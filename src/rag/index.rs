//! Brute-force cosine vector index with durable sqlite persistence.
//!
//! Entries live in memory in insertion order; queries are read-only so
//! the index can be shared behind an `Arc` across concurrent sessions.
//! The persisted form records the embedding model and dimensionality and
//! both are validated on restore, so an index can never silently be
//! queried with a different embedder than it was built with.

use std::path::{Path, PathBuf};

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use crate::core::errors::IndexError;
use crate::embedding::Embedder;
use crate::ingest::SourceRef;

use super::chunker::Segment;

const FORMAT_VERSION: &str = "1";

/// One indexed segment with its embedding.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub segment: Segment,
    pub vector: Vec<f32>,
}

/// A query hit. Higher score is more similar.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub segment: Segment,
    pub score: f32,
}

#[derive(Debug)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    embedder_id: String,
    dimension: usize,
}

impl VectorIndex {
    /// Embed every segment and build the index. No entry is queryable
    /// until all segments have been embedded.
    pub async fn build(
        segments: Vec<Segment>,
        embedder: &dyn Embedder,
    ) -> Result<Self, IndexError> {
        let texts: Vec<String> = segments.iter().map(|s| s.text.clone()).collect();
        let vectors = if texts.is_empty() {
            Vec::new()
        } else {
            embedder.embed_many(&texts).await?
        };

        let dimension = vectors.first().map(Vec::len).unwrap_or(0);
        for vector in &vectors {
            if vector.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
        }

        let entries = segments
            .into_iter()
            .zip(vectors)
            .map(|(segment, vector)| IndexEntry { segment, vector })
            .collect();

        Ok(Self {
            entries,
            embedder_id: embedder.model_id().to_string(),
            dimension,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn embedder_id(&self) -> &str {
        &self.embedder_id
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Top-k most similar entries, best first. Equal scores keep
    /// insertion order (the sort is stable). An empty index yields an
    /// empty result, not an error.
    pub async fn query(
        &self,
        text: &str,
        k: usize,
        embedder: &dyn Embedder,
    ) -> Result<Vec<SearchResult>, IndexError> {
        if embedder.model_id() != self.embedder_id {
            return Err(IndexError::ModelMismatch {
                stored: self.embedder_id.clone(),
                configured: embedder.model_id().to_string(),
            });
        }

        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = embedder.embed(text).await?;
        if query_vector.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query_vector.len(),
            });
        }

        let mut scored: Vec<SearchResult> = self
            .entries
            .iter()
            .map(|entry| SearchResult {
                segment: entry.segment.clone(),
                score: cosine_similarity(&query_vector, &entry.vector),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);

        Ok(scored)
    }

    /// Write the index to a sqlite file at `path`, atomically replacing
    /// any previous index there.
    pub async fn persist(&self, path: &Path) -> Result<(), IndexError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| IndexError::Corrupt {
                path: path.to_path_buf(),
                message: format!("cannot create index directory: {e}"),
            })?;
        }

        let tmp_path = temp_sibling(path);
        let _ = std::fs::remove_file(&tmp_path);

        let pool = open_pool(&tmp_path, true).await?;
        self.write_all(&pool).await?;
        pool.close().await;

        std::fs::rename(&tmp_path, path).map_err(|e| IndexError::Corrupt {
            path: path.to_path_buf(),
            message: format!("cannot move index into place: {e}"),
        })?;

        Ok(())
    }

    async fn write_all(&self, pool: &SqlitePool) -> Result<(), IndexError> {
        sqlx::query(
            "CREATE TABLE index_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE TABLE segments (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                text TEXT NOT NULL,
                origin TEXT NOT NULL,
                page INTEGER,
                chunk_index INTEGER NOT NULL,
                start_offset INTEGER NOT NULL,
                embedding BLOB NOT NULL
            )",
        )
        .execute(pool)
        .await?;

        let mut tx = pool.begin().await?;

        for (key, value) in [
            ("format_version", FORMAT_VERSION.to_string()),
            ("embedding_model", self.embedder_id.clone()),
            ("dimension", self.dimension.to_string()),
        ] {
            sqlx::query("INSERT INTO index_meta (key, value) VALUES (?1, ?2)")
                .bind(key)
                .bind(value)
                .execute(&mut *tx)
                .await?;
        }

        for entry in &self.entries {
            sqlx::query(
                "INSERT INTO segments (text, origin, page, chunk_index, start_offset, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(&entry.segment.text)
            .bind(&entry.segment.source.origin)
            .bind(entry.segment.source.page.map(|p| p as i64))
            .bind(entry.segment.chunk_index as i64)
            .bind(entry.segment.start_offset as i64)
            .bind(serialize_embedding(&entry.vector))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Load a persisted index, validating that it matches the configured
    /// embedder before any query can run against it.
    pub async fn restore(path: &Path, embedder: &dyn Embedder) -> Result<Self, IndexError> {
        if !path.is_file() {
            return Err(IndexError::Corrupt {
                path: path.to_path_buf(),
                message: "index file does not exist".to_string(),
            });
        }

        let corrupt = |message: String| IndexError::Corrupt {
            path: path.to_path_buf(),
            message,
        };

        let pool = open_pool(path, false)
            .await
            .map_err(|e| corrupt(e.to_string()))?;

        let result = Self::read_all(&pool, path, embedder).await;
        pool.close().await;
        result
    }

    async fn read_all(
        pool: &SqlitePool,
        path: &Path,
        embedder: &dyn Embedder,
    ) -> Result<Self, IndexError> {
        let corrupt = |message: String| IndexError::Corrupt {
            path: path.to_path_buf(),
            message,
        };

        let meta_rows = sqlx::query("SELECT key, value FROM index_meta")
            .fetch_all(pool)
            .await
            .map_err(|e| corrupt(format!("cannot read index metadata: {e}")))?;

        let mut format_version = None;
        let mut embedding_model = None;
        let mut dimension = None;
        for row in &meta_rows {
            let key: String = row.get("key");
            let value: String = row.get("value");
            match key.as_str() {
                "format_version" => format_version = Some(value),
                "embedding_model" => embedding_model = Some(value),
                "dimension" => dimension = value.parse::<usize>().ok(),
                _ => {}
            }
        }

        match format_version.as_deref() {
            Some(FORMAT_VERSION) => {}
            other => {
                return Err(corrupt(format!(
                    "unsupported index format version {other:?}"
                )))
            }
        }

        let stored_model =
            embedding_model.ok_or_else(|| corrupt("missing embedding model".to_string()))?;
        if stored_model != embedder.model_id() {
            return Err(IndexError::ModelMismatch {
                stored: stored_model,
                configured: embedder.model_id().to_string(),
            });
        }

        let dimension = dimension.ok_or_else(|| corrupt("missing dimension".to_string()))?;

        let rows = sqlx::query(
            "SELECT text, origin, page, chunk_index, start_offset, embedding
             FROM segments
             ORDER BY seq ASC",
        )
        .fetch_all(pool)
        .await
        .map_err(|e| corrupt(format!("cannot read index entries: {e}")))?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let blob: Vec<u8> = row.get("embedding");
            if blob.len() % 4 != 0 {
                return Err(corrupt("malformed embedding blob".to_string()));
            }
            let vector = deserialize_embedding(&blob);
            if vector.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }

            let page: Option<i64> = row.get("page");
            entries.push(IndexEntry {
                segment: Segment {
                    text: row.get("text"),
                    source: SourceRef {
                        origin: row.get("origin"),
                        page: page.map(|p| p as u32),
                    },
                    chunk_index: row.get::<i64, _>("chunk_index") as usize,
                    start_offset: row.get::<i64, _>("start_offset") as usize,
                },
                vector,
            });
        }

        Ok(Self {
            entries,
            embedder_id: stored_model,
            dimension,
        })
    }
}

async fn open_pool(path: &Path, create: bool) -> Result<SqlitePool, IndexError> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(create)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal);

    let pool = SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(1)
        .connect_with(options)
        .await?;

    Ok(pool)
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}
