//! Typed application settings.
//!
//! Loaded from `config.yml`; every section has working defaults so a
//! missing or partial file still produces a runnable configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::paths::AppPaths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ingest: IngestSettings,
    pub chunking: ChunkingSettings,
    pub retrieval: RetrievalSettings,
    pub models: ModelSettings,
    pub index: IndexSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// Directory scanned for policy PDFs.
    pub data_dir: PathBuf,
    /// Only files named `<pdf_prefix>*.pdf` are loaded.
    pub pdf_prefix: String,
    /// Web pages loaded alongside the PDFs. Loss of these is non-fatal.
    pub urls: Vec<String>,
    pub web_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Maximum characters per segment.
    pub chunk_size: usize,
    /// Characters repeated between consecutive segments of one document.
    pub chunk_overlap: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Number of segments handed to the chain per question.
    pub top_k: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub ollama_base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub temperature: f64,
    pub embed_batch_size: usize,
    pub generation_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Where the persisted index lives. Relative paths resolve against
    /// the project root.
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub cors_allowed_origins: Vec<String>,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            pdf_prefix: "Everstorm_".to_string(),
            urls: vec![
                "https://developer.bigcommerce.com/docs/store-operations/shipping".to_string(),
                "https://developer.bigcommerce.com/docs/store-operations/orders/refunds"
                    .to_string(),
            ],
            web_timeout_secs: 30,
        }
    }
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 300,
            chunk_overlap: 30,
        }
    }
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 8 }
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            ollama_base_url: "http://localhost:11434".to_string(),
            chat_model: "gemma3:1b".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            temperature: 0.1,
            embed_batch_size: 32,
            generation_timeout_secs: 120,
        }
    }
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/policy_index.db"),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            cors_allowed_origins: vec![
                "http://localhost".to_string(),
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
                "http://127.0.0.1".to_string(),
                "http://127.0.0.1:3000".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
        }
    }
}

impl Settings {
    /// Load settings from the discovered config file, falling back to
    /// defaults when it is absent.
    pub fn load(paths: &AppPaths) -> anyhow::Result<Self> {
        Self::load_from(&paths.config_path)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}; using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let settings: Settings = serde_yaml::from_str(&contents)?;
        Ok(settings)
    }

    /// Absolute index path, resolved against the project root.
    pub fn index_path(&self, paths: &AppPaths) -> PathBuf {
        if self.index.path.is_absolute() {
            self.index.path.clone()
        } else {
            paths.project_root.join(&self.index.path)
        }
    }

    /// Absolute data directory, resolved against the project root.
    pub fn data_dir(&self, paths: &AppPaths) -> PathBuf {
        if self.ingest.data_dir.is_absolute() {
            self.ingest.data_dir.clone()
        } else {
            paths.project_root.join(&self.ingest.data_dir)
        }
    }
}
