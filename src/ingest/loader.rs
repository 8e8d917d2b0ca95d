//! Aggregating loader: PDFs are required, web pages are best-effort.

use std::path::PathBuf;

use crate::core::config::settings::IngestSettings;
use crate::core::errors::LoadError;

use super::document::Document;
use super::pdf;
use super::web::WebLoader;

pub struct DocumentLoader {
    data_dir: PathBuf,
    pdf_prefix: String,
    urls: Vec<String>,
    web_timeout_secs: u64,
}

impl DocumentLoader {
    pub fn new(data_dir: PathBuf, settings: &IngestSettings) -> Self {
        Self {
            data_dir,
            pdf_prefix: settings.pdf_prefix.clone(),
            urls: settings.urls.clone(),
            web_timeout_secs: settings.web_timeout_secs,
        }
    }

    /// Load all configured sources.
    ///
    /// Any web failure (network, timeout, empty page) downgrades to a
    /// warning and the PDF-only set is returned. An empty result from
    /// every source is `LoadError::NoDocuments`.
    pub async fn load(&self) -> Result<Vec<Document>, LoadError> {
        let mut documents = pdf::load_pdfs(&self.data_dir, &self.pdf_prefix).await?;
        tracing::info!(
            "Loaded {} PDF document(s) from {}",
            documents.len(),
            self.data_dir.display()
        );

        if !self.urls.is_empty() {
            match self.load_web().await {
                Ok(web_docs) => {
                    tracing::info!("Fetched {} web document(s)", web_docs.len());
                    documents.extend(web_docs);
                }
                Err(err) => {
                    tracing::warn!("Web fetch failed, continuing with PDFs only: {err}");
                }
            }
        }

        if documents.is_empty() {
            return Err(LoadError::NoDocuments);
        }

        Ok(documents)
    }

    async fn load_web(&self) -> Result<Vec<Document>, LoadError> {
        let loader = WebLoader::new(self.web_timeout_secs);
        loader.fetch_all(&self.urls).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::settings::IngestSettings;

    fn loader_for(dir: PathBuf, urls: Vec<String>) -> DocumentLoader {
        let settings = IngestSettings {
            data_dir: dir.clone(),
            pdf_prefix: "Everstorm_".to_string(),
            urls,
            web_timeout_secs: 1,
        };
        DocumentLoader::new(dir, &settings)
    }

    #[tokio::test]
    async fn empty_sources_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let loader = loader_for(dir.path().to_path_buf(), Vec::new());
        let err = loader.load().await.unwrap_err();
        assert!(matches!(err, LoadError::NoDocuments));
    }

    #[tokio::test]
    async fn unreachable_web_source_is_non_fatal_with_pdfs_absent() {
        // Web failure falls back to the PDF set; with no PDFs either,
        // the overall load still reports NoDocuments rather than a web
        // error.
        let dir = tempfile::tempdir().unwrap();
        let loader = loader_for(
            dir.path().to_path_buf(),
            vec!["http://127.0.0.1:9/unroutable".to_string()],
        );
        let err = loader.load().await.unwrap_err();
        assert!(matches!(err, LoadError::NoDocuments));
    }
}
