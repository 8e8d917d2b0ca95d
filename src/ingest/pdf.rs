//! PDF loading. Text extraction runs on the blocking pool; each page
//! becomes its own [`Document`] so retrieval results can cite the page.

use std::path::{Path, PathBuf};

use crate::core::errors::LoadError;

use super::document::{Document, SourceRef};

/// Page break marker emitted by pdf-extract between pages.
const PAGE_BREAK: char = '\x0C';

/// Find `<prefix>*.pdf` files directly under `data_dir`, sorted by name
/// so repeated loads yield the same document order.
pub fn discover_pdfs(data_dir: &Path, prefix: &str) -> Result<Vec<PathBuf>, LoadError> {
    if !data_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(data_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            name.starts_with(prefix) && name.to_ascii_lowercase().ends_with(".pdf")
        })
        .collect();

    paths.sort();
    Ok(paths)
}

/// Load one PDF file into per-page documents.
pub async fn load_pdf(path: &Path) -> Result<Vec<Document>, LoadError> {
    let bytes = tokio::fs::read(path).await?;

    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| LoadError::Pdf {
            path: path.to_path_buf(),
            message: format!("extraction task failed: {e}"),
        })?
        .map_err(|e| LoadError::Pdf {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    Ok(split_pages(&text, path))
}

/// Load every matching PDF under `data_dir`.
pub async fn load_pdfs(data_dir: &Path, prefix: &str) -> Result<Vec<Document>, LoadError> {
    let paths = discover_pdfs(data_dir, prefix)?;
    let mut documents = Vec::new();

    for path in &paths {
        let pages = load_pdf(path).await?;
        tracing::info!("Loaded {} page(s) from {}", pages.len(), path.display());
        documents.extend(pages);
    }

    Ok(documents)
}

fn split_pages(text: &str, path: &Path) -> Vec<Document> {
    let origin = path.display().to_string();

    if !text.contains(PAGE_BREAK) {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        return vec![Document::new(trimmed, SourceRef::file(origin, None))];
    }

    text.split(PAGE_BREAK)
        .enumerate()
        .filter_map(|(idx, page)| {
            let trimmed = page.trim();
            if trimmed.is_empty() {
                return None;
            }
            Some(Document::new(
                trimmed,
                SourceRef::file(origin.clone(), Some(idx as u32 + 1)),
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_pages_on_form_feed() {
        let docs = split_pages("first page\x0Csecond page\x0C", Path::new("a.pdf"));
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].text, "first page");
        assert_eq!(docs[0].source.page, Some(1));
        assert_eq!(docs[1].source.page, Some(2));
    }

    #[test]
    fn single_page_has_no_page_number() {
        let docs = split_pages("just one page", Path::new("a.pdf"));
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source.page, None);
    }

    #[test]
    fn blank_text_yields_no_documents() {
        assert!(split_pages("   \n ", Path::new("a.pdf")).is_empty());
    }

    #[test]
    fn discover_filters_by_prefix_and_extension() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "Everstorm_Returns.pdf",
            "Everstorm_Shipping.PDF",
            "Other.pdf",
            "Everstorm_notes.txt",
        ] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let found = discover_pdfs(dir.path(), "Everstorm_").unwrap();
        let names: Vec<String> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["Everstorm_Returns.pdf", "Everstorm_Shipping.PDF"]);
    }

    #[test]
    fn discover_missing_dir_is_empty() {
        let found = discover_pdfs(Path::new("/nonexistent-data-dir"), "Everstorm_").unwrap();
        assert!(found.is_empty());
    }
}
