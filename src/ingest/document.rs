use serde::{Deserialize, Serialize};

/// Identifies where a piece of text came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    /// File path or URL.
    pub origin: String,
    /// 1-based page number for paged formats.
    pub page: Option<u32>,
}

impl SourceRef {
    pub fn file(origin: impl Into<String>, page: Option<u32>) -> Self {
        Self {
            origin: origin.into(),
            page,
        }
    }

    pub fn url(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            page: None,
        }
    }

    /// Human-readable attribution label used in prompts and responses.
    pub fn label(&self) -> String {
        match self.page {
            Some(page) => format!("{} (page {})", self.origin, page),
            None => self.origin.clone(),
        }
    }
}

/// A loaded source document. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub source: SourceRef,
}

impl Document {
    pub fn new(text: impl Into<String>, source: SourceRef) -> Self {
        Self {
            text: text.into(),
            source,
        }
    }
}
