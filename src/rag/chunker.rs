//! Splits documents into bounded, overlapping segments for embedding.

use serde::{Deserialize, Serialize};

use crate::core::config::settings::ChunkingSettings;
use crate::ingest::{Document, SourceRef};

/// A contiguous piece of one document, small enough to embed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    pub source: SourceRef,
    /// Position of this segment within its document.
    pub chunk_index: usize,
    /// Character offset of the segment's window in the document.
    pub start_offset: usize,
}

pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_overlap,
        }
    }

    pub fn from_settings(settings: &ChunkingSettings) -> Self {
        Self::new(settings.chunk_size, settings.chunk_overlap)
    }

    pub fn chunk(&self, documents: &[Document]) -> Vec<Segment> {
        documents
            .iter()
            .flat_map(|doc| self.chunk_document(doc))
            .collect()
    }

    /// Character-windowed splitting. Windows advance by
    /// `chunk_size - chunk_overlap`; a window that is not the last in its
    /// document is trimmed back to a sentence boundary found in its final
    /// fifth, so segments never exceed `chunk_size` characters.
    fn chunk_document(&self, document: &Document) -> Vec<Segment> {
        let chars: Vec<char> = document.text.chars().collect();
        let total = chars.len();
        if total == 0 {
            return Vec::new();
        }

        let step = self.chunk_size.saturating_sub(self.chunk_overlap).max(1);
        let mut segments = Vec::new();
        let mut start = 0;
        let mut chunk_index = 0;

        while start < total {
            let end = (start + self.chunk_size).min(total);
            let window = &chars[start..end];
            let cut = if end < total {
                sentence_boundary(window).unwrap_or(window.len())
            } else {
                window.len()
            };

            let text: String = window[..cut].iter().collect();
            let text = text.trim();
            if !text.is_empty() {
                segments.push(Segment {
                    text: text.to_string(),
                    source: document.source.clone(),
                    chunk_index,
                    start_offset: start,
                });
                chunk_index += 1;
            }

            if end == total {
                break;
            }
            start += step;
        }

        segments
    }
}

/// Look for a sentence ending in the final fifth of the window. Returns
/// the cut position just after the punctuation, or None when the window
/// has no usable boundary.
fn sentence_boundary(window: &[char]) -> Option<usize> {
    let floor = window.len() * 4 / 5;
    let mut i = window.len();

    while i > floor {
        i -= 1;
        if matches!(window[i], '.' | '!' | '?')
            && window.get(i + 1).map_or(true, |c| c.is_whitespace())
        {
            return Some(i + 1);
        }
    }

    None
}
