//! Document ingestion: local policy PDFs plus a fixed set of web pages,
//! normalized into [`Document`]s for the chunking pipeline.

pub mod document;
pub mod loader;
pub mod pdf;
pub mod web;

pub use document::{Document, SourceRef};
pub use loader::DocumentLoader;
