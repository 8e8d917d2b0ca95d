//! Retrieval-augmented support backend for the Everstorm Outfitters
//! policy corpus.
//!
//! The pipeline: PDFs and web pages are loaded and normalized
//! ([`ingest`]), split into overlapping segments ([`rag::chunker`]),
//! embedded ([`embedding`]) and stored in a durable vector index
//! ([`rag::index`]). At question time the [`rag::chain`] retrieves the
//! most similar segments, renders the support prompt, and asks the chat
//! model, with per-session history kept in [`history`].

pub mod core;
pub mod embedding;
pub mod history;
pub mod ingest;
pub mod llm;
pub mod logging;
pub mod rag;
pub mod server;
pub mod state;
pub mod testing;
