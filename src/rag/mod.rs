//! The retrieval pipeline: chunking, vector index, retriever, prompt
//! assembly, and the conversational chain.

pub mod chain;
pub mod chunker;
pub mod index;
pub mod prompt;
pub mod retriever;

pub use chain::{ChainResponse, ConversationalChain};
pub use chunker::{Chunker, Segment};
pub use index::VectorIndex;
pub use retriever::Retriever;
