//! Error taxonomy for the support backend.
//!
//! Domain errors are typed per pipeline stage; `ApiError` is the HTTP-facing
//! error that every handler returns. Only the web-fetch fallback in the
//! document loader recovers an error locally; everything else propagates.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;

/// Failures while loading source documents.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to extract text from {path}: {message}")]
    Pdf { path: PathBuf, message: String },
    #[error("failed to fetch {url}: {message}")]
    Web { url: String, message: String },
    #[error("no documents could be loaded from any source")]
    NoDocuments,
}

/// Failures while embedding text.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding backend error: {0}")]
    Backend(String),
    #[error("cannot embed empty input")]
    EmptyInput,
    #[error("embedding backend returned {actual} vectors for {expected} inputs")]
    ShapeMismatch { expected: usize, actual: usize },
}

/// Failures while building, querying, or persisting the vector index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("corrupt index at {path}: {message}")]
    Corrupt { path: PathBuf, message: String },
    #[error("index was built with embedding model '{stored}' but '{configured}' is configured")]
    ModelMismatch { stored: String, configured: String },
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("index storage error: {0}")]
    Storage(#[from] sqlx::Error),
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}

/// Failures while generating an answer.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation backend error: {0}")]
    Backend(String),
    #[error("generation timed out")]
    Timeout,
    #[error("generation backend unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("upstream timeout: {0}")]
    Timeout(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<IndexError> for ApiError {
    fn from(err: IndexError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::Timeout => ApiError::Timeout("generation timed out".to_string()),
            GenerationError::Unavailable(msg) => ApiError::ServiceUnavailable(msg),
            GenerationError::Backend(msg) => ApiError::Internal(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Timeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
