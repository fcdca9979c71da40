//! Shared error taxonomy for the grading pipeline.

use thiserror::Error;

/// Errors surfaced by ingestion, storage, retrieval, and grading operations.
///
/// Nothing is caught or retried silently inside the crate: every failure
/// propagates to the immediate caller, so an error here means the whole
/// indexing or grading call aborted with no partial state committed.
#[derive(Debug, Error)]
pub enum GradingError {
    /// A required credential or setting is missing.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A file or collection does not exist at the given location.
    #[error("not found: {0}")]
    NotFound(String),

    /// The input file exists but could not be parsed as a PDF.
    #[error("unreadable PDF: {0}")]
    Parse(String),

    /// A collection with this name already exists at the given path.
    #[error("collection already exists: {0}")]
    AlreadyExists(String),

    /// A chunk with this id is already stored in the collection.
    #[error("duplicate chunk id: {0}")]
    DuplicateId(String),

    /// The collection was indexed with a different embedding model than the
    /// one supplied at open time. Querying across embedding spaces silently
    /// degrades retrieval, so the mismatch is rejected up front.
    #[error("collection was indexed with embedding model '{expected}' but opened with '{actual}'")]
    EmbeddingModelMismatch { expected: String, actual: String },

    /// The embedding service returned an unusable response.
    #[error("embedding request failed: {0}")]
    Embedding(String),

    /// The generation service returned an unusable response.
    #[error("generation request failed: {0}")]
    Generation(String),

    /// SQLite or sqlite-vec level failure.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
