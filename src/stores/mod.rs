//! Storage for paragraph chunks and their embedding vectors.
//!
//! A collection is a named, persistent set of (id, text, vector) triples
//! keyed by (directory, name). The [`ChunkStore`] trait abstracts the
//! operational surface so retrieval and grading code is not tied to the
//! SQLite backend.

pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::GradingError;

pub use sqlite::SqliteCollection;

/// A paragraph chunk as stored in a collection.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkRecord {
    /// Unique identifier within the collection. Opaque downstream.
    pub id: String,
    /// Source document path or label.
    pub source: String,
    /// Zero-based ordinal of this chunk within the indexing run.
    pub chunk_index: usize,
    /// Paragraph text.
    pub content: String,
}

impl ChunkRecord {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        chunk_index: usize,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            chunk_index,
            content: content.into(),
        }
    }
}

/// A retrieved chunk with its cosine similarity to the query.
#[derive(Clone, Debug)]
pub struct ScoredChunk {
    pub record: ChunkRecord,
    pub similarity: f32,
}

/// Operational surface of an open collection.
///
/// The embedding function is bound at create/open time; `insert` embeds at
/// insertion time and `query` embeds the query text with the same provider,
/// which keeps the embedding space consistent across indexing and retrieval.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Inserts one chunk, embedding its content with the bound provider.
    ///
    /// Fails with [`GradingError::DuplicateId`] when the id is already stored.
    async fn insert(&self, chunk: ChunkRecord) -> Result<(), GradingError>;

    /// Retrieves a chunk by id.
    async fn get(&self, id: &str) -> Result<Option<ChunkRecord>, GradingError>;

    /// Returns the `k` most similar chunks to `query_text`, most similar
    /// first. Returns fewer than `k` when the collection is smaller, and an
    /// empty sequence (never an error) on an empty collection.
    async fn query(&self, query_text: &str, k: usize) -> Result<Vec<ScoredChunk>, GradingError>;

    /// Total number of stored chunks.
    async fn count(&self) -> Result<usize, GradingError>;
}
