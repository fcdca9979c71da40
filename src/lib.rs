//! ```text
//! PDF file ──► ingestion::pdf::load_pdf ──► page texts
//!
//! page texts ──► ingestion::split ──► paragraph chunks (Flat / PerPage ids)
//!
//! chunks ──► embeddings::EmbeddingProvider ──► vectors ──► stores::sqlite::SqliteCollection
//!
//! question ──► collection query (cosine NN) ──► top-k passages
//!                                                   │
//! GradingRequest ──► prompt::build_grading_prompt ◄─┘
//!                                │
//!                                └─► generation::TextGenerator ──► grade text
//! ```
//!
pub mod config;
pub mod embeddings;
pub mod generation;
pub mod grader;
pub mod ingestion;
pub mod prompt;
pub mod retry;
pub mod stores;
pub mod types;

pub use config::GeminiConfig;
pub use embeddings::{EmbeddingProvider, GeminiEmbeddingProvider, MockEmbeddingProvider};
pub use generation::{GeminiGenerator, MockGenerator, TextGenerator};
pub use grader::{Grader, IndexSummary};
pub use ingestion::split::ChunkIdStrategy;
pub use prompt::GradingRequest;
pub use retry::RetryPolicy;
pub use stores::{ChunkRecord, ChunkStore};
pub use types::GradingError;
