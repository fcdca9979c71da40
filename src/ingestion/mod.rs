//! Document ingestion: PDF page extraction and paragraph splitting.

pub mod pdf;
pub mod split;

pub use pdf::load_pdf;
pub use split::{ChunkIdStrategy, LabeledChunk, label_chunks, split_pages, split_pages_flat};
