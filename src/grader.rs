//! Grading orchestrator: index a PDF into a collection, then grade answers
//! against it.

use std::path::Path;
use std::sync::Arc;

use crate::embeddings::EmbeddingProvider;
use crate::generation::TextGenerator;
use crate::ingestion::pdf::load_pdf;
use crate::ingestion::split::{ChunkIdStrategy, label_chunks};
use crate::prompt::{GradingRequest, build_grading_prompt, join_passages};
use crate::stores::sqlite::SqliteCollection;
use crate::stores::{ChunkRecord, ChunkStore};
use crate::types::GradingError;

const DEFAULT_TOP_K: usize = 3;

/// Counts reported after an indexing run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexSummary {
    /// Pages extracted from the PDF.
    pub pages: usize,
    /// Paragraph chunks stored in the collection.
    pub chunks: usize,
}

/// Composes loading, splitting, storage, retrieval, and generation into the
/// two pipeline entry points: [`Grader::index_pdf`] and
/// [`Grader::check_answer`].
///
/// Every external call is awaited one at a time; there is no batching and no
/// partial-failure recovery, so a failed insert or retrieval aborts the whole
/// call.
pub struct Grader {
    provider: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn TextGenerator>,
    top_k: usize,
}

impl Grader {
    /// Create a new builder for constructing a `Grader`.
    pub fn builder() -> GraderBuilder {
        GraderBuilder::default()
    }

    /// Loads a PDF, splits it into paragraph chunks, and stores them in a
    /// freshly created collection at `(dir, name)`.
    ///
    /// Inserts run strictly sequentially; each chunk is embedded at insertion
    /// time by the collection's bound provider. Propagates
    /// [`GradingError::AlreadyExists`] when the collection already exists.
    pub async fn index_pdf(
        &self,
        pdf_path: impl AsRef<Path>,
        dir: impl AsRef<Path>,
        name: &str,
        strategy: ChunkIdStrategy,
    ) -> Result<IndexSummary, GradingError> {
        let pdf_path = pdf_path.as_ref();
        let pages = load_pdf(pdf_path)?;
        let source = pdf_path.display().to_string();
        self.index_pages(&pages, &source, dir, name, strategy).await
    }

    /// Indexes already-extracted page texts. [`Grader::index_pdf`] delegates
    /// here after extraction.
    pub async fn index_pages(
        &self,
        pages: &[String],
        source: &str,
        dir: impl AsRef<Path>,
        name: &str,
        strategy: ChunkIdStrategy,
    ) -> Result<IndexSummary, GradingError> {
        let chunks = label_chunks(pages, strategy);
        let collection =
            SqliteCollection::create(dir.as_ref(), name, Arc::clone(&self.provider)).await?;

        let total = chunks.len();
        for (ordinal, chunk) in chunks.into_iter().enumerate() {
            collection
                .insert(ChunkRecord::new(chunk.id, source, ordinal, chunk.content))
                .await?;
        }

        tracing::info!(
            collection = name,
            source,
            pages = pages.len(),
            chunks = total,
            "indexed document"
        );
        Ok(IndexSummary {
            pages: pages.len(),
            chunks: total,
        })
    }

    /// Grades a student's answer against the collection at `(dir, name)`.
    ///
    /// Opens the collection, retrieves up to `top_k` passages for the
    /// question, builds the grading prompt, and returns the generator's text
    /// verbatim. An empty retrieval result yields an empty reference-text
    /// block, not an error; a missing collection propagates
    /// [`GradingError::NotFound`].
    pub async fn check_answer(
        &self,
        dir: impl AsRef<Path>,
        name: &str,
        request: &GradingRequest,
    ) -> Result<String, GradingError> {
        let collection =
            SqliteCollection::open(dir.as_ref(), name, Arc::clone(&self.provider)).await?;
        self.check_answer_with_store(&collection, request).await
    }

    /// Grades against an already-open store. Useful for tests and for callers
    /// that keep a collection open across grading calls.
    pub async fn check_answer_with_store<S: ChunkStore>(
        &self,
        store: &S,
        request: &GradingRequest,
    ) -> Result<String, GradingError> {
        let scored = store.query(&request.question, self.top_k).await?;
        let passages: Vec<String> = scored
            .into_iter()
            .map(|chunk| chunk.record.content)
            .collect();

        tracing::info!(
            retrieved = passages.len(),
            top_k = self.top_k,
            "retrieved reference passages"
        );

        let reference = join_passages(&passages);
        let prompt = build_grading_prompt(request, &reference);
        self.generator.generate(&prompt).await
    }
}

/// Builder for constructing [`Grader`] instances.
#[derive(Default)]
pub struct GraderBuilder {
    provider: Option<Arc<dyn EmbeddingProvider>>,
    generator: Option<Arc<dyn TextGenerator>>,
    top_k: Option<usize>,
}

impl GraderBuilder {
    /// Set the embedding provider bound to collections at index and query time.
    ///
    /// This is required before calling [`build()`](Self::build).
    #[must_use]
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the text generator invoked with the grading prompt.
    ///
    /// This is required before calling [`build()`](Self::build).
    #[must_use]
    pub fn generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Set how many passages are retrieved per grading call.
    ///
    /// Defaults to 3.
    #[must_use]
    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    /// Build the [`Grader`].
    ///
    /// # Panics
    ///
    /// Panics if the embedding provider or generator was not set.
    pub fn build(self) -> Grader {
        Grader {
            provider: self
                .provider
                .expect("GraderBuilder requires an embedding provider"),
            generator: self.generator.expect("GraderBuilder requires a generator"),
            top_k: self.top_k.unwrap_or(DEFAULT_TOP_K),
        }
    }

    /// Build the [`Grader`], returning `None` if a required part is missing.
    pub fn try_build(self) -> Option<Grader> {
        Some(Grader {
            provider: self.provider?,
            generator: self.generator?,
            top_k: self.top_k.unwrap_or(DEFAULT_TOP_K),
        })
    }
}
