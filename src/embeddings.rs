//! Embedding adapters: text in, fixed-length vectors out.
//!
//! The trait only covers parameter shaping and credential enforcement; the
//! actual embedding computation is delegated to the remote model.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::GeminiConfig;
use crate::retry::{RetryPolicy, post_json_with_retry};
use crate::types::GradingError;

/// Order-preserving batch embedding: one vector per input text.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Identifier of the underlying model. Recorded as collection metadata at
    /// index-build time and validated at open time.
    fn model_id(&self) -> &str;

    /// Embeds every input text, preserving order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, GradingError>;

    /// Embeds a single text.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, GradingError> {
        let texts = [text.to_string()];
        let mut vectors = self.embed_batch(&texts).await?;
        vectors.pop().ok_or_else(|| {
            GradingError::Embedding("embedding service returned no vector".to_string())
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: ContentParts<'a>,
    task_type: &'a str,
    title: &'a str,
}

#[derive(Serialize)]
struct ContentParts<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

/// Embedding adapter for the Gemini `batchEmbedContents` endpoint.
#[derive(Debug)]
pub struct GeminiEmbeddingProvider {
    config: GeminiConfig,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl GeminiEmbeddingProvider {
    /// Builds a provider from an explicit configuration.
    ///
    /// Fails with [`GradingError::Configuration`] when the API key is empty,
    /// before any network call is attempted.
    pub fn new(config: GeminiConfig) -> Result<Self, GradingError> {
        config.ensure_api_key()?;
        let client = reqwest::Client::builder().use_rustls_tls().build()?;
        Ok(Self {
            config,
            client,
            retry: RetryPolicy::default(),
        })
    }

    /// Replaces the retry policy for embedding calls.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:batchEmbedContents?key={}",
            self.config.base_url, self.config.embedding_model, self.config.api_key
        )
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddingProvider {
    fn model_id(&self) -> &str {
        &self.config.embedding_model
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, GradingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedContentRequest {
                    model: &self.config.embedding_model,
                    content: ContentParts {
                        parts: vec![TextPart { text }],
                    },
                    task_type: &self.config.task_type,
                    title: &self.config.title,
                })
                .collect(),
        };

        let response =
            post_json_with_retry(&self.client, &self.endpoint(), &body, &self.retry).await?;
        let parsed: BatchEmbedResponse = response
            .json()
            .await
            .map_err(|err| GradingError::Embedding(err.to_string()))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(GradingError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.embeddings.len()
            )));
        }

        tracing::debug!(
            model = %self.config.embedding_model,
            texts = texts.len(),
            "embedded batch"
        );
        Ok(parsed.embeddings.into_iter().map(|e| e.values).collect())
    }
}

/// Deterministic hash-based embeddings for tests and offline runs.
///
/// Identical texts always map to identical vectors, so exact-match retrieval
/// is exercisable without a network credential.
#[derive(Clone, Debug)]
pub struct MockEmbeddingProvider {
    model_id: String,
    dims: usize,
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self {
            model_id: "mock-embedder".to_string(),
            dims: 8,
        }
    }

    /// Overrides the reported model id, e.g. to simulate a mismatched provider.
    #[must_use]
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    fn hash_to_vec(&self, text: &str) -> Vec<f32> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let seed = hasher.finish();
        (0..self.dims)
            .map(|i| {
                let bits = seed.rotate_left((i * 8) as u32) ^ ((i as u64) << 24);
                // Offset keeps every component positive so no vector is ~zero.
                (bits % 1_000_000) as f32 / 1_000_000.0 + 0.001
            })
            .collect()
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, GradingError> {
        Ok(texts.iter().map(|text| self.hash_to_vec(text)).collect())
    }
}
