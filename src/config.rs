//! Explicit configuration for the Gemini-backed adapters.
//!
//! The credential is threaded into each adapter's constructor instead of being
//! read from the process environment at arbitrary call sites, so adapters stay
//! testable with fake credentials and a mock HTTP server.

use crate::types::GradingError;

/// Environment variable holding the Gemini API key.
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_EMBEDDING_MODEL: &str = "models/embedding-001";
const DEFAULT_GENERATION_MODEL: &str = "models/gemini-pro";
const DEFAULT_TASK_TYPE: &str = "RETRIEVAL_DOCUMENT";
const DEFAULT_TITLE: &str = "Custom query";

/// Settings shared by the embedding and generation adapters.
#[derive(Clone, Debug)]
pub struct GeminiConfig {
    /// API key sent with every request. Must be non-empty.
    pub api_key: String,
    /// Service root, overridable so tests can target a local mock server.
    pub base_url: String,
    /// Model identifier used for embedding calls.
    pub embedding_model: String,
    /// Model identifier used for generation calls.
    pub generation_model: String,
    /// Task-type hint attached to embedding requests.
    pub task_type: String,
    /// Title metadata attached to embedding requests.
    pub title: String,
}

impl GeminiConfig {
    /// Creates a configuration with the given API key and default endpoints.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            generation_model: DEFAULT_GENERATION_MODEL.to_string(),
            task_type: DEFAULT_TASK_TYPE.to_string(),
            title: DEFAULT_TITLE.to_string(),
        }
    }

    /// Loads the API key from `GEMINI_API_KEY` (reading `.env` if present).
    ///
    /// Fails with [`GradingError::Configuration`] when the variable is unset
    /// or empty, before any network call could be attempted.
    pub fn from_env() -> Result<Self, GradingError> {
        dotenvy::dotenv().ok();
        let api_key = std::env::var(API_KEY_VAR).unwrap_or_default();
        if api_key.trim().is_empty() {
            return Err(GradingError::Configuration(format!(
                "Gemini API key not provided; set {API_KEY_VAR}"
            )));
        }
        Ok(Self::new(api_key))
    }

    /// Overrides the service root URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the embedding model identifier.
    #[must_use]
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// Overrides the generation model identifier.
    #[must_use]
    pub fn with_generation_model(mut self, model: impl Into<String>) -> Self {
        self.generation_model = model.into();
        self
    }

    /// Overrides the task-type hint sent with embedding requests.
    #[must_use]
    pub fn with_task_type(mut self, task_type: impl Into<String>) -> Self {
        self.task_type = task_type.into();
        self
    }

    /// Overrides the title metadata sent with embedding requests.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub(crate) fn ensure_api_key(&self) -> Result<(), GradingError> {
        if self.api_key.trim().is_empty() {
            return Err(GradingError::Configuration(format!(
                "Gemini API key not provided; set {API_KEY_VAR}"
            )));
        }
        Ok(())
    }
}
