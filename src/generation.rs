//! Text generation adapter for the grading call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::GeminiConfig;
use crate::retry::{RetryPolicy, post_json_with_retry};
use crate::types::GradingError;

/// Prompt in, generated text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GradingError>;
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Generation adapter for the Gemini `generateContent` endpoint.
#[derive(Debug)]
pub struct GeminiGenerator {
    config: GeminiConfig,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl GeminiGenerator {
    /// Builds a generator from an explicit configuration.
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

    /// Replaces the retry policy for generation calls.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent?key={}",
            self.config.base_url, self.config.generation_model, self.config.api_key
        )
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GradingError> {
        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response =
            post_json_with_retry(&self.client, &self.endpoint(), &body, &self.retry).await?;
        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|err| GradingError::Generation(err.to_string()))?;

        let candidate = parsed.candidates.into_iter().next().ok_or_else(|| {
            GradingError::Generation("generation response contained no candidates".to_string())
        })?;
        let text = candidate
            .content
            .parts
            .into_iter()
            .map(|part| part.text)
            .collect::<Vec<_>>()
            .join("");

        tracing::debug!(model = %self.config.generation_model, chars = text.len(), "generated text");
        Ok(text)
    }
}

/// Canned generator for tests: returns a fixed reply, or echoes the prompt.
#[derive(Clone, Debug, Default)]
pub struct MockGenerator {
    reply: Option<String>,
}

impl MockGenerator {
    /// A generator that returns the prompt it was given.
    pub fn echo() -> Self {
        Self { reply: None }
    }

    /// A generator that always returns `reply`.
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
        }
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GradingError> {
        Ok(self
            .reply
            .clone()
            .unwrap_or_else(|| prompt.to_string()))
    }
}
