//! Bounded retry with exponential backoff for outbound HTTP calls.
//!
//! Retries are an explicit policy object rather than a silent loop: callers
//! choose how many attempts a call gets, and [`RetryPolicy::none`] restores
//! plain single-shot behavior.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;

use crate::types::GradingError;

/// Controls how transient HTTP failures are retried.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy with the given attempt budget and initial delay.
    ///
    /// `max_attempts` counts the first try, so it is clamped to at least 1.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Total number of attempts a call may use.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the attempt following `attempt` (1-based), doubling each time.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(250))
    }
}

/// POSTs a JSON body, retrying transport errors and 5xx responses under `policy`.
///
/// Non-5xx HTTP errors (bad request, unauthorized, ...) are never retried.
pub(crate) async fn post_json_with_retry<B: Serialize>(
    client: &Client,
    url: &str,
    body: &B,
    policy: &RetryPolicy,
) -> Result<reqwest::Response, GradingError> {
    let mut attempt = 1u32;
    loop {
        let outcome = client.post(url).json(body).send().await;
        let retryable = match &outcome {
            Ok(response) => response.status().is_server_error(),
            Err(err) => err.is_timeout() || err.is_connect(),
        };

        if retryable && attempt < policy.max_attempts() {
            let delay = policy.delay_for(attempt);
            tracing::debug!(url, attempt, delay_ms = delay.as_millis() as u64, "retrying request");
            tokio::time::sleep(delay).await;
            attempt += 1;
            continue;
        }

        return Ok(outcome?.error_for_status()?);
    }
}
