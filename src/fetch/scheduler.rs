//! Request scheduler: pacing, classification and bounded retry
//!
//! One logical fetch runs as an explicit loop:
//!
//! 1. Wait for the shared [`Pacer`] to release a slot
//! 2. Issue one physical GET
//! 3. Classify the response into a [`FetchOutcome`]
//! 4. Return the body, fail, or sleep the policy's backoff and go again
//!
//! The loop ends after at most `max_retries + 1` physical attempts.

use crate::config::Config;
use crate::fetch::client::build_http_client;
use crate::fetch::outcome::{FetchError, FetchOutcome};
use crate::fetch::pacer::Pacer;
use crate::fetch::retry::{RetryPolicy, RetryState};
use crate::SieveError;
use reqwest::header::HeaderMap;
use reqwest::Client;
use std::sync::Arc;

/// Per-call adjustments to a logical fetch
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Overrides the scheduler's default retry budget
    pub max_retries: Option<u32>,

    /// Headers that replace or extend the fixed header set for this call
    pub headers: HeaderMap,
}

impl FetchOptions {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }
}

/// Polite fetcher for one content source
///
/// Cloning is cheap and clones share the same pacer.
#[derive(Debug, Clone)]
pub struct RequestScheduler {
    client: Client,
    pacer: Arc<Pacer>,
    policy: RetryPolicy,
    max_retries: u32,
}

impl RequestScheduler {
    /// Creates a scheduler with its own wall-clock pacer
    pub fn new(config: &Config) -> Result<Self, SieveError> {
        let pacer = Arc::new(Pacer::new(config.fetcher.min_interval()));
        Self::with_pacer(config, pacer)
    }

    /// Creates a scheduler that shares an existing pacer
    ///
    /// The pacer's own minimum interval applies; the configured
    /// `min-interval-ms` is only used by [`RequestScheduler::new`].
    pub fn with_pacer(config: &Config, pacer: Arc<Pacer>) -> Result<Self, SieveError> {
        let client = build_http_client(config)?;

        Ok(Self {
            client,
            pacer,
            policy: RetryPolicy::from_config(&config.fetcher),
            max_retries: config.fetcher.max_retries,
        })
    }

    /// The shared pacer, for handing to further schedulers
    pub fn pacer(&self) -> &Arc<Pacer> {
        &self.pacer
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Fetches `url` with the default retry budget
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.fetch_with_options(url, &FetchOptions::default()).await
    }

    /// Fetches `url` allowing `max_retries` retries after the first attempt
    pub async fn fetch_with_retries(&self, url: &str, max_retries: u32) -> Result<String, FetchError> {
        let options = FetchOptions::default().with_max_retries(max_retries);
        self.fetch_with_options(url, &options).await
    }

    /// Fetches `url` with per-call header overrides and retry budget
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The response body of the first 2xx attempt
    /// * `Err(FetchError::Client)` - A non-retryable status, after one attempt
    /// * `Err(FetchError::Transport)` - A non-retryable transport failure
    /// * `Err(FetchError::RetriesExhausted)` - Retryable failures used up the budget
    pub async fn fetch_with_options(
        &self,
        url: &str,
        options: &FetchOptions,
    ) -> Result<String, FetchError> {
        let mut retry = RetryState::new(options.max_retries.unwrap_or(self.max_retries));

        loop {
            self.pacer.wait_turn().await;
            retry.record_attempt();

            let outcome = self.attempt(url, &options.headers).await;
            let backoff = self.policy.backoff_for(&outcome);

            let error = match outcome.into_result(url) {
                Ok(body) => {
                    tracing::debug!(
                        "Fetched {} ({} bytes, attempt {})",
                        url,
                        body.len(),
                        retry.attempts_made()
                    );
                    return Ok(body);
                }
                Err(error) => error,
            };

            let Some(delay) = backoff else {
                tracing::debug!("Not retrying {}: {}", url, error);
                return Err(error);
            };

            if !retry.try_consume() {
                tracing::warn!(
                    "Giving up on {} after {} attempts: {}",
                    url,
                    retry.attempts_made(),
                    error
                );
                return Err(FetchError::RetriesExhausted {
                    url: url.to_string(),
                    attempts: retry.attempts_made(),
                    last_cause: Box::new(error),
                });
            }

            tracing::warn!(
                "{}; retrying in {:?} ({} retries left)",
                error,
                delay,
                retry.attempts_remaining()
            );
            self.pacer.clock().sleep(delay).await;
        }
    }

    /// Issues one physical GET and classifies the result
    async fn attempt(&self, url: &str, headers: &HeaderMap) -> FetchOutcome {
        let response = match self.client.get(url).headers(headers.clone()).send().await {
            Ok(response) => response,
            Err(e) => return FetchOutcome::from_transport_error(&e),
        };

        let status = response.status();
        if !status.is_success() {
            return FetchOutcome::from_failed_status(status);
        }

        match response.text().await {
            Ok(body) => FetchOutcome::Success(body),
            Err(e) => FetchOutcome::from_transport_error(&e),
        }
    }
}
