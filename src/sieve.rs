//! Sieve coordinator - fetch, extract and reconstruct in one call
//!
//! This module wires the three stages together for one content source:
//! - Fetching the page through the polite [`RequestScheduler`]
//! - Extracting asset candidates from the body
//! - Reconstructing the ordered content sequence

use crate::config::Config;
use crate::extract::CandidateExtractor;
use crate::fetch::{FetchOptions, Pacer, RequestScheduler};
use crate::sequence::{Candidate, SequenceReconstructor};
use crate::SieveError;
use std::sync::Arc;

/// Which extraction strategy to run on a fetched page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy<'a> {
    /// Scan the raw body for image URLs
    Text,
    /// Read image sources of elements matched by a CSS selector
    Selector(&'a str),
}

/// Fetch-extract-reconstruct pipeline for one content source
#[derive(Debug, Clone)]
pub struct Sieve {
    name: String,
    scheduler: RequestScheduler,
    extractor: CandidateExtractor,
    reconstructor: SequenceReconstructor,
}

impl Sieve {
    /// Creates a sieve with its own pacer
    ///
    /// # Returns
    ///
    /// * `Ok(Sieve)` - Ready to fetch
    /// * `Err(SieveError)` - The HTTP client or extraction rules could not be built
    pub fn from_config(config: &Config) -> Result<Self, SieveError> {
        let scheduler = RequestScheduler::new(config)?;
        Self::with_scheduler(config, scheduler)
    }

    /// Creates a sieve whose requests share an existing pacer
    pub fn with_pacer(config: &Config, pacer: Arc<Pacer>) -> Result<Self, SieveError> {
        let scheduler = RequestScheduler::with_pacer(config, pacer)?;
        Self::with_scheduler(config, scheduler)
    }

    fn with_scheduler(config: &Config, scheduler: RequestScheduler) -> Result<Self, SieveError> {
        Ok(Self {
            name: config.source.name.clone(),
            scheduler,
            extractor: CandidateExtractor::from_config(config)?,
            reconstructor: SequenceReconstructor::new(config.sequence.gap_tolerance),
        })
    }

    pub fn scheduler(&self) -> &RequestScheduler {
        &self.scheduler
    }

    pub fn extractor(&self) -> &CandidateExtractor {
        &self.extractor
    }

    pub fn reconstructor(&self) -> &SequenceReconstructor {
        &self.reconstructor
    }

    /// Fetches `url` and returns its content URLs found by the text scan
    pub async fn pages(&self, url: &str) -> Result<Vec<String>, SieveError> {
        self.pages_with(url, Strategy::Text, &FetchOptions::default())
            .await
    }

    /// Fetches `url` and returns its content URLs found under `selector`
    pub async fn pages_with_selector(
        &self,
        url: &str,
        selector: &str,
    ) -> Result<Vec<String>, SieveError> {
        self.pages_with(url, Strategy::Selector(selector), &FetchOptions::default())
            .await
    }

    /// Full pipeline with an explicit strategy and fetch options
    ///
    /// An empty result means the page held no usable content references; it
    /// is not an error.
    pub async fn pages_with(
        &self,
        url: &str,
        strategy: Strategy<'_>,
        options: &FetchOptions,
    ) -> Result<Vec<String>, SieveError> {
        let body = match self.scheduler.fetch_with_options(url, options).await {
            Ok(body) => body,
            Err(e) => {
                match e.status() {
                    Some(status) => {
                        tracing::warn!("[{}] {} answered HTTP {}", self.name, url, status)
                    }
                    None => tracing::warn!("[{}] {} could not be reached", self.name, url),
                }
                return Err(e.into());
            }
        };
        let candidates = self.candidates(&body, strategy)?;
        let pages = self.reconstructor.reconstruct(&candidates);

        if pages.is_empty() {
            tracing::warn!(
                "[{}] No content sequence found in {} ({} candidates)",
                self.name,
                url,
                candidates.len()
            );
        } else {
            tracing::info!("[{}] Reconstructed {} pages from {}", self.name, pages.len(), url);
        }

        Ok(pages)
    }

    /// Runs only the extraction stage on an already fetched body
    pub fn candidates(
        &self,
        body: &str,
        strategy: Strategy<'_>,
    ) -> Result<Vec<Candidate>, SieveError> {
        let candidates = match strategy {
            Strategy::Text => self.extractor.from_text(body),
            Strategy::Selector(selector) => self.extractor.from_html(body, selector)?,
        };
        Ok(candidates)
    }
}
