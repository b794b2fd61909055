//! Candidate extraction
//!
//! Turns a raw page body into [`Candidate`]s for the sequence reconstructor.
//! Two strategies are offered:
//! - A text scan for image URLs, which also finds references inside inline
//!   script payloads where slashes are JSON-escaped
//! - A DOM scan of elements matched by a CSS selector, reading lazily loaded
//!   `data-src` before `src`
//!
//! Both apply the same normalization, host allowlist, denylist and
//! annotation.
//!
//! [`Candidate`]: crate::sequence::Candidate

mod extractor;

pub use extractor::CandidateExtractor;

use thiserror::Error;

/// Errors raised while setting up or running extraction
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid CSS selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },
}
