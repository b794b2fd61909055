//! Page-Sieve: polite page fetching and content sequence reconstruction
//!
//! This crate fetches HTML pages from rate-limited sources under a single
//! process-wide request pacer, and recovers the ordered list of content asset
//! URLs (e.g. the pages of one chapter) from the noisy set of image references
//! embedded in a page.

pub mod config;
pub mod extract;
pub mod fetch;
pub mod sequence;
pub mod sieve;

use thiserror::Error;

pub use extract::ExtractError;
pub use fetch::{FetchError, TransportErrorKind};

/// Main error type for Page-Sieve operations
#[derive(Debug, Error)]
pub enum SieveError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl SieveError {
    /// HTTP status behind a failed fetch, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Fetch(e) => e.status(),
            _ => None,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

/// Result type alias for Page-Sieve operations
pub type Result<T> = std::result::Result<T, SieveError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use fetch::{FetchOptions, Pacer, RequestScheduler};
pub use sequence::{Candidate, SequenceReconstructor};
pub use sieve::{Sieve, Strategy};
