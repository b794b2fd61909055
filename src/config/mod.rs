//! Configuration module for Page-Sieve
//!
//! This module handles loading, parsing, and validating the TOML file that
//! describes one content source: its base URL, header set, pacing and retry
//! limits, and the candidate extraction rules.
//!
//! # Example
//!
//! ```no_run
//! use page_sieve::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("asura.toml")).unwrap();
//! println!("Minimum interval: {}ms", config.fetcher.min_interval_ms);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, ExtractConfig, FetcherConfig, HeaderConfig, SequenceConfig, SourceConfig,
    DEFAULT_MAX_RETRIES, DEFAULT_MIN_INTERVAL_MS, DEFAULT_TIMEOUT_MS,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
