use crate::config::types::{Config, ExtractConfig, FetcherConfig, HeaderConfig, SourceConfig};
use crate::ConfigError;
use regex::Regex;
use reqwest::header::{HeaderName, HeaderValue};
use url::Url;

const MAX_RETRIES_LIMIT: u32 = 10;
const MIN_TIMEOUT_MS: u64 = 100;
const MAX_MIN_INTERVAL_MS: u64 = 60_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_source_config(&config.source)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_header_config(&config.headers)?;
    validate_extract_config(&config.extract)?;
    Ok(())
}

/// Validates source identity
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    if config.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "source name cannot be empty".to_string(),
        ));
    }

    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    Ok(())
}

/// Validates pacing and retry limits
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.max_retries > MAX_RETRIES_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max-retries must be <= {}, got {}",
            MAX_RETRIES_LIMIT, config.max_retries
        )));
    }

    if config.timeout_ms < MIN_TIMEOUT_MS {
        return Err(ConfigError::Validation(format!(
            "timeout-ms must be >= {}ms, got {}ms",
            MIN_TIMEOUT_MS, config.timeout_ms
        )));
    }

    if config.min_interval_ms > MAX_MIN_INTERVAL_MS {
        return Err(ConfigError::Validation(format!(
            "min-interval-ms must be <= {}ms, got {}ms",
            MAX_MIN_INTERVAL_MS, config.min_interval_ms
        )));
    }

    Ok(())
}

/// Validates that every configured header can be sent
fn validate_header_config(config: &HeaderConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    validate_header_value("user-agent", &config.user_agent)?;
    validate_header_value("accept", &config.accept)?;
    validate_header_value("accept-language", &config.accept_language)?;

    if let Some(referer) = &config.referer {
        Url::parse(referer)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid referer: {}", e)))?;
    }

    for (name, value) in &config.extra {
        HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            ConfigError::Validation(format!("Invalid header name '{}'", name))
        })?;
        validate_header_value(name, value)?;
    }

    Ok(())
}

fn validate_header_value(name: &str, value: &str) -> Result<(), ConfigError> {
    HeaderValue::from_str(value)
        .map(|_| ())
        .map_err(|_| ConfigError::Validation(format!("Invalid value for header '{}'", name)))
}

/// Validates candidate extraction rules
fn validate_extract_config(config: &ExtractConfig) -> Result<(), ConfigError> {
    let pattern = Regex::new(&config.id_pattern).map_err(|e| {
        ConfigError::InvalidPattern(format!("id-pattern '{}': {}", config.id_pattern, e))
    })?;

    // captures_len counts the implicit whole-match group
    if pattern.captures_len() < 2 {
        return Err(ConfigError::InvalidPattern(format!(
            "id-pattern '{}' must contain a capture group for the numeric ID",
            config.id_pattern
        )));
    }

    if config.extensions.is_empty() {
        return Err(ConfigError::Validation(
            "extensions cannot be empty".to_string(),
        ));
    }

    for extension in &config.extensions {
        if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ConfigError::Validation(format!(
                "Extension '{}' must be non-empty and alphanumeric",
                extension
            )));
        }
    }

    if config.denylist.iter().any(|entry| entry.is_empty()) {
        return Err(ConfigError::Validation(
            "denylist entries cannot be empty".to_string(),
        ));
    }

    Ok(())
}
