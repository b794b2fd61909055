//! HTTP client construction
//!
//! This module builds the `reqwest` client a scheduler uses for every
//! physical attempt: the source's fixed header set and the per-attempt
//! timeout live on the client, so individual requests only add overrides.

use crate::config::Config;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT,
};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;

const MAX_REDIRECTS: usize = 10;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds an HTTP client with the source's headers and timeout
///
/// # Arguments
///
/// * `config` - The source configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use page_sieve::config::Config;
/// use page_sieve::fetch::build_http_client;
///
/// let config = Config::for_source("asura", "https://asuracomic.net");
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    Client::builder()
        .default_headers(request_headers(config))
        .timeout(config.fetcher.timeout())
        .connect_timeout(CONNECT_TIMEOUT.min(config.fetcher.timeout()))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// The fixed header set sent with every page request
///
/// Invalid entries are skipped with a warning; `validate` rejects them
/// before a client is ever built from a loaded file.
pub fn request_headers(config: &Config) -> HeaderMap {
    let mut headers = HeaderMap::new();

    insert_header(&mut headers, USER_AGENT, &config.headers.user_agent);
    insert_header(&mut headers, ACCEPT, &config.headers.accept);
    insert_header(&mut headers, ACCEPT_LANGUAGE, &config.headers.accept_language);
    insert_header(&mut headers, REFERER, &config.referer());

    for (name, value) in &config.headers.extra {
        match HeaderName::from_bytes(name.as_bytes()) {
            Ok(name) => insert_header(&mut headers, name, value),
            Err(_) => tracing::warn!("Skipping invalid header name '{}'", name),
        }
    }

    headers
}

/// Headers a consumer must send when downloading the source's images
///
/// Image hosts typically check the referer and user agent and serve an
/// error placeholder otherwise.
pub fn image_headers(config: &Config) -> HeaderMap {
    let mut headers = HeaderMap::new();
    insert_header(&mut headers, REFERER, &config.referer());
    insert_header(&mut headers, USER_AGENT, &config.headers.user_agent);
    headers
}

fn insert_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => tracing::warn!("Skipping invalid value for header '{}'", name),
    }
}
