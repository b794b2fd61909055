use crate::config::{Config, ExtractConfig};
use crate::extract::ExtractError;
use crate::sequence::Candidate;
use regex::Regex;
use scraper::{Html, Selector};
use std::borrow::Cow;
use url::Url;

/// Suffix some CDNs append to re-encoded page images
const OPTIMIZED_SUFFIX: &str = "-optimized";

/// Placeholder image shown until a lazy image loads
const LAZY_PLACEHOLDER: &str = "loading.svg";

/// Extracts content asset candidates from page bodies
#[derive(Debug, Clone)]
pub struct CandidateExtractor {
    /// Lowercased substrings one of which a URL must contain
    content_hosts: Vec<String>,

    /// Lowercased substrings that reject a URL
    denylist: Vec<String>,

    /// First capture group is the numeric asset ID
    id_pattern: Regex,

    /// Matches absolute and protocol-relative image URLs
    url_pattern: Regex,

    /// Base for resolving relative `src` values in the DOM scan
    base_url: Option<Url>,
}

impl CandidateExtractor {
    /// Builds an extractor from a source configuration
    pub fn from_config(config: &Config) -> Result<Self, ExtractError> {
        let base_url = Url::parse(&config.source.base_url).ok();
        Self::new(&config.extract, base_url)
    }

    /// Builds an extractor from extraction rules and an optional base URL
    pub fn new(config: &ExtractConfig, base_url: Option<Url>) -> Result<Self, ExtractError> {
        let id_pattern = Regex::new(&config.id_pattern).map_err(|e| {
            ExtractError::InvalidPattern(format!("id-pattern '{}': {}", config.id_pattern, e))
        })?;

        let extensions = config
            .extensions
            .iter()
            .map(|ext| regex::escape(ext))
            .collect::<Vec<_>>()
            .join("|");
        let url_pattern = Regex::new(&format!(
            r#"(?i)(?:https?:)?//[^"'\s\\<>]+\.(?:{})"#,
            extensions
        ))
        .map_err(|e| ExtractError::InvalidPattern(format!("extensions: {}", e)))?;

        Ok(Self {
            content_hosts: lowercase_all(&config.content_hosts),
            denylist: lowercase_all(&config.denylist),
            id_pattern,
            url_pattern,
            base_url,
        })
    }

    /// Scans raw text for image URLs, in order of appearance
    ///
    /// Escaped slashes (`\/`) are unescaped first so URLs embedded in JSON
    /// payloads are found too. Repeated URLs are kept; the reconstructor
    /// removes them.
    pub fn from_text(&self, body: &str) -> Vec<Candidate> {
        let text = if body.contains("\\/") {
            Cow::Owned(body.replace("\\/", "/"))
        } else {
            Cow::Borrowed(body)
        };

        let candidates: Vec<Candidate> = self
            .url_pattern
            .find_iter(&text)
            .filter_map(|m| self.candidate(m.as_str()))
            .collect();

        tracing::debug!("Text scan found {} candidates", candidates.len());
        candidates
    }

    /// Scans elements matched by `selector` for their image source
    ///
    /// The selector should match `<img>` elements (e.g. `.chapter-image img`).
    /// `data-src` is preferred over `src`; empty values and lazy-load
    /// placeholders are skipped.
    pub fn from_html(&self, html: &str, selector: &str) -> Result<Vec<Candidate>, ExtractError> {
        let parsed = Selector::parse(selector).map_err(|e| ExtractError::InvalidSelector {
            selector: selector.to_string(),
            message: format!("{:?}", e),
        })?;

        let document = Html::parse_document(html);
        let candidates: Vec<Candidate> = document
            .select(&parsed)
            .filter_map(|element| {
                let value = element.value();
                non_empty(value.attr("data-src")).or_else(|| non_empty(value.attr("src")))
            })
            .filter(|src| !src.contains(LAZY_PLACEHOLDER))
            .filter_map(|src| self.candidate(src))
            .collect();

        tracing::debug!(
            "DOM scan with '{}' found {} candidates",
            selector,
            candidates.len()
        );
        Ok(candidates)
    }

    /// Normalizes, filters and annotates a single asset URL
    ///
    /// Returns `None` if the URL cannot be made absolute, is outside the
    /// content hosts, or hits the denylist. A URL that passes but carries no
    /// usable ID still yields a candidate with `numeric_id: None`.
    pub fn candidate(&self, raw: &str) -> Option<Candidate> {
        let url = self.absolutize(raw.trim())?;
        if !self.accepts(&url) {
            return None;
        }

        let numeric_id = self
            .id_pattern
            .captures(&url)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .filter(|&id| id != 0);
        let page_number = page_number_from_filename(&url);

        Some(Candidate {
            url,
            numeric_id,
            page_number,
        })
    }

    /// Makes a URL absolute, upgrading protocol-relative ones to https
    fn absolutize(&self, raw: &str) -> Option<String> {
        if raw.is_empty() {
            return None;
        }

        if let Some(rest) = raw.strip_prefix("//") {
            return Some(format!("https://{}", rest));
        }

        let lower = raw.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Some(raw.to_string());
        }

        if lower.starts_with("data:") || lower.starts_with("javascript:") {
            return None;
        }

        self.base_url
            .as_ref()
            .and_then(|base| base.join(raw).ok())
            .map(String::from)
    }

    fn accepts(&self, url: &str) -> bool {
        let lower = url.to_lowercase();

        let on_content_host = self.content_hosts.is_empty()
            || self.content_hosts.iter().any(|host| lower.contains(host));
        let denied = self.denylist.iter().any(|entry| lower.contains(entry));

        on_content_host && !denied
    }
}

/// Page number from a purely numeric file name, e.g. `.../07-optimized.webp` -> 7
fn page_number_from_filename(url: &str) -> Option<u32> {
    let parsed = Url::parse(url).ok()?;
    let filename = parsed.path_segments()?.last()?;
    let stem = filename.split('.').next()?;
    let stem = stem.strip_suffix(OPTIMIZED_SUFFIX).unwrap_or(stem);

    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn lowercase_all(values: &[String]) -> Vec<String> {
    values.iter().map(|v| v.to_lowercase()).collect()
}
