use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Default minimum interval between two physical requests (milliseconds)
pub const DEFAULT_MIN_INTERVAL_MS: u64 = 500;

/// Default number of retries after the first attempt
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Default overall timeout for one physical attempt (milliseconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const DEFAULT_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.5";

/// Main configuration structure for one content source
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub headers: HeaderConfig,
    #[serde(default)]
    pub sequence: SequenceConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
}

impl Config {
    /// Creates a configuration for `base_url` with every other section defaulted
    pub fn for_source(name: &str, base_url: &str) -> Self {
        Self {
            source: SourceConfig {
                name: name.to_string(),
                base_url: base_url.to_string(),
            },
            fetcher: FetcherConfig::default(),
            headers: HeaderConfig::default(),
            sequence: SequenceConfig::default(),
            extract: ExtractConfig::default(),
        }
    }

    /// The `Referer` sent with every request: explicit, or the source root
    pub fn referer(&self) -> String {
        match &self.headers.referer {
            Some(referer) => referer.clone(),
            None => format!("{}/", self.source.base_url.trim_end_matches('/')),
        }
    }
}

/// Identity of the content source
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Short name used in log output
    pub name: String,

    /// Root URL of the source (e.g., "https://asuracomic.net")
    #[serde(rename = "base-url")]
    pub base_url: String,
}

/// Request pacing, timeout and retry configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Minimum time between two physical requests (milliseconds)
    #[serde(rename = "min-interval-ms")]
    pub min_interval_ms: u64,

    /// Retries allowed after the first attempt of a logical fetch
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Overall timeout of one physical attempt (milliseconds)
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Base wait after an HTTP 429 (milliseconds)
    #[serde(rename = "rate-limit-backoff-ms")]
    pub rate_limit_backoff_ms: u64,

    /// Upper bound of the random jitter added to the 429 wait (milliseconds)
    #[serde(rename = "rate-limit-jitter-ms")]
    pub rate_limit_jitter_ms: u64,

    /// Wait after a 503/504 or a reset/timed out connection (milliseconds)
    #[serde(rename = "retry-delay-ms")]
    pub retry_delay_ms: u64,
}

impl FetcherConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: DEFAULT_MIN_INTERVAL_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            rate_limit_backoff_ms: 2000,
            rate_limit_jitter_ms: 1000,
            retry_delay_ms: 1000,
        }
    }
}

/// Fixed header set sent with every request
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeaderConfig {
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    pub accept: String,

    #[serde(rename = "accept-language")]
    pub accept_language: String,

    /// Overrides the default referer of `<base-url>/`
    pub referer: Option<String>,

    /// Additional headers, e.g. `Cache-Control`
    pub extra: BTreeMap<String, String>,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept: DEFAULT_ACCEPT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            referer: None,
            extra: BTreeMap::new(),
        }
    }
}

/// Sequence reconstruction tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    /// Largest ID step that keeps two candidates in the same cluster
    #[serde(rename = "gap-tolerance")]
    pub gap_tolerance: u64,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            gap_tolerance: crate::sequence::DEFAULT_GAP_TOLERANCE,
        }
    }
}

/// Candidate extraction rules
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// A URL must contain one of these substrings; empty accepts every host
    #[serde(rename = "content-hosts")]
    pub content_hosts: Vec<String>,

    /// A URL containing any of these substrings is rejected
    pub denylist: Vec<String>,

    /// Regex whose first capture group is the numeric asset ID
    #[serde(rename = "id-pattern")]
    pub id_pattern: String,

    /// Image file extensions recognised by the text scan
    pub extensions: Vec<String>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            content_hosts: Vec::new(),
            denylist: ["logo", "avatar", "icon", "banner"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            id_pattern: r"/media/(\d+)/".to_string(),
            extensions: ["webp", "jpg", "jpeg", "png"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}
