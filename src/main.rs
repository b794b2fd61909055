//! Page-Sieve main entry point
//!
//! Command-line interface for running one source configuration against one
//! page URL.

use anyhow::Context;
use clap::Parser;
use page_sieve::config::{load_config_with_hash, Config};
use page_sieve::fetch::image_headers;
use page_sieve::{FetchOptions, Sieve, Strategy};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Page-Sieve: polite page fetching and content sequence reconstruction
///
/// Fetches a page while respecting the source's rate limits and prints the
/// ordered content image URLs found in it.
#[derive(Parser, Debug)]
#[command(name = "page-sieve")]
#[command(version)]
#[command(about = "Polite page fetching and content sequence reconstruction", long_about = None)]
struct Cli {
    /// Path to TOML source configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Page URL to fetch (not needed with --dry-run)
    #[arg(value_name = "URL", required_unless_present = "dry_run")]
    url: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the request setup without fetching
    #[arg(long, conflicts_with_all = ["raw", "selector"])]
    dry_run: bool,

    /// Print the fetched page body instead of reconstructing
    #[arg(long, conflicts_with = "selector")]
    raw: bool,

    /// Extract candidates from elements matching this CSS selector instead of scanning the text
    #[arg(long, value_name = "CSS")]
    selector: Option<String>,

    /// Override the configured retry budget
    #[arg(long, value_name = "N")]
    max_retries: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let url = cli.url.as_deref().context("a URL is required")?;
    let sieve = Sieve::from_config(&config).context("failed to set up source")?;

    let mut options = FetchOptions::default();
    if let Some(max_retries) = cli.max_retries {
        options = options.with_max_retries(max_retries);
    }

    if cli.raw {
        let body = sieve
            .scheduler()
            .fetch_with_options(url, &options)
            .await
            .with_context(|| format!("failed to fetch {}", url))?;
        println!("{}", body);
        return Ok(());
    }

    let strategy = match cli.selector.as_deref() {
        Some(selector) => Strategy::Selector(selector),
        None => Strategy::Text,
    };

    let pages = sieve
        .pages_with(url, strategy, &options)
        .await
        .with_context(|| format!("failed to reconstruct pages of {}", url))?;

    for page in &pages {
        println!("{}", page);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("page_sieve=info,warn"),
            1 => EnvFilter::new("page_sieve=debug,info"),
            2 => EnvFilter::new("page_sieve=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows what every request would look like
fn handle_dry_run(config: &Config) {
    println!("=== Page-Sieve Dry Run ===\n");

    println!("Source:");
    println!("  Name: {}", config.source.name);
    println!("  Base URL: {}", config.source.base_url);

    println!("\nFetcher:");
    println!("  Minimum interval: {}ms", config.fetcher.min_interval_ms);
    println!("  Max retries: {}", config.fetcher.max_retries);
    println!("  Timeout: {}ms", config.fetcher.timeout_ms);
    println!(
        "  429 backoff: {}ms + up to {}ms jitter",
        config.fetcher.rate_limit_backoff_ms, config.fetcher.rate_limit_jitter_ms
    );
    println!("  503/504/reset backoff: {}ms", config.fetcher.retry_delay_ms);

    println!("\nRequest headers:");
    println!("  User-Agent: {}", config.headers.user_agent);
    println!("  Accept: {}", config.headers.accept);
    println!("  Accept-Language: {}", config.headers.accept_language);
    println!("  Referer: {}", config.referer());
    for (name, value) in &config.headers.extra {
        println!("  {}: {}", name, value);
    }

    println!("\nImage headers:");
    for (name, value) in image_headers(config).iter() {
        println!("  {}: {}", name, value.to_str().unwrap_or("<binary>"));
    }

    println!("\nExtraction:");
    println!("  Content hosts: {:?}", config.extract.content_hosts);
    println!("  Denylist: {:?}", config.extract.denylist);
    println!("  ID pattern: {}", config.extract.id_pattern);
    println!("  Extensions: {:?}", config.extract.extensions);
    println!("  Gap tolerance: {}", config.sequence.gap_tolerance);

    println!("\n✓ Configuration is valid");
}
