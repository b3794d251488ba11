//! Kumo main entry point
//!
//! Command-line interface for the Kumo web crawler.

use clap::Parser;
use kumo::config::{load_config_with_hash, Config};
use kumo::crawler::{Crawler, HttpDownloader};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Kumo: a concurrent, depth-bounded web crawler
///
/// Downloads the given URL and recursively follows its links up to DEPTH
/// hops, bounding simultaneous downloads per host. Prints the downloaded
/// URLs and any per-URL failures.
#[derive(Parser, Debug)]
#[command(name = "kumo")]
#[command(version)]
#[command(about = "A concurrent, depth-bounded web crawler", long_about = None)]
struct Cli {
    /// Seed URL to crawl
    #[arg(value_name = "URL")]
    url: String,

    /// Hop budget: 1 downloads only the seed URL
    #[arg(value_name = "DEPTH", default_value_t = 1)]
    depth: u32,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the number of download workers
    #[arg(long, value_name = "N")]
    downloaders: Option<usize>,

    /// Override the number of extraction workers
    #[arg(long, value_name = "N")]
    extractors: Option<usize>,

    /// Override the per-host concurrent download limit
    #[arg(long, value_name = "N")]
    per_host: Option<usize>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    // Load configuration, or fall back to defaults when no file is given
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    // CLI flags win over the config file
    if let Some(n) = cli.downloaders {
        config.crawler.download_workers = n;
    }
    if let Some(n) = cli.extractors {
        config.crawler.extract_workers = n;
    }
    if let Some(n) = cli.per_host {
        config.crawler.max_per_host = n;
    }

    let downloader = HttpDownloader::new(&config.user_agent, config.crawler.request_timeout_ms)?;
    let crawler = Crawler::new(Arc::new(downloader), &config.crawler)?;

    let result = crawler.download(&cli.url, cli.depth).await;
    crawler.close();

    println!("Downloaded {} pages", result.downloaded.len());
    for url in &result.downloaded {
        println!("  {}", url);
    }

    if !result.errors.is_empty() {
        println!("Failed {} pages", result.errors.len());
        let mut failed: Vec<_> = result.errors.iter().collect();
        failed.sort_by_key(|(url, _)| url.to_string());
        for (url, error) in failed {
            println!("  {}: {}", url, error);
        }
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("kumo=info,warn"),
            1 => EnvFilter::new("kumo=debug,info"),
            2 => EnvFilter::new("kumo=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
