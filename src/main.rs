//! Fanout-Crawler main entry point
//!
//! This is the command-line interface for the recursive crawler.

use anyhow::Context;
use clap::Parser;
use fanout_crawler::config::{load_config, validate, Config};
use fanout_crawler::output::{print_statistics, print_urls, CrawlStatistics};
use fanout_crawler::Crawler;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Fanout-Crawler: a bounded-parallelism recursive web crawler
///
/// Downloads the root URL, extracts its links and follows them down to the
/// given depth, with a fixed number of download and extract workers and a
/// cap on concurrent fetches per host.
#[derive(Parser, Debug)]
#[command(name = "fanout-crawler")]
#[command(version)]
#[command(about = "A bounded-parallelism recursive web crawler", long_about = None)]
struct Cli {
    /// Root URL to start crawling from
    #[arg(value_name = "URL")]
    url: String,

    /// Maximum crawl depth (the root URL is depth 1)
    #[arg(short, long)]
    depth: Option<u32>,

    /// Number of download workers
    #[arg(long)]
    downloads: Option<usize>,

    /// Number of link extraction workers
    #[arg(long)]
    extractors: Option<usize>,

    /// Maximum concurrent downloads per host
    #[arg(long)]
    per_host: Option<usize>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// List every downloaded and failed URL
    #[arg(short, long)]
    list: bool,

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

    let config = resolve_config(&cli)?;
    let max_depth = config.crawler.max_depth;

    let crawler = Crawler::with_http(&config).context("Failed to start crawler")?;

    // First Ctrl-C returns a partial result instead of killing the process
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, returning partial result");
            on_interrupt.cancel();
        }
    });

    let result = crawler
        .crawl_with_cancellation(&cli.url, max_depth, cancel)
        .await;
    crawler.close();

    if cli.list {
        print_urls(&result);
        println!();
    }
    print_statistics(&CrawlStatistics::from_result(&result));

    Ok(())
}

/// Loads the config file if given, then applies command-line overrides
fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(depth) = cli.depth {
        config.crawler.max_depth = depth;
    }
    if let Some(downloads) = cli.downloads {
        config.crawler.downloads = downloads;
    }
    if let Some(extractors) = cli.extractors {
        config.crawler.extractors = extractors;
    }
    if let Some(per_host) = cli.per_host {
        config.crawler.per_host = per_host;
    }

    validate(&config).context("Invalid crawler settings")?;
    Ok(config)
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("fanout_crawler=info,warn"),
            1 => EnvFilter::new("fanout_crawler=debug,info"),
            2 => EnvFilter::new("fanout_crawler=trace,debug"),
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
