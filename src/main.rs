//! Doc-Harvest main entry point
//!
//! This is the command-line interface for the Doc-Harvest documentation crawler.

use anyhow::{bail, Context};
use clap::Parser;
use doc_harvest::config::{load_config_with_hash, validate, Config};
use doc_harvest::crawler::{harvest, http_fetcher, CrawlOutcome};
use doc_harvest::menu::{load_or_discover_menu, render_tree, MenuEntry};
use doc_harvest::output::{print_statistics, read_statistics};
use doc_harvest::storage::StorageError;
use futures::StreamExt;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Doc-Harvest: a resumable documentation site crawler
///
/// Doc-Harvest reads a documentation site's navigation menu, fetches every
/// page it links to with bounded concurrency, and keeps an append-only
/// progress log so an interrupted run picks up where it stopped.
#[derive(Parser, Debug)]
#[command(name = "doc-harvest")]
#[command(version)]
#[command(about = "A resumable documentation site crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Print the navigation menu as a tree and exit
    #[arg(long, conflicts_with = "stats")]
    print_menu: bool,

    /// Show statistics from the progress log and exit
    #[arg(long, conflicts_with = "print_menu")]
    stats: bool,

    /// Override the maximum number of simultaneous fetches
    #[arg(long, value_name = "N")]
    concurrency: Option<u32>,

    /// Abort the pass on the first URL that exhausts its retries
    #[arg(long)]
    fail_fast: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load(&cli)?;

    if cli.stats {
        handle_stats(&config).await
    } else if cli.print_menu {
        handle_print_menu(&config).await
    } else {
        handle_crawl(&config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("doc_harvest=info,warn"),
            1 => EnvFilter::new("doc_harvest=debug,info"),
            2 => EnvFilter::new("doc_harvest=trace,debug"),
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

/// Loads the configuration file (or defaults) and applies CLI overrides
fn load(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    if let Some(n) = cli.concurrency {
        config.crawler.max_concurrent_fetches = n;
    }
    if cli.fail_fast {
        config.crawler.fail_fast = true;
    }

    validate(&config).context("Invalid configuration")?;
    Ok(config)
}

/// Handles the --stats mode: counts progress log records by state
async fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let path = &config.storage.progress_log_path;
    println!("Progress log: {}\n", path.display());

    print_statistics(&read_statistics(path).await?);

    Ok(())
}

/// Handles the --print-menu mode: renders the cached or discovered menu
async fn handle_print_menu(config: &Config) -> anyhow::Result<()> {
    let fetcher = http_fetcher(&config.crawler)?;
    let menu =
        load_or_discover_menu(&config.site, &config.storage.menu_cache_path, &fetcher).await?;

    print!("{}", render_tree(&menu));
    println!("\n{} entries", MenuEntry::count(&menu));

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config) -> anyhow::Result<()> {
    tracing::info!(
        "Harvesting {} with up to {} concurrent fetches",
        config.site.home_url(),
        config.crawler.max_concurrent_fetches
    );

    let outcome = match harvest(config).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    let CrawlOutcome {
        seeded,
        fetched,
        failed,
        mut documents,
    } = outcome;

    let mut available = 0usize;
    let mut missing = 0usize;
    while let Some(document) = documents.next().await {
        match document {
            Ok(_) => available += 1,
            Err(StorageError::PageMissing { url, .. }) => {
                tracing::debug!("No page on disk for {}", url);
                missing += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    println!("=== Harvest Summary ===\n");
    println!("  Seeded: {}", seeded);
    println!("  Fetched this run: {}", fetched.len());
    println!("  Failed this run: {}", failed.len());
    println!("  Documents on disk: {}", available);
    println!("  Documents missing: {}", missing);

    if !failed.is_empty() {
        println!("\nFailed urls:");
        for failure in &failed {
            println!("  - {} ({} attempts): {}", failure.url, failure.attempts, failure.error);
        }
        bail!("{} urls could not be fetched; re-run to retry them", failed.len());
    }

    Ok(())
}
