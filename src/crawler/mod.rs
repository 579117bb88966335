//! Crawler module for page fetching and crawl orchestration
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind a fixed-attempt retry policy
//! - The crawl executor: seeding, bounded-concurrency fetching, completion
//! - Streaming persisted pages back as documents

mod documents;
mod executor;
mod fetcher;
mod retry;
mod timing;

pub use documents::{Document, DocumentSource, DocumentStream};
pub use executor::{
    http_fetcher, CrawlExecutor, CrawlOutcome, CrawlSettings, FailedFetch, FailureMode,
};
pub use fetcher::{build_http_client, normalize_markup, FetchError, HttpFetcher, PageFetcher};
pub use retry::{Exhausted, RetryPolicy, RetryingFetcher};
pub use timing::timed;

use crate::config::Config;
use crate::menu::load_or_discover_menu;
use crate::HarvestError;
use tracing::Instrument;

/// Runs a complete harvest
///
/// This is the main entry point for a crawl. It will:
/// 1. Load the menu from cache, or discover it from the site
/// 2. Replay the progress log
/// 3. Seed it from the menu if it is empty
/// 4. Fetch every pending page with bounded concurrency
/// 5. Return the outcome with a document stream over every known page
///
/// # Example
///
/// ```no_run
/// use doc_harvest::config::Config;
/// use doc_harvest::crawler::harvest;
///
/// # async fn example() -> Result<(), doc_harvest::HarvestError> {
/// let outcome = harvest(&Config::default()).await?;
/// println!("{} fetched, {} failed", outcome.fetched.len(), outcome.failed.len());
/// # Ok(())
/// # }
/// ```
pub async fn harvest(config: &Config) -> Result<CrawlOutcome, HarvestError> {
    let span = tracing::info_span!("harvest", site = %config.site.base_url);

    async {
        let executor = CrawlExecutor::from_config(config).await?;

        let menu_cache = &config.storage.menu_cache_path;
        let menu = timed(
            "load menu",
            load_or_discover_menu(&config.site, menu_cache, executor.fetcher()),
        )
        .await?;

        timed("crawl pass", executor.run(&menu)).await
    }
    .instrument(span)
    .await
}
