//! Crawl executor - one full crawl pass
//!
//! A pass runs in three steps:
//! 1. Seed the progress log from the menu tree (only when the log is empty)
//! 2. Fetch every pending URL behind a fixed-size concurrency gate
//! 3. Hand back a document stream over every URL the log knows about
//!
//! All fetches are multiplexed onto the calling task; the gate is the only
//! backpressure. Completion order is whatever the network makes it.

use crate::config::{Config, CrawlerConfig, SiteConfig};
use crate::crawler::documents::{DocumentSource, DocumentStream};
use crate::crawler::fetcher::{FetchError, HttpFetcher};
use crate::crawler::retry::{RetryPolicy, RetryingFetcher};
use crate::menu::MenuEntry;
use crate::state::PageState;
use crate::storage::{PageStore, ProgressStore};
use crate::{ConfigError, HarvestError};
use futures::future::{join_all, try_join_all};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use url::Url;

/// How a batch reacts to a URL that exhausts its retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    /// Record the failure, keep fetching the rest, report every failed URL
    #[default]
    CollectAll,

    /// Abort the batch on the first failure; unstarted fetches are abandoned
    FailFast,
}

/// Tunables for one executor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlSettings {
    /// Maximum simultaneous in-flight fetches
    pub max_concurrent_fetches: usize,
    pub failure_mode: FailureMode,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: 10,
            failure_mode: FailureMode::CollectAll,
        }
    }
}

impl From<&CrawlerConfig> for CrawlSettings {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            max_concurrent_fetches: config.max_concurrent_fetches as usize,
            failure_mode: if config.fail_fast {
                FailureMode::FailFast
            } else {
                FailureMode::CollectAll
            },
        }
    }
}

/// A URL that used up all its attempts during this pass
#[derive(Debug)]
pub struct FailedFetch {
    pub url: String,
    pub attempts: u32,
    pub error: FetchError,
}

/// Result of a crawl pass
pub struct CrawlOutcome {
    /// URLs newly queued by seeding (0 when the log already had records)
    pub seeded: usize,

    /// URLs fetched and recorded as completed during this pass
    pub fetched: Vec<String>,

    /// URLs recorded as failed during this pass
    pub failed: Vec<FailedFetch>,

    /// Documents for every URL in the progress log, in first-seen order
    pub documents: DocumentStream,
}

impl CrawlOutcome {
    /// True if no URL failed during this pass
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Debug for CrawlOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrawlOutcome")
            .field("seeded", &self.seeded)
            .field("fetched", &self.fetched)
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}

/// Drives seeding, bounded fetching and completion recording
pub struct CrawlExecutor {
    base_url: Url,
    settings: CrawlSettings,
    progress: Arc<ProgressStore>,
    pages: PageStore,
    fetcher: RetryingFetcher,
}

impl CrawlExecutor {
    pub fn new(
        base_url: Url,
        settings: CrawlSettings,
        progress: Arc<ProgressStore>,
        pages: PageStore,
        fetcher: RetryingFetcher,
    ) -> Self {
        Self {
            base_url,
            settings,
            progress,
            pages,
            fetcher,
        }
    }

    /// Builds an HTTP-backed executor from configuration
    ///
    /// Replays the progress log as part of construction, so a corrupted log
    /// fails here before any network traffic.
    pub async fn from_config(config: &Config) -> Result<Self, HarvestError> {
        let base_url = Url::parse(&config.site.base_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid base-url '{}': {}", config.site.base_url, e))
        })?;

        let progress = ProgressStore::load(&config.storage.progress_log_path).await?;
        let pages = PageStore::new(&config.storage.page_dir);

        Ok(Self::new(
            base_url,
            CrawlSettings::from(&config.crawler),
            Arc::new(progress),
            pages,
            http_fetcher(&config.crawler)?,
        ))
    }

    pub fn progress(&self) -> &Arc<ProgressStore> {
        &self.progress
    }

    pub fn pages(&self) -> &PageStore {
        &self.pages
    }

    pub fn fetcher(&self) -> &RetryingFetcher {
        &self.fetcher
    }

    /// Fully-qualified URL for a menu href
    ///
    /// Site-relative hrefs are appended to the base URL, keeping any path it
    /// has, so pages resolve under the same prefix as the home page.
    pub fn qualify(&self, href: &str) -> Result<Url, url::ParseError> {
        SiteConfig::resolve_href(self.base_url.as_str(), href)
    }

    /// Queues every menu URL, parents before children, if the log is empty
    ///
    /// Seeding happens once: as soon as the log holds any record it is
    /// skipped, even if the menu has grown since. Returns the number of URLs
    /// queued.
    pub async fn seed(&self, menu: &[MenuEntry]) -> Result<usize, HarvestError> {
        if !self.progress.is_empty() {
            tracing::info!(
                "Progress log already holds {} urls, skipping seeding",
                self.progress.len()
            );
            return Ok(0);
        }

        let mut queued = 0;
        for entry in MenuEntry::depth_first(menu) {
            let url = match self.qualify(&entry.href) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!("Skipping menu entry {:?} ({}): {}", entry.name, entry.href, e);
                    continue;
                }
            };

            if self.progress.get(url.as_str()).is_some() {
                tracing::debug!("{} appears more than once in the menu", url);
                continue;
            }

            self.progress.set(url.as_str(), PageState::Queued).await?;
            queued += 1;
        }

        tracing::info!("Seeded {} urls from the menu", queued);
        Ok(queued)
    }

    /// Runs one crawl pass over `menu`
    ///
    /// # Errors
    ///
    /// * Storage errors always abort the pass.
    /// * In [`FailureMode::FailFast`], the first URL to exhaust its retries
    ///   aborts the pass with `HarvestError::RetryExhausted`. URLs completed
    ///   before that point stay recorded, so a re-run only retries the rest.
    pub async fn run(&self, menu: &[MenuEntry]) -> Result<CrawlOutcome, HarvestError> {
        let seeded = self.seed(menu).await?;

        let pending = self.progress.pending();
        tracing::info!(
            "Get {} urls, {} pending",
            self.progress.len(),
            pending.len()
        );

        let (fetched, failed) = self.fetch_all(pending).await?;

        if failed.is_empty() {
            tracing::info!("Crawl pass finished: {} fetched", fetched.len());
        } else {
            tracing::warn!(
                "Crawl pass finished: {} fetched, {} failed",
                fetched.len(),
                failed.len()
            );
        }

        Ok(CrawlOutcome {
            seeded,
            fetched,
            failed,
            documents: self.documents(),
        })
    }

    /// Documents for every URL currently in the progress log
    pub fn documents(&self) -> DocumentStream {
        DocumentSource::new(self.pages.clone()).stream(self.progress.keys())
    }

    /// Fetches `pending` behind the concurrency gate
    async fn fetch_all(
        &self,
        pending: Vec<String>,
    ) -> Result<(Vec<String>, Vec<FailedFetch>), HarvestError> {
        let gate = Semaphore::new(self.settings.max_concurrent_fetches.max(1));
        let total = pending.len();
        let done = AtomicUsize::new(0);
        tracing::info!("Processing {} tasks...", total);

        let tasks = pending
            .into_iter()
            .map(|url| self.process(url, &gate, &done, total));

        match self.settings.failure_mode {
            FailureMode::FailFast => Ok((try_join_all(tasks).await?, Vec::new())),
            FailureMode::CollectAll => {
                let mut fetched = Vec::new();
                let mut failed = Vec::new();
                for result in join_all(tasks).await {
                    match result {
                        Ok(url) => fetched.push(url),
                        Err(HarvestError::RetryExhausted {
                            url,
                            attempts,
                            source,
                        }) => failed.push(FailedFetch {
                            url,
                            attempts,
                            error: source,
                        }),
                        Err(other) => return Err(other),
                    }
                }
                Ok((fetched, failed))
            }
        }
    }

    /// Fetches one URL, persists its body and records completion
    ///
    /// The gate slot is held only for the network fetch, not the writes.
    async fn process(
        &self,
        url: String,
        gate: &Semaphore,
        done: &AtomicUsize,
        total: usize,
    ) -> Result<String, HarvestError> {
        let fetched = {
            let _permit = gate.acquire().await?;
            self.fetcher.fetch(&url).await
        };

        let body = match fetched {
            Ok(body) => body,
            Err(e) => {
                self.progress.set(&url, PageState::Failed).await?;
                return Err(e);
            }
        };

        self.pages.write(&url, &body).await?;
        self.progress.set(&url, PageState::Completed).await?;

        let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
        if finished % 10 == 0 || finished == total {
            tracing::info!("Progress: {}/{} pages fetched", finished, total);
        } else {
            tracing::debug!("Fetched {}", url);
        }

        Ok(url)
    }
}

/// Retrying HTTP fetcher built from crawler configuration
pub fn http_fetcher(config: &CrawlerConfig) -> Result<RetryingFetcher, HarvestError> {
    let policy = RetryPolicy::new(config.max_attempts).with_delay(config.retry_delay());
    Ok(RetryingFetcher::new(Arc::new(HttpFetcher::new(config)?), policy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::PageFetcher;
    use async_trait::async_trait;
    use futures::StreamExt;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    const BASE: &str = "https://docs.test";

    /// Serves canned bodies, counts calls, tracks peak concurrency
    #[derive(Default)]
    struct ScriptedFetcher {
        failing: HashSet<String>,
        delay: Duration,
        calls: Mutex<HashMap<String, u32>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ScriptedFetcher {
        fn failing(urls: &[&str]) -> Self {
            Self {
                failing: urls.iter().map(|u| u.to_string()).collect(),
                ..Self::default()
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::default()
            }
        }

        fn calls(&self, url: &str) -> u32 {
            self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
        }

        fn total_calls(&self) -> u32 {
            self.calls.lock().unwrap().values().sum()
        }
    }

    #[async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing.contains(url) {
                Err(FetchError::other(format!("{url} is down")))
            } else {
                Ok(format!("<html><body>{url}</body></html>"))
            }
        }
    }

    struct Harness {
        _dir: TempDir,
        fetcher: Arc<ScriptedFetcher>,
        executor: CrawlExecutor,
    }

    async fn harness(fetcher: ScriptedFetcher, settings: CrawlSettings) -> Harness {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(fetcher);
        let executor = build_executor(&dir, fetcher.clone(), settings).await;
        Harness {
            _dir: dir,
            fetcher,
            executor,
        }
    }

    async fn build_executor(
        dir: &TempDir,
        fetcher: Arc<ScriptedFetcher>,
        settings: CrawlSettings,
    ) -> CrawlExecutor {
        let progress = ProgressStore::load(dir.path().join("wal/doc_log.log"))
            .await
            .unwrap();
        CrawlExecutor::new(
            Url::parse(BASE).unwrap(),
            settings,
            Arc::new(progress),
            PageStore::new(dir.path().join("html")),
            RetryingFetcher::new(fetcher, RetryPolicy::new(3)),
        )
    }

    fn abc_menu() -> Vec<MenuEntry> {
        vec![MenuEntry::new("A", "/a/").with_children(vec![
            MenuEntry::new("B", "/a/b/"),
            MenuEntry::new("C", "/a/c/"),
        ])]
    }

    fn flat_menu(n: usize) -> Vec<MenuEntry> {
        (0..n)
            .map(|i| MenuEntry::new(format!("Page {i}"), format!("/p/{i}/")))
            .collect()
    }

    fn url(path: &str) -> String {
        format!("{BASE}{path}")
    }

    #[tokio::test]
    async fn test_seed_records_tree_in_depth_first_order() {
        let h = harness(ScriptedFetcher::default(), CrawlSettings::default()).await;

        let seeded = h.executor.seed(&abc_menu()).await.unwrap();

        assert_eq!(seeded, 3);
        assert_eq!(
            h.executor.progress().items(),
            vec![
                (url("/a/"), PageState::Queued),
                (url("/a/b/"), PageState::Queued),
                (url("/a/c/"), PageState::Queued),
            ]
        );
    }

    #[tokio::test]
    async fn test_seed_skipped_once_log_has_records() {
        let h = harness(ScriptedFetcher::default(), CrawlSettings::default()).await;
        h.executor.seed(&abc_menu()).await.unwrap();

        let mut grown = abc_menu();
        grown.push(MenuEntry::new("D", "/d/"));
        let seeded = h.executor.seed(&grown).await.unwrap();

        assert_eq!(seeded, 0);
        assert_eq!(h.executor.progress().len(), 3);
        assert_eq!(h.executor.progress().get(&url("/d/")), None);
    }

    #[tokio::test]
    async fn test_seed_deduplicates_repeated_hrefs() {
        let h = harness(ScriptedFetcher::default(), CrawlSettings::default()).await;
        let menu = vec![
            MenuEntry::new("A", "/a/").with_children(vec![MenuEntry::new("A again", "/a/")]),
        ];

        assert_eq!(h.executor.seed(&menu).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_crawl_marks_all_completed_and_streams_documents() {
        let h = harness(ScriptedFetcher::default(), CrawlSettings::default()).await;

        let outcome = h.executor.run(&abc_menu()).await.unwrap();

        assert_eq!(outcome.seeded, 3);
        assert_eq!(outcome.fetched.len(), 3);
        assert!(outcome.is_complete());
        assert!(h
            .executor
            .progress()
            .items()
            .iter()
            .all(|(_, state)| *state == PageState::Completed));

        let docs: Vec<_> = outcome.documents.collect().await;
        let docs: Vec<_> = docs.into_iter().map(Result::unwrap).collect();
        assert_eq!(docs.len(), 3);
        for (doc, path) in docs.iter().zip(["/a/", "/a/b/", "/a/c/"]) {
            assert_eq!(doc.url, url(path));
            assert_eq!(doc.html, format!("<html><body>{}</body></html>", url(path)));
        }
    }

    #[tokio::test]
    async fn test_second_run_fetches_nothing() {
        let dir = TempDir::new().unwrap();
        let first = Arc::new(ScriptedFetcher::default());
        build_executor(&dir, first.clone(), CrawlSettings::default())
            .await
            .run(&abc_menu())
            .await
            .unwrap();
        assert_eq!(first.total_calls(), 3);

        let second = Arc::new(ScriptedFetcher::default());
        let outcome = build_executor(&dir, second.clone(), CrawlSettings::default())
            .await
            .run(&abc_menu())
            .await
            .unwrap();

        assert_eq!(second.total_calls(), 0);
        assert_eq!(outcome.seeded, 0);
        assert!(outcome.fetched.is_empty());
        // Documents still cover every known URL
        assert_eq!(outcome.documents.count().await, 3);
    }

    #[tokio::test]
    async fn test_concurrency_cap_is_respected() {
        let settings = CrawlSettings {
            max_concurrent_fetches: 2,
            ..CrawlSettings::default()
        };
        let h = harness(ScriptedFetcher::slow(Duration::from_millis(20)), settings).await;

        let outcome = h.executor.run(&flat_menu(10)).await.unwrap();

        assert_eq!(outcome.fetched.len(), 10);
        assert_eq!(h.fetcher.peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_url_collected_and_rest_completed() {
        let h = harness(
            ScriptedFetcher::failing(&[&url("/a/b/")]),
            CrawlSettings::default(),
        )
        .await;

        let outcome = h.executor.run(&abc_menu()).await.unwrap();

        assert_eq!(outcome.fetched.len(), 2);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].url, url("/a/b/"));
        assert_eq!(outcome.failed[0].attempts, 3);
        assert_eq!(h.fetcher.calls(&url("/a/b/")), 3);

        let progress = h.executor.progress();
        assert_eq!(progress.get(&url("/a/b/")), Some(PageState::Failed));
        assert_eq!(progress.get(&url("/a/c/")), Some(PageState::Completed));
        assert_eq!(progress.pending(), vec![url("/a/b/")]);
    }

    #[tokio::test]
    async fn test_failed_url_retried_on_next_run() {
        let dir = TempDir::new().unwrap();
        let flaky = Arc::new(ScriptedFetcher::failing(&[&url("/a/c/")]));
        build_executor(&dir, flaky, CrawlSettings::default())
            .await
            .run(&abc_menu())
            .await
            .unwrap();

        let healthy = Arc::new(ScriptedFetcher::default());
        let outcome = build_executor(&dir, healthy.clone(), CrawlSettings::default())
            .await
            .run(&abc_menu())
            .await
            .unwrap();

        assert_eq!(outcome.fetched, vec![url("/a/c/")]);
        assert_eq!(healthy.total_calls(), 1);
        assert!(outcome.is_complete());
    }

    #[tokio::test]
    async fn test_fail_fast_aborts_batch() {
        let settings = CrawlSettings {
            max_concurrent_fetches: 1,
            failure_mode: FailureMode::FailFast,
        };
        let h = harness(ScriptedFetcher::failing(&[&url("/p/0/")]), settings).await;

        let err = h.executor.run(&flat_menu(5)).await.unwrap_err();

        assert!(matches!(
            err,
            HarvestError::RetryExhausted { ref url, .. } if url.ends_with("/p/0/")
        ));
        let progress = h.executor.progress();
        assert_eq!(progress.get(&url("/p/0/")), Some(PageState::Failed));
        // The batch stopped before every other URL was recorded
        assert!(progress.count(PageState::Completed) < 4);
        assert!(progress.pending().len() > 1);
    }

    #[tokio::test]
    async fn test_base_url_path_is_kept_for_pages() {
        let dir = TempDir::new().unwrap();
        let progress = ProgressStore::load(dir.path().join("doc_log.log")).await.unwrap();
        let executor = CrawlExecutor::new(
            Url::parse("https://mirror.test/k8s").unwrap(),
            CrawlSettings::default(),
            Arc::new(progress),
            PageStore::new(dir.path().join("html")),
            RetryingFetcher::new(Arc::new(ScriptedFetcher::default()), RetryPolicy::new(1)),
        );
        let menu = vec![MenuEntry::new("Concepts", "/zh-cn/docs/concepts/")];

        executor.seed(&menu).await.unwrap();

        assert_eq!(
            executor.progress().keys(),
            vec!["https://mirror.test/k8s/zh-cn/docs/concepts/".to_string()]
        );
    }

    #[tokio::test]
    async fn test_unresolvable_href_is_skipped() {
        let h = harness(ScriptedFetcher::default(), CrawlSettings::default()).await;
        let menu = vec![
            MenuEntry::new("Broken", "http://[::1"),
            MenuEntry::new("Fine", "/fine/"),
        ];

        assert_eq!(h.executor.seed(&menu).await.unwrap(), 1);
        assert_eq!(h.executor.progress().keys(), vec![url("/fine/")]);
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = CrawlerConfig::default();
        config.max_concurrent_fetches = 4;
        config.fail_fast = true;

        let settings = CrawlSettings::from(&config);
        assert_eq!(settings.max_concurrent_fetches, 4);
        assert_eq!(settings.failure_mode, FailureMode::FailFast);
    }
}
