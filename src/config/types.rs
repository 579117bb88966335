use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Main configuration structure for Doc-Harvest
///
/// Every key has a default, so an empty file (or no file at all) is a valid
/// configuration targeting the default documentation site.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub crawler: CrawlerConfig,
    pub storage: StorageConfig,
}

/// The documentation site being harvested
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Prefix every menu href is resolved against
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Path of the page whose navigation menu seeds the crawl
    #[serde(rename = "home-path")]
    pub home_path: String,

    /// CSS selector for the top-level navigation list
    #[serde(rename = "nav-selector")]
    pub nav_selector: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://kubernetes.io".to_string(),
            home_path: "/zh-cn/docs/home".to_string(),
            nav_selector: "ul.ul-1".to_string(),
        }
    }
}

impl SiteConfig {
    /// Full URL of the menu-bearing home page
    pub fn home_url(&self) -> String {
        prefixed(&self.base_url, &self.home_path)
    }

    /// Full URL of a page linked from the menu
    pub fn page_url(&self, href: &str) -> Result<Url, url::ParseError> {
        Self::resolve_href(&self.base_url, href)
    }

    /// Resolves a menu href against `base` the same way [`home_url`](Self::home_url) does
    ///
    /// Site-relative hrefs are appended to `base`, so any path in `base` is
    /// kept. Absolute hrefs are returned unchanged.
    pub fn resolve_href(base: &str, href: &str) -> Result<Url, url::ParseError> {
        match Url::parse(href) {
            Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(&prefixed(base, href)),
            other => other,
        }
    }
}

fn prefixed(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of simultaneous in-flight fetches
    #[serde(rename = "max-concurrent-fetches")]
    pub max_concurrent_fetches: u32,

    /// Attempts per URL before giving up
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Fixed pause between attempts (milliseconds)
    #[serde(rename = "retry-delay-ms")]
    pub retry_delay_ms: u64,

    /// Whole-request timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Connection establishment timeout (seconds)
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// Abort the remaining batch on the first URL that exhausts its retries
    #[serde(rename = "fail-fast")]
    pub fail_fast: bool,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: 10,
            max_attempts: 3,
            retry_delay_ms: 0,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            fail_fast: false,
            user_agent: format!("doc-harvest/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl CrawlerConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Local storage locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON cache of the discovered menu tree
    #[serde(rename = "menu-cache-path")]
    pub menu_cache_path: PathBuf,

    /// Append-only progress log
    #[serde(rename = "progress-log-path")]
    pub progress_log_path: PathBuf,

    /// Directory holding one file per fetched page
    #[serde(rename = "page-dir")]
    pub page_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            menu_cache_path: PathBuf::from("data/menu.json"),
            progress_log_path: PathBuf::from("data/wal/doc_log.log"),
            page_dir: PathBuf::from("data/html"),
        }
    }
}
