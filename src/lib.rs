//! Doc-Harvest: a resumable documentation site crawler
//!
//! This crate discovers a documentation site's navigation menu, expands it into
//! a flat set of page URLs, fetches every page with bounded concurrency, and
//! records progress in an append-only log so that a re-run resumes instead of
//! re-fetching.

pub mod config;
pub mod crawler;
pub mod menu;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Doc-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Menu error: {0}")]
    Menu(#[from] menu::MenuError),

    #[error("Giving up on {url} after {attempts} attempts: {source}")]
    RetryExhausted {
        url: String,
        attempts: u32,
        source: crawler::FetchError,
    },

    #[error("Concurrency gate closed: {0}")]
    GateClosed(#[from] tokio::sync::AcquireError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Doc-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlExecutor, CrawlOutcome, Document};
pub use menu::MenuEntry;
pub use state::PageState;
pub use storage::{PageStore, ProgressStore};
