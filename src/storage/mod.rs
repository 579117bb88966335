//! Storage module for persisting crawl data
//!
//! This module handles everything the crawler keeps on disk:
//! - The append-only progress log recording which URLs are queued or done
//! - One file per fetched page body

mod pages;
mod progress;

pub use pages::PageStore;
pub use progress::ProgressStore;

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Malformed progress record at {}:{line}: {content:?}", path.display())]
    MalformedRecord {
        path: PathBuf,
        line: usize,
        content: String,
    },

    #[error("URL cannot be stored in the progress log: {0:?}")]
    InvalidKey(String),

    #[error("No stored page for {url} (expected {})", path.display())]
    PageMissing { url: String, path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
