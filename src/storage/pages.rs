//! Page body storage
//!
//! One file per URL under a single directory. The file name is the URL with
//! path separators replaced, plus an `.html` suffix.

use crate::storage::StorageError;
use std::path::{Path, PathBuf};

/// File-per-URL store for fetched page markup
#[derive(Debug, Clone)]
pub struct PageStore {
    dir: PathBuf,
}

impl PageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Filesystem-safe file name for `url`
    ///
    /// ```
    /// use doc_harvest::storage::PageStore;
    ///
    /// assert_eq!(
    ///     PageStore::file_name_for("https://kubernetes.io/docs/home/"),
    ///     "https:--kubernetes.io-docs-home-.html"
    /// );
    /// ```
    pub fn file_name_for(url: &str) -> String {
        format!("{}.html", url.replace(['/', '\\'], "-"))
    }

    /// Full path the body of `url` is stored at
    pub fn path_for(&self, url: &str) -> PathBuf {
        self.dir.join(Self::file_name_for(url))
    }

    /// Writes the body for `url`, replacing any previous body
    ///
    /// The content goes to a sibling `.part` file first and is renamed into
    /// place, so a reader never sees a truncated page.
    pub async fn write(&self, url: &str, html: &str) -> Result<PathBuf, StorageError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let target = self.path_for(url);
        let partial = target.with_extension("html.part");
        tokio::fs::write(&partial, html).await?;
        tokio::fs::rename(&partial, &target).await?;

        tracing::trace!("Stored {} bytes for {} at {}", html.len(), url, target.display());
        Ok(target)
    }

    /// Reads the stored body for `url`
    ///
    /// # Errors
    ///
    /// * `StorageError::PageMissing` - nothing has been stored for `url`
    pub async fn read(&self, url: &str) -> Result<String, StorageError> {
        let path = self.path_for(url);
        match tokio::fs::read_to_string(&path).await {
            Ok(html) => Ok(html),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::PageMissing {
                url: url.to_string(),
                path,
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns true if a body is stored for `url`
    pub async fn contains(&self, url: &str) -> bool {
        tokio::fs::try_exists(self.path_for(url)).await.unwrap_or(false)
    }
}
