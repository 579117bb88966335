//! Document stream over persisted pages

use crate::storage::{PageStore, StorageError};
use futures::stream::{self, BoxStream, StreamExt};

/// One fetched page, read back from storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub url: String,
    pub html: String,
}

/// Lazy, one-shot sequence of documents
pub type DocumentStream = BoxStream<'static, Result<Document, StorageError>>;

/// Reads persisted page bodies back as [`Document`]s
///
/// The source does not consult the progress log: a URL without a stored body
/// yields `StorageError::PageMissing` in its slot rather than being skipped.
#[derive(Debug, Clone)]
pub struct DocumentSource {
    pages: PageStore,
}

impl DocumentSource {
    pub fn new(pages: PageStore) -> Self {
        Self { pages }
    }

    /// Streams the documents for `urls`, reading each file only when polled
    ///
    /// Calling this again with the same URLs restarts from the beginning.
    pub fn stream(&self, urls: Vec<String>) -> DocumentStream {
        let pages = self.pages.clone();
        stream::iter(urls)
            .then(move |url| {
                let pages = pages.clone();
                async move { pages.read(&url).await.map(|html| Document { url, html }) }
            })
            .boxed()
    }
}
