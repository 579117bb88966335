//! Append-only progress log
//!
//! The log is a plain text file holding one `<url>\t<status>\n` record per
//! state transition. It is never rewritten: loading replays it top to bottom
//! and the last record for a URL wins.

use crate::state::PageState;
use crate::storage::StorageError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// In-memory view of the log, keyed by URL in first-seen order
#[derive(Debug, Default)]
struct Entries {
    order: Vec<String>,
    states: HashMap<String, PageState>,
}

impl Entries {
    fn insert(&mut self, url: &str, state: PageState) {
        if self.states.insert(url.to_string(), state).is_none() {
            self.order.push(url.to_string());
        }
    }

    fn into_items(mut self) -> Vec<(String, PageState)> {
        self.order
            .into_iter()
            .filter_map(|url| {
                let state = self.states.remove(&url)?;
                Some((url, state))
            })
            .collect()
    }
}

/// Result of reading the log back
struct Replay {
    entries: Entries,
    /// Byte length of the complete lines, if a partial final line follows them
    torn_at: Option<u64>,
}

/// Reads and replays the log at `path`
async fn replay(path: &Path) -> Result<Replay, StorageError> {
    let mut entries = Entries::default();

    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No progress log at {}, starting empty", path.display());
            return Ok(Replay {
                entries,
                torn_at: None,
            });
        }
        Err(e) => return Err(e.into()),
    };

    let complete_len = content.rfind('\n').map_or(0, |i| i + 1);
    let (complete, tail) = content.split_at(complete_len);

    let mut records = 0;
    for (index, line) in complete.lines().enumerate() {
        let (url, state) = parse_record(line).ok_or_else(|| StorageError::MalformedRecord {
            path: path.to_path_buf(),
            line: index + 1,
            content: line.to_string(),
        })?;
        entries.insert(url, state);
        records += 1;
    }

    let torn_at = if tail.is_empty() {
        None
    } else {
        tracing::warn!(
            "Dropping unterminated record {:?} at the end of {}",
            tail,
            path.display()
        );
        Some(complete_len as u64)
    };

    tracing::debug!(
        "Replayed {} records ({} urls) from {}",
        records,
        entries.order.len(),
        path.display()
    );

    Ok(Replay { entries, torn_at })
}

/// Durable, crash-resumable map of URL to [`PageState`]
///
/// All writes go through [`ProgressStore::set`], which holds the writer lock
/// for the whole append-then-update sequence. Concurrent fetch tasks can
/// therefore share one store behind an `Arc` without interleaving partial
/// lines or reordering the in-memory state relative to the file.
#[derive(Debug)]
pub struct ProgressStore {
    path: PathBuf,
    entries: Mutex<Entries>,
    writer: tokio::sync::Mutex<File>,
}

impl ProgressStore {
    /// Replays the log at `path`, or starts empty if it does not exist
    ///
    /// The file (and its parent directory) is created if missing so that the
    /// first [`set`](Self::set) cannot fail on a missing directory. A final
    /// line without its newline is an append cut short by a crash: it is
    /// dropped and truncated away before the append handle is opened.
    ///
    /// # Errors
    ///
    /// * `StorageError::MalformedRecord` - a complete line does not have
    ///   exactly two tab-separated fields or carries an unknown status
    /// * `StorageError::Io` - the log could not be read or opened for append
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let replay = replay(&path).await?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        if let Some(complete_len) = replay.torn_at {
            OpenOptions::new()
                .write(true)
                .open(&path)
                .await?
                .set_len(complete_len)
                .await?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        Ok(Self {
            path,
            entries: Mutex::new(replay.entries),
            writer: tokio::sync::Mutex::new(file),
        })
    }

    /// Reads the log at `path` without opening it for writing
    ///
    /// Returns the latest state per URL in first-seen order; a missing file
    /// reads as empty and nothing is created on disk.
    pub async fn read_records(path: &Path) -> Result<Vec<(String, PageState)>, StorageError> {
        Ok(replay(path).await?.entries.into_items())
    }

    /// Path of the backing log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records `state` for `url`, appending one line to the log
    ///
    /// The line is flushed before the in-memory map changes, so a failed
    /// append leaves both views untouched.
    pub async fn set(&self, url: &str, state: PageState) -> Result<(), StorageError> {
        if url.is_empty() || url.contains(['\t', '\n', '\r']) {
            return Err(StorageError::InvalidKey(url.to_string()));
        }

        let line = format!("{}\t{}\n", url, state.to_log_string());

        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
        self.entries().insert(url, state);

        Ok(())
    }

    /// Returns true if no URL has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.entries().order.is_empty()
    }

    /// Number of distinct URLs recorded
    pub fn len(&self) -> usize {
        self.entries().order.len()
    }

    /// Latest state recorded for `url`
    pub fn get(&self, url: &str) -> Option<PageState> {
        self.entries().states.get(url).copied()
    }

    /// Snapshot of every URL with its latest state, in first-seen order
    pub fn items(&self) -> Vec<(String, PageState)> {
        let entries = self.entries();
        entries
            .order
            .iter()
            .filter_map(|url| entries.states.get(url).map(|state| (url.clone(), *state)))
            .collect()
    }

    /// Snapshot of every recorded URL, in first-seen order
    pub fn keys(&self) -> Vec<String> {
        self.entries().order.clone()
    }

    /// URLs whose latest state is not completed
    pub fn pending(&self) -> Vec<String> {
        self.items()
            .into_iter()
            .filter(|(_, state)| state.is_pending())
            .map(|(url, _)| url)
            .collect()
    }

    /// Number of URLs whose latest state is `state`
    pub fn count(&self, state: PageState) -> usize {
        self.entries()
            .states
            .values()
            .filter(|recorded| **recorded == state)
            .count()
    }

    fn entries(&self) -> MutexGuard<'_, Entries> {
        // Every mutation is a single insert, so a poisoned map is still consistent.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Splits one log line into its URL and state
fn parse_record(line: &str) -> Option<(&str, PageState)> {
    let mut fields = line.split('\t');
    let url = fields.next().filter(|url| !url.is_empty())?;
    let state = PageState::from_log_string(fields.next()?)?;
    if fields.next().is_some() {
        return None;
    }
    Some((url, state))
}
