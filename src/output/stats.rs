//! Statistics from the progress log
//!
//! This module provides functionality for summarizing crawl progress without
//! touching the network.

use crate::state::PageState;
use crate::storage::{ProgressStore, StorageError};
use std::path::Path;

/// Crawl progress summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressStatistics {
    /// Total number of distinct URLs recorded
    pub total: usize,
    pub completed: usize,
    pub queued: usize,
    pub failed: usize,
}

impl ProgressStatistics {
    /// Share of recorded URLs that are completed, as a percentage
    pub fn completion_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.completed as f64 / self.total as f64) * 100.0
        }
    }
}

impl ProgressStatistics {
    /// Counts `(url, state)` records, one per URL
    pub fn from_records(records: &[(String, PageState)]) -> Self {
        let count = |wanted: PageState| records.iter().filter(|(_, s)| *s == wanted).count();
        Self {
            total: records.len(),
            completed: count(PageState::Completed),
            queued: count(PageState::Queued),
            failed: count(PageState::Failed),
        }
    }
}

/// Counts URLs by their latest recorded state
pub fn load_statistics(progress: &ProgressStore) -> ProgressStatistics {
    ProgressStatistics::from_records(&progress.items())
}

/// Counts URLs in the log at `path` without opening it for writing
pub async fn read_statistics(path: &Path) -> Result<ProgressStatistics, StorageError> {
    let records = ProgressStore::read_records(path).await?;
    Ok(ProgressStatistics::from_records(&records))
}

/// Renders statistics as the text block printed by `--stats`
pub fn format_statistics(stats: &ProgressStatistics) -> String {
    let mut out = String::from("=== Crawl Progress ===\n\n");
    out.push_str(&format!("  Total urls: {}\n", stats.total));
    for (state, count) in [
        (PageState::Completed, stats.completed),
        (PageState::Queued, stats.queued),
        (PageState::Failed, stats.failed),
    ] {
        out.push_str(&format!("  {}: {}\n", state, count));
    }
    out.push_str(&format!(
        "\nCompletion: {:.1}% ({} / {} urls fetched)\n",
        stats.completion_rate(),
        stats.completed,
        stats.total
    ));
    out
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &ProgressStatistics) {
    print!("{}", format_statistics(stats));
}
