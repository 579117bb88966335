//! Page state definitions for tracking crawl progress
//!
//! The progress log stores one of these per URL. The on-disk spelling of the
//! two original statuses is kept (`False` for queued, `True` for completed) so
//! existing logs replay unchanged.
use std::fmt;

/// Represents the recorded state of a page URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    /// Seeded from the menu tree and waiting to be fetched
    Queued,

    /// Fetched and persisted to page storage
    Completed,

    /// Exhausted its fetch attempts on the most recent run
    Failed,
}

impl PageState {
    /// Returns true if the page still needs fetching
    ///
    /// Failed pages are pending too: they are retried from scratch on the next
    /// run.
    pub fn is_pending(&self) -> bool {
        !matches!(self, Self::Completed)
    }

    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Converts the page state to its progress-log representation
    pub fn to_log_string(&self) -> &'static str {
        match self {
            Self::Queued => "False",
            Self::Completed => "True",
            Self::Failed => "Failed",
        }
    }

    /// Parses a page state from its progress-log representation
    ///
    /// Returns None if the string doesn't match any known state.
    pub fn from_log_string(s: &str) -> Option<Self> {
        match s {
            "False" => Some(Self::Queued),
            "True" => Some(Self::Completed),
            "Failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all possible page states
    pub fn all_states() -> [Self; 3] {
        [Self::Queued, Self::Completed, Self::Failed]
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Queued => "queued",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}
