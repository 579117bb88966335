//! Navigation menu module
//!
//! This module turns a documentation site's navigation markup into a typed
//! tree of [`MenuEntry`] values, and persists that tree as a JSON cache so
//! later runs skip discovery entirely.

mod cache;
mod discover;
mod extract;
mod tree;

pub use cache::{load_cached_menu, save_menu_cache};
pub use discover::{discover_menu, load_or_discover_menu};
pub use extract::{
    extract_menu, extract_menu_from_html, validate_entry, EntryDraft, MenuExtraction,
    RejectedEntry,
};
pub use tree::render_tree;

use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while discovering or caching the menu
#[derive(Debug, Error)]
pub enum MenuError {
    #[error("Failed to access menu cache {}: {source}", path.display())]
    CacheIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Corrupted menu cache {}: {source}", path.display())]
    CacheFormat {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Menu cache {} holds an invalid entry: {reason}", path.display())]
    CacheEntry { path: PathBuf, reason: InvalidEntry },

    #[error("Invalid navigation selector '{0}'")]
    Selector(String),

    #[error("No element matching '{selector}' on {url}")]
    NavigationMissing { selector: String, url: String },
}

/// Why a single menu entry was dropped
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidEntry {
    #[error("entry has no name")]
    MissingName,

    #[error("entry '{name}' has no href")]
    MissingHref { name: String },
}

/// One node of the site navigation tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuEntry {
    /// Label shown in the navigation
    pub name: String,

    /// Site-relative link target
    pub href: String,

    /// Nested entries in document order
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub children: Vec<MenuEntry>,
}

impl MenuEntry {
    pub fn new(name: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            href: href.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<MenuEntry>) -> Self {
        self.children = children;
        self
    }

    /// Every entry of the forest, parents before children, siblings in order
    pub fn depth_first(entries: &[MenuEntry]) -> Vec<&MenuEntry> {
        let mut out = Vec::new();
        collect_depth_first(entries, &mut out);
        out
    }

    /// Total number of entries in the forest
    pub fn count(entries: &[MenuEntry]) -> usize {
        entries.iter().map(|e| 1 + Self::count(&e.children)).sum()
    }
}

fn collect_depth_first<'a>(entries: &'a [MenuEntry], out: &mut Vec<&'a MenuEntry>) {
    for entry in entries {
        out.push(entry);
        collect_depth_first(&entry.children, out);
    }
}

/// Reads `children: null` the same as a missing or empty list
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<MenuEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<MenuEntry>>::deserialize(deserializer)?.unwrap_or_default())
}
