//! JSON cache of the discovered menu tree

use crate::menu::{validate_entry, EntryDraft, MenuEntry, MenuError};
use std::path::Path;

/// Loads the cached menu, or `None` if no cache file exists
///
/// # Errors
///
/// A cache that exists but cannot be read, parsed, or contains an entry that
/// would not pass validation is fatal: there is no partial recovery.
pub async fn load_cached_menu(path: &Path) -> Result<Option<Vec<MenuEntry>>, MenuError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(MenuError::CacheIo {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let entries: Vec<MenuEntry> =
        serde_json::from_str(&content).map_err(|source| MenuError::CacheFormat {
            path: path.to_path_buf(),
            source,
        })?;

    for entry in MenuEntry::depth_first(&entries) {
        validate_entry(EntryDraft {
            name: Some(entry.name.clone()),
            href: Some(entry.href.clone()),
            children: Vec::new(),
        })
        .map_err(|reason| MenuError::CacheEntry {
            path: path.to_path_buf(),
            reason,
        })?;
    }

    Ok(Some(entries))
}

/// Writes `entries` to the cache as pretty-printed JSON
pub async fn save_menu_cache(path: &Path, entries: &[MenuEntry]) -> Result<(), MenuError> {
    let io_err = |source| MenuError::CacheIo {
        path: path.to_path_buf(),
        source,
    };

    let content = serde_json::to_string_pretty(entries).map_err(|source| MenuError::CacheFormat {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    tokio::fs::write(path, content).await.map_err(io_err)?;

    Ok(())
}
