//! Menu discovery from the live site

use crate::config::SiteConfig;
use crate::crawler::RetryingFetcher;
use crate::menu::{extract_menu_from_html, load_cached_menu, save_menu_cache, MenuEntry};
use crate::HarvestError;
use std::path::Path;

/// Fetches the home page and extracts its navigation menu
pub async fn discover_menu(
    site: &SiteConfig,
    fetcher: &RetryingFetcher,
) -> Result<Vec<MenuEntry>, HarvestError> {
    let url = site.home_url();
    tracing::info!("Discovering menu from {}", url);

    let body = fetcher.fetch(&url).await?;
    let extraction = extract_menu_from_html(&body, &site.nav_selector, &url)?;

    if !extraction.rejected.is_empty() {
        tracing::warn!(
            "Dropped {} invalid menu entries while reading {}",
            extraction.rejected.len(),
            url
        );
    }
    tracing::info!(
        "Discovered {} menu entries ({} top level)",
        MenuEntry::count(&extraction.entries),
        extraction.entries.len()
    );

    Ok(extraction.entries)
}

/// Returns the cached menu if present, otherwise discovers and caches it
///
/// A present cache skips the network entirely.
pub async fn load_or_discover_menu(
    site: &SiteConfig,
    cache_path: &Path,
    fetcher: &RetryingFetcher,
) -> Result<Vec<MenuEntry>, HarvestError> {
    if let Some(entries) = load_cached_menu(cache_path).await? {
        tracing::info!(
            "Loaded {} menu entries from {}",
            MenuEntry::count(&entries),
            cache_path.display()
        );
        return Ok(entries);
    }

    let entries = discover_menu(site, fetcher).await?;
    save_menu_cache(cache_path, &entries).await?;
    tracing::info!("Cached menu at {}", cache_path.display());

    Ok(entries)
}
