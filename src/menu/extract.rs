//! Navigation markup extraction
//!
//! The navigation is a nested list: every `<li>` holds a `<label>` wrapping
//! the link, and optionally one classed `<ul>` holding the item's children.
//!
//! ```html
//! <ul class="ul-1">
//!   <li>
//!     <label><a href="/docs/home/"><span>Home</span></a></label>
//!     <ul class="ul-2">
//!       <li><label><a href="/docs/setup/"><span>Setup</span></a></label></li>
//!     </ul>
//!   </li>
//! </ul>
//! ```

use crate::menu::{InvalidEntry, MenuEntry, MenuError};
use scraper::{ElementRef, Html, Selector};

/// Fields gathered from one `<li>` before validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryDraft {
    pub name: Option<String>,
    pub href: Option<String>,
    pub children: Vec<MenuEntry>,
}

/// An entry that failed validation, kept for reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedEntry {
    /// Nesting level of the rejected `<li>` (0 = top level)
    pub depth: usize,
    pub draft: EntryDraft,
    pub reason: InvalidEntry,
}

/// Result of walking a navigation list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuExtraction {
    pub entries: Vec<MenuEntry>,
    pub rejected: Vec<RejectedEntry>,
}

/// Turns a draft into an entry, or says why it cannot be one
pub fn validate_entry(draft: EntryDraft) -> Result<MenuEntry, InvalidEntry> {
    let name = draft
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or(InvalidEntry::MissingName)?;

    let href = draft
        .href
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .ok_or_else(|| InvalidEntry::MissingHref { name: name.clone() })?;

    Ok(MenuEntry {
        name,
        href,
        children: draft.children,
    })
}

/// Walks the `<li>` children of `list` into menu entries
///
/// Invalid entries are dropped (with a warning) without affecting their
/// siblings; they are also returned in [`MenuExtraction::rejected`].
pub fn extract_menu(list: ElementRef<'_>) -> MenuExtraction {
    let mut rejected = Vec::new();
    let entries = walk_list(list, 0, &mut rejected);
    MenuExtraction { entries, rejected }
}

/// Parses `html`, locates the navigation list by `selector` and extracts it
pub fn extract_menu_from_html(
    html: &str,
    selector: &str,
    url: &str,
) -> Result<MenuExtraction, MenuError> {
    let selector_parsed =
        Selector::parse(selector).map_err(|_| MenuError::Selector(selector.to_string()))?;
    let document = Html::parse_document(html);

    let nav = document
        .select(&selector_parsed)
        .next()
        .ok_or_else(|| MenuError::NavigationMissing {
            selector: selector.to_string(),
            url: url.to_string(),
        })?;

    Ok(extract_menu(nav))
}

fn walk_list(
    list: ElementRef<'_>,
    depth: usize,
    rejected: &mut Vec<RejectedEntry>,
) -> Vec<MenuEntry> {
    let mut entries = Vec::new();

    for item in child_elements(list).filter(|e| e.value().name() == "li") {
        let draft = read_item(item, depth, rejected);
        match validate_entry(draft.clone()) {
            Ok(entry) => entries.push(entry),
            Err(reason) => {
                tracing::warn!("Dropping invalid menu entry at depth {}: {}", depth, reason);
                rejected.push(RejectedEntry { depth, draft, reason });
            }
        }
    }

    entries
}

fn read_item(item: ElementRef<'_>, depth: usize, rejected: &mut Vec<RejectedEntry>) -> EntryDraft {
    let mut draft = EntryDraft::default();
    let mut sublist_seen = false;

    for child in child_elements(item) {
        match child.value().name() {
            "label" => {
                if let Some(anchor) = first_descendant(child, "a") {
                    draft.name = Some(anchor_label(anchor));
                    draft.href = anchor.value().attr("href").map(str::to_string);
                }
            }
            "ul" if child.value().attr("class").is_some() => {
                if sublist_seen {
                    tracing::warn!(
                        "Multiple sublists under menu entry {:?}, keeping the first",
                        draft.name.as_deref().unwrap_or("<unnamed>")
                    );
                } else {
                    sublist_seen = true;
                    draft.children = walk_list(child, depth + 1, rejected);
                }
            }
            _ => {}
        }
    }

    draft
}

/// Text of the anchor's `<span>`, or of the anchor itself when it has none
fn anchor_label(anchor: ElementRef<'_>) -> String {
    let source = first_descendant(anchor, "span").unwrap_or(anchor);
    source.text().collect::<String>().trim().to_string()
}

fn child_elements<'a>(element: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    element.children().filter_map(ElementRef::wrap)
}

fn first_descendant<'a>(element: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    element
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == tag)
}
