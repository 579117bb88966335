//! Text rendering of the menu tree

use crate::menu::MenuEntry;

/// Draws the forest one entry per line with box-drawing connectors
///
/// ```
/// use doc_harvest::menu::{render_tree, MenuEntry};
///
/// let tree = vec![MenuEntry::new("Docs", "/docs/")
///     .with_children(vec![MenuEntry::new("Setup", "/docs/setup/")])];
/// assert_eq!(
///     render_tree(&tree),
///     "├── Docs (/docs/)\n    ├── Setup (/docs/setup/)\n"
/// );
/// ```
pub fn render_tree(entries: &[MenuEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        render_entry(entry, "", &mut out);
    }
    out
}

fn render_entry(entry: &MenuEntry, indent: &str, out: &mut String) {
    out.push_str(&format!("{}├── {} ({})\n", indent, entry.name, entry.href));

    let last = entry.children.len().saturating_sub(1);
    for (index, child) in entry.children.iter().enumerate() {
        let connector = if index == last { "    " } else { "│   " };
        render_entry(child, &format!("{indent}{connector}"), out);
    }
}
