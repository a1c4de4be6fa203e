/* 📖 # Why keep expansion state outside the tree?

The tree is rebuilt from the entries on every change, so it cannot hold UI state. The view
keeps a map from directory path to expanded flag instead. Paths survive a rebuild, which
means toggling a directory, filtering and clearing the filter all keep the user's choices.
*/

use std::collections::HashMap;

use crate::entry::ArchiveEntry;
use crate::tree::{DirectoryTreeNode, build_tree, join_path};

/// A single visible line of the rendered tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow<'a> {
    /// Slash-joined path of the node, without a trailing slash.
    pub path: String,
    pub name: String,
    pub depth: usize,
    pub is_directory: bool,
    pub is_expanded: bool,
    pub entry: Option<&'a ArchiveEntry>,
}

/// Render-layer state for the tree: per-directory expansion and the search filter.
#[derive(Debug, Clone, Default)]
pub struct TreeView {
    expanded: HashMap<String, bool>,
    filter: Option<String>,
}

impl TreeView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directories start collapsed. Every directory is shown expanded while a filter is active.
    pub fn is_expanded(&self, path: &str) -> bool {
        self.filter.is_some() || self.expanded.get(path).copied().unwrap_or(false)
    }

    pub fn set_expanded(&mut self, path: impl Into<String>, expanded: bool) {
        self.expanded.insert(path.into(), expanded);
    }

    /// Flip a directory and return its new state.
    pub fn toggle(&mut self, path: &str) -> bool {
        let expanded = !self.expanded.get(path).copied().unwrap_or(false);
        self.expanded.insert(path.to_string(), expanded);
        expanded
    }

    pub fn expand_all(&mut self, tree: &DirectoryTreeNode<'_>) {
        for path in tree.directory_paths() {
            self.expanded.insert(path, true);
        }
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    /// Forget all state, e.g. when a different archive is loaded.
    pub fn reset(&mut self) {
        self.expanded.clear();
        self.filter = None;
    }

    /// Set the search query. A blank query clears the filter.
    pub fn set_filter(&mut self, query: &str) {
        let query = query.trim();
        self.filter = if query.is_empty() {
            None
        } else {
            Some(query.to_lowercase())
        };
    }

    pub fn clear_filter(&mut self) {
        self.filter = None;
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// Depth-first rows for everything currently visible.
    pub fn visible_rows<'a>(&self, entries: &'a [ArchiveEntry]) -> Vec<TreeRow<'a>> {
        let tree = match &self.filter {
            Some(query) => build_tree(filter_entries(entries, query)),
            None => build_tree(entries),
        };
        let mut rows = Vec::new();
        self.collect_rows(&tree, "", 0, &mut rows);
        rows
    }

    fn collect_rows<'a>(
        &self,
        node: &DirectoryTreeNode<'a>,
        prefix: &str,
        depth: usize,
        rows: &mut Vec<TreeRow<'a>>,
    ) {
        for child in node.sorted_children() {
            let path = join_path(prefix, child.name());
            let is_expanded = child.is_directory() && self.is_expanded(&path);
            rows.push(TreeRow {
                path: path.clone(),
                name: child.name().to_string(),
                depth,
                is_directory: child.is_directory(),
                is_expanded,
                entry: child.entry(),
            });
            if is_expanded {
                self.collect_rows(child, &path, depth + 1, rows);
            }
        }
    }
}

/// Entries whose path contains `query`, ignoring case.
pub fn filter_entries<'a>(entries: &'a [ArchiveEntry], query: &str) -> Vec<&'a ArchiveEntry> {
    let query = query.to_lowercase();
    entries
        .iter()
        .filter(|entry| entry.path().to_lowercase().contains(&query))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::{Expect, expect};

    fn entries() -> Vec<ArchiveEntry> {
        vec![
            ArchiveEntry::directory("src/"),
            ArchiveEntry::file("src/lib.rs", 10, b"pub mod a;".to_vec()),
            ArchiveEntry::file("src/util/Helpers.rs", 4, b"fn x".to_vec()),
            ArchiveEntry::file("README.md", 2, b"hi".to_vec()),
        ]
    }

    fn check(view: &TreeView, entries: &[ArchiveEntry], expected: Expect) {
        let rendered: String = view
            .visible_rows(entries)
            .iter()
            .map(|row| {
                let marker = match (row.is_directory, row.is_expanded) {
                    (true, true) => "v ",
                    (true, false) => "> ",
                    (false, _) => "  ",
                };
                format!("{}{}{}\n", "  ".repeat(row.depth), marker, row.name)
            })
            .collect();
        expected.assert_eq(&rendered);
    }

    #[test]
    fn test_directories_start_collapsed() {
        let entries = entries();
        check(
            &TreeView::new(),
            &entries,
            expect![[r#"
                > src
                  README.md
            "#]],
        );
    }

    #[test]
    fn test_toggle_expands_one_level() {
        let entries = entries();
        let mut view = TreeView::new();
        assert!(view.toggle("src"));
        check(
            &view,
            &entries,
            expect![[r#"
                v src
                  > util
                    lib.rs
                  README.md
            "#]],
        );
        assert!(!view.toggle("src"));
        assert!(!view.is_expanded("src"));
    }

    #[test]
    fn test_expand_all_and_collapse_all() {
        let entries = entries();
        let mut view = TreeView::new();
        view.expand_all(&build_tree(&entries));
        check(
            &view,
            &entries,
            expect![[r#"
                v src
                  v util
                      Helpers.rs
                    lib.rs
                  README.md
            "#]],
        );
        view.collapse_all();
        assert!(!view.is_expanded("src"));
        assert!(!view.is_expanded("src/util"));
    }

    #[test]
    fn test_filter_is_case_insensitive_and_expands_everything() {
        let entries = entries();
        let mut view = TreeView::new();
        view.set_filter("  helpers ");
        assert_eq!(view.filter(), Some("helpers"));
        check(
            &view,
            &entries,
            expect![[r#"
                v src
                  v util
                      Helpers.rs
            "#]],
        );
    }

    #[test]
    fn test_clearing_filter_restores_expansion_state() {
        let entries = entries();
        let mut view = TreeView::new();
        view.set_filter("lib");
        view.set_filter("");
        assert_eq!(view.filter(), None);
        assert!(!view.is_expanded("src"));
        view.set_filter("lib");
        view.clear_filter();
        assert_eq!(view.visible_rows(&entries).len(), 2);
    }

    #[test]
    fn test_filter_entries() {
        let entries = entries();
        let matched: Vec<&str> = filter_entries(&entries, "SRC/")
            .iter()
            .map(|entry| entry.path())
            .collect();
        assert_eq!(matched, vec!["src/", "src/lib.rs", "src/util/Helpers.rs"]);
        assert!(filter_entries(&entries, "nothing").is_empty());
    }

    #[test]
    fn test_rows_carry_entries_for_files() {
        let entries = entries();
        let rows = TreeView::new().visible_rows(&entries);
        let readme = rows.iter().find(|row| row.name == "README.md").unwrap();
        assert_eq!(readme.entry.map(|entry| entry.path()), Some("README.md"));
        assert_eq!(readme.path, "README.md");
    }

    #[test]
    fn test_reset() {
        let mut view = TreeView::new();
        view.set_expanded("src", true);
        view.set_filter("x");
        view.reset();
        assert!(!view.is_expanded("src"));
        assert_eq!(view.filter(), None);
    }
}
