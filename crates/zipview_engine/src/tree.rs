/* 📖 # Why is the tree a borrowed projection?

The entry list is the single source of truth. The tree only groups it by path segment, so
nodes borrow their entries instead of copying content around, and the tree is simply
rebuilt whenever the entries (or the active filter) change.

Children live in a BTreeMap: names are unique per parent, and iteration order does not
depend on hashing, which keeps repeated builds structurally identical.
*/

use std::collections::BTreeMap;

use crate::entry::ArchiveEntry;

/// A node of the directory tree derived from an entry list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryTreeNode<'a> {
    name: String,
    children: BTreeMap<String, DirectoryTreeNode<'a>>,
    entry: Option<&'a ArchiveEntry>,
    is_directory: bool,
}

impl<'a> DirectoryTreeNode<'a> {
    fn directory(name: &str) -> Self {
        Self {
            name: name.to_string(),
            children: BTreeMap::new(),
            entry: None,
            is_directory: true,
        }
    }

    /// Last path segment; empty for the root.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_directory(&self) -> bool {
        self.is_directory
    }

    /// The originating entry for file nodes.
    pub fn entry(&self) -> Option<&'a ArchiveEntry> {
        self.entry
    }

    pub fn children(&self) -> &BTreeMap<String, DirectoryTreeNode<'a>> {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<&DirectoryTreeNode<'a>> {
        self.children.get(name)
    }

    /// Children in display order: directories first, then by name.
    pub fn sorted_children(&self) -> Vec<&DirectoryTreeNode<'a>> {
        let mut children: Vec<_> = self.children.values().collect();
        // Stable sort keeps the BTreeMap's name order within each group
        children.sort_by_key(|child| !child.is_directory);
        children
    }

    /// Find a node by slash-separated path relative to this node.
    pub fn find(&self, path: &str) -> Option<&DirectoryTreeNode<'a>> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |node, segment| node.children.get(segment))
    }

    /// Slash-joined paths of every directory node below this one.
    pub fn directory_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        collect_directory_paths(self, "", &mut paths);
        paths
    }
}

fn collect_directory_paths(node: &DirectoryTreeNode<'_>, prefix: &str, paths: &mut Vec<String>) {
    for child in node.children.values() {
        if child.is_directory {
            let path = join_path(prefix, &child.name);
            collect_directory_paths(child, &path, paths);
            paths.push(path);
        }
    }
}

pub(crate) fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

/// Fold a flat entry list into a tree under an implicit, unnamed root.
///
/// Empty path segments are ignored. When the same path is seen both as a directory and as
/// a file, the file wins regardless of order: the node keeps its entry and stays a file
/// node, even if later paths nest below it.
pub fn build_tree<'a>(entries: impl IntoIterator<Item = &'a ArchiveEntry>) -> DirectoryTreeNode<'a> {
    let mut root = DirectoryTreeNode::directory("");
    for entry in entries {
        let segments: Vec<&str> = entry
            .path()
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();
        let mut node = &mut root;
        for (index, segment) in segments.iter().enumerate() {
            node = node
                .children
                .entry(segment.to_string())
                .or_insert_with(|| DirectoryTreeNode::directory(segment));
            let is_last = index + 1 == segments.len();
            if is_last && !entry.is_directory() {
                node.entry = Some(entry);
                node.is_directory = false;
            }
        }
    }
    root
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::{Expect, expect};

    fn render(node: &DirectoryTreeNode<'_>) -> String {
        fn walk(node: &DirectoryTreeNode<'_>, depth: usize, out: &mut String) {
            for child in node.sorted_children() {
                let marker = if child.is_directory() { "/" } else { "" };
                out.push_str(&format!("{}{}{}\n", "  ".repeat(depth), child.name(), marker));
                walk(child, depth + 1, out);
            }
        }
        let mut out = String::new();
        walk(node, 0, &mut out);
        out
    }

    fn check(entries: &[ArchiveEntry], expected: Expect) {
        expected.assert_eq(&render(&build_tree(entries)));
    }

    fn file(path: &str) -> ArchiveEntry {
        ArchiveEntry::file(path, 1, b"x".to_vec())
    }

    #[test]
    fn test_single_root_file() {
        check(
            &[file("README.md")],
            expect![[r#"
                README.md
            "#]],
        );
    }

    #[test]
    fn test_nested_path_creates_chain() {
        let entries = [file("src/components/button.js")];
        check(
            &entries,
            expect![[r#"
                src/
                  components/
                    button.js
            "#]],
        );
        let tree = build_tree(&entries);
        let leaf = tree.find("src/components/button.js").unwrap();
        assert!(!leaf.is_directory());
        assert_eq!(leaf.entry().unwrap().path(), "src/components/button.js");
        assert!(tree.find("src/components").unwrap().entry().is_none());
    }

    #[test]
    fn test_multiple_roots_sorted_directories_first() {
        check(
            &[
                file("package.json"),
                file("src/index.js"),
                file("README.md"),
                ArchiveEntry::directory("assets/"),
            ],
            expect![[r#"
                assets/
                src/
                  index.js
                README.md
                package.json
            "#]],
        );
    }

    #[test]
    fn test_file_wins_over_directory_in_either_order() {
        for entries in [
            vec![ArchiveEntry::directory("a/"), file("a")],
            vec![file("a"), ArchiveEntry::directory("a/")],
        ] {
            let tree = build_tree(&entries);
            let node = tree.child("a").unwrap();
            assert!(!node.is_directory());
            assert!(node.entry().is_some());
        }
    }

    #[test]
    fn test_file_with_sibling_directory_entry() {
        let entries = vec![ArchiveEntry::directory("a/"), file("a/b.js")];
        let tree = build_tree(&entries);
        let a = tree.child("a").unwrap();
        assert!(a.is_directory());
        let b = a.child("b.js").unwrap();
        assert!(!b.is_directory());
        assert_eq!(a.children().len(), 1);
    }

    #[test]
    fn test_empty_segments_are_ignored() {
        let entries = vec![file("/a//b.txt"), file("")];
        check(
            &entries,
            expect![[r#"
                a/
                  b.txt
            "#]],
        );
    }

    #[test]
    fn test_build_is_idempotent() {
        let entries = vec![
            ArchiveEntry::directory("docs/"),
            file("docs/a.md"),
            file("docs/b.md"),
            file("z.txt"),
        ];
        assert_eq!(build_tree(&entries), build_tree(&entries));
    }

    #[test]
    fn test_directory_paths() {
        let entries = vec![file("a/b/c.txt"), file("d/e.txt"), file("f.txt")];
        let mut paths = build_tree(&entries).directory_paths();
        paths.sort();
        assert_eq!(paths, vec!["a", "a/b", "d"]);
    }
}
