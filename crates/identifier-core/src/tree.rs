//! Arena backed tree of path segments.
//!
//! Nodes live in a flat vector; parents and children refer to each other by
//! [`NodeId`]. Index 0 is the synthetic root with an empty name.

use compact_str::CompactString;
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::clean::{ClearRule, clean_segment};

/// Index of a node inside its [`PathTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position in the arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A single path segment.
#[derive(Debug, Clone)]
pub struct PathNode {
    pub name: CompactString,
    pub is_dir: bool,
    /// Byte size for files, 0 for directories.
    pub size: u64,
    parent: Option<NodeId>,
    children: IndexMap<CompactString, NodeId>,
}

impl PathNode {
    /// Parent node, `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in first-insertion order.
    pub fn children(&self) -> impl DoubleEndedIterator<Item = NodeId> + '_ {
        self.children.values().copied()
    }

    /// Look up a child by exact name.
    pub fn child(&self, name: &str) -> Option<NodeId> {
        self.children.get(name).copied()
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}

/// Aggregated totals below a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtreeStats {
    pub bytes: u64,
    pub files: u64,
    /// Number of directories, counting the node itself.
    pub folders: u64,
}

/// In-memory model of a file and folder name space.
#[derive(Debug, Clone)]
pub struct PathTree {
    nodes: Vec<PathNode>,
}

impl Default for PathTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PathTree {
    /// The synthetic root.
    pub const ROOT: NodeId = NodeId(0);

    /// Create a tree containing only the root.
    pub fn new() -> Self {
        Self {
            nodes: vec![PathNode {
                name: CompactString::default(),
                is_dir: true,
                size: 0,
                parent: None,
                children: IndexMap::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        Self::ROOT
    }

    /// Borrow a node.
    pub fn node(&self, id: NodeId) -> &PathNode {
        &self.nodes[id.0]
    }

    /// Number of nodes including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Add a child below `parent`, or return the existing child with that name.
    ///
    /// An existing child keeps its original kind and size.
    pub fn add_child(&mut self, parent: NodeId, name: &str, is_dir: bool, size: u64) -> NodeId {
        if let Some(existing) = self.nodes[parent.0].children.get(name) {
            return *existing;
        }
        let id = NodeId(self.nodes.len());
        let name = CompactString::from(name);
        self.nodes.push(PathNode {
            name: name.clone(),
            is_dir,
            size: if is_dir { 0 } else { size },
            parent: Some(parent),
            children: IndexMap::new(),
        });
        self.nodes[parent.0].children.insert(name, id);
        id
    }

    /// Insert a `/` separated path, creating intermediate directories.
    ///
    /// Empty and `.` segments are skipped. The last segment gets `is_dir`
    /// and `size`.
    pub fn insert_path(&mut self, path: &str, is_dir: bool, size: u64) -> NodeId {
        let segments: Vec<&str> = path
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .collect();
        let mut current = Self::ROOT;
        for (i, segment) in segments.iter().enumerate() {
            let last = i + 1 == segments.len();
            current = if last {
                self.add_child(current, segment, is_dir, size)
            } else {
                self.add_child(current, segment, true, 0)
            };
        }
        current
    }

    /// Find the node for a `/` separated path.
    pub fn find(&self, path: &str) -> Option<NodeId> {
        path.split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .try_fold(Self::ROOT, |current, segment| self.node(current).child(segment))
    }

    /// Ancestors from the root's child down to `id`.
    fn lineage(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            if node == Self::ROOT {
                break;
            }
            chain.push(node);
            current = self.nodes[node.0].parent;
        }
        chain.reverse();
        chain
    }

    /// Full path of a node relative to the root, without leading `/`.
    pub fn path_of(&self, id: NodeId) -> String {
        self.lineage(id)
            .iter()
            .map(|n| self.nodes[n.0].name.as_str())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Full path with every segment cleaned.
    pub fn clear_string(&self, id: NodeId) -> String {
        self.lineage(id)
            .iter()
            .map(|n| clean_segment(&self.nodes[n.0].name))
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Totals for the subtree rooted at `id`.
    ///
    /// A file contributes `(size, 1, 0)`; a directory sums its children and
    /// adds one folder for itself.
    pub fn subtree_stats(&self, id: NodeId) -> SubtreeStats {
        let mut stats = SubtreeStats::default();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = &self.nodes[current.0];
            if node.is_dir {
                stats.folders += 1;
                stack.extend(node.children());
            } else {
                stats.bytes += node.size;
                stats.files += 1;
            }
        }
        stats
    }

    /// Depth-first walk yielding children before their parent, root last.
    pub fn post_order(&self) -> PostOrder<'_> {
        PostOrder {
            tree: self,
            stack: vec![(Self::ROOT, 0)],
        }
    }

    /// Lazily compute the renames a rule produces, deepest entries first.
    pub fn clear<'a>(&'a self, rule: &'a ClearRule) -> ClearIter<'a> {
        ClearIter {
            tree: self,
            walk: self.post_order(),
            rule,
        }
    }

    /// Paths of files whose name matches `pattern`, children first.
    pub fn find_basename<'a>(&'a self, pattern: &'a Regex) -> FindBasename<'a> {
        FindBasename {
            tree: self,
            walk: self.post_order(),
            pattern,
        }
    }

    /// Paths of directories whose name matches `pattern`.
    ///
    /// The subtree below a match is not searched.
    pub fn find_dirname<'a>(&'a self, pattern: &'a Regex) -> FindDirname<'a> {
        FindDirname {
            tree: self,
            pattern,
            stack: self.node(Self::ROOT).children().rev().collect(),
        }
    }
}

/// Post-order traversal of a [`PathTree`].
pub struct PostOrder<'a> {
    tree: &'a PathTree,
    // (node, index of the next child to visit)
    stack: Vec<(NodeId, usize)>,
}

impl Iterator for PostOrder<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        loop {
            let (id, next_child) = self.stack.last_mut()?;
            let node = &self.tree.nodes[id.0];
            if let Some((_, child)) = node.children.get_index(*next_child) {
                *next_child += 1;
                let child = *child;
                self.stack.push((child, 0));
            } else {
                let id = *id;
                self.stack.pop();
                return Some(id);
            }
        }
    }
}

/// A rename computed by [`PathTree::clear`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rename {
    /// Current path relative to the tree root.
    pub from: String,
    /// New path: the parent's current path joined with the new name.
    pub to: String,
}

/// Iterator returned by [`PathTree::clear`].
pub struct ClearIter<'a> {
    tree: &'a PathTree,
    walk: PostOrder<'a>,
    rule: &'a ClearRule,
}

impl Iterator for ClearIter<'_> {
    type Item = Rename;

    fn next(&mut self) -> Option<Rename> {
        for id in self.walk.by_ref() {
            if id == PathTree::ROOT {
                continue;
            }
            let tree = self.tree;
            let node = tree.node(id);
            let Some(new_name) = self.rule.apply(&node.name) else {
                continue;
            };
            // Ancestors are reported under their current names even when they
            // are renamed later in the same pass.
            let parent = node.parent.map(|p| tree.path_of(p)).unwrap_or_default();
            let to = if parent.is_empty() {
                new_name
            } else {
                format!("{parent}/{new_name}")
            };
            return Some(Rename {
                from: tree.path_of(id),
                to,
            });
        }
        None
    }
}

/// Iterator returned by [`PathTree::find_basename`].
pub struct FindBasename<'a> {
    tree: &'a PathTree,
    walk: PostOrder<'a>,
    pattern: &'a Regex,
}

impl Iterator for FindBasename<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        for id in self.walk.by_ref() {
            let node = self.tree.node(id);
            if !node.is_dir && self.pattern.is_match(&node.name) {
                return Some(self.tree.path_of(id));
            }
        }
        None
    }
}

/// Iterator returned by [`PathTree::find_dirname`].
pub struct FindDirname<'a> {
    tree: &'a PathTree,
    pattern: &'a Regex,
    stack: Vec<NodeId>,
}

impl Iterator for FindDirname<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        while let Some(id) = self.stack.pop() {
            let node = self.tree.node(id);
            if node.is_dir && self.pattern.is_match(&node.name) {
                return Some(self.tree.path_of(id));
            }
            self.stack.extend(node.children().rev());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PathTree {
        let mut tree = PathTree::new();
        tree.insert_path("docs", true, 0);
        tree.insert_path("docs/a.txt", false, 10);
        tree.insert_path("docs/b.txt", false, 20);
        tree.insert_path("docs/c.txt", false, 0);
        tree.insert_path("docs/empty", true, 0);
        tree
    }

    #[test]
    fn test_insert_dedups_siblings() {
        let mut tree = sample();
        let before = tree.len();
        let id = tree.insert_path("docs/a.txt", false, 99);
        assert_eq!(tree.len(), before);
        assert_eq!(tree.node(id).size, 10);
        assert_eq!(tree.path_of(id), "docs/a.txt");
    }

    #[test]
    fn test_intermediate_dirs_are_created() {
        let mut tree = PathTree::new();
        let leaf = tree.insert_path("a/b/c.txt", false, 5);
        let b = tree.node(leaf).parent().unwrap();
        assert!(tree.node(b).is_dir);
        assert_eq!(tree.node(b).size, 0);
        assert_eq!(tree.find("a/b"), Some(b));
        assert_eq!(tree.find("a/x"), None);
    }

    #[test]
    fn test_subtree_stats() {
        let tree = sample();
        let docs = tree.find("docs").unwrap();
        let stats = tree.subtree_stats(docs);
        assert_eq!(
            stats,
            SubtreeStats {
                bytes: 30,
                files: 3,
                folders: 2
            }
        );
        let leaf = tree.find("docs/b.txt").unwrap();
        assert_eq!(tree.subtree_stats(leaf).files, 1);
        assert_eq!(tree.subtree_stats(leaf).folders, 0);
    }

    #[test]
    fn test_root_stats() {
        let mut tree = PathTree::new();
        tree.insert_path("a", false, 10);
        tree.insert_path("b", false, 20);
        tree.insert_path("c", false, 0);
        tree.insert_path("empty", true, 0);
        let stats = tree.subtree_stats(tree.root());
        assert_eq!((stats.bytes, stats.files, stats.folders), (30, 3, 2));
    }

    #[test]
    fn test_post_order_children_first() {
        let tree = sample();
        let order: Vec<String> = tree.post_order().map(|id| tree.path_of(id)).collect();
        assert_eq!(
            order,
            vec!["docs/a.txt", "docs/b.txt", "docs/c.txt", "docs/empty", "docs", ""]
        );
    }

    #[test]
    fn test_clear_reports_stale_parent_prefix() {
        let mut tree = PathTree::new();
        tree.insert_path(".dir/~file", false, 1);
        let rule = ClearRule::auto();
        let renames: Vec<Rename> = tree.clear(&rule).collect();
        assert_eq!(
            renames,
            vec![
                Rename {
                    from: ".dir/~file".to_string(),
                    to: ".dir/-file".to_string()
                },
                Rename {
                    from: ".dir".to_string(),
                    to: "_dir".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_find_basename_skips_dirs() {
        let mut tree = sample();
        tree.insert_path("txt.d", true, 0);
        let re = Regex::new(r"\.txt$|^txt").unwrap();
        let found: Vec<String> = tree.find_basename(&re).collect();
        assert_eq!(found, vec!["docs/a.txt", "docs/b.txt", "docs/c.txt"]);
    }

    #[test]
    fn test_find_dirname_does_not_descend() {
        let mut tree = PathTree::new();
        tree.insert_path("tmp/tmp/x", false, 1);
        tree.insert_path("keep/tmp", true, 0);
        let re = Regex::new("^tmp$").unwrap();
        let found: Vec<String> = tree.find_dirname(&re).collect();
        assert_eq!(found, vec!["tmp", "keep/tmp"]);
    }

    #[test]
    fn test_clear_string_cleans_every_segment() {
        let mut tree = PathTree::new();
        let id = tree.insert_path(".a/b  c/~d", true, 0);
        assert_eq!(tree.clear_string(id), "_a/b c/-d");
        assert_eq!(tree.path_of(PathTree::ROOT), "");
    }
}
