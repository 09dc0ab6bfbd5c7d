//! Reverse-dependency graph keyed by module path

use crate::model::Node;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The dependency graph — one node per tracked path, each carrying the set
/// of paths that depend on it.
#[derive(Default)]
pub struct DependencyGraph {
    nodes: HashMap<PathBuf, Node>,
}

impl std::fmt::Debug for DependencyGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyGraph")
            .field("node_count", &self.nodes.len())
            .field("edge_count", &self.edge_count())
            .finish()
    }
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the node for `path`, inserting an empty one if absent.
    /// The flag is true when the node was created by this call.
    pub fn ensure_node(&mut self, path: &Path) -> (&mut Node, bool) {
        let mut created = false;
        let node = self.nodes.entry(path.to_path_buf()).or_insert_with(|| {
            created = true;
            Node::new(path)
        });
        (node, created)
    }

    /// Record that `parent` depends on `child`.
    ///
    /// Does nothing unless `parent` is already tracked, so growth stays bounded
    /// to what is reachable from explicitly watched roots. Returns true when a
    /// new edge was added.
    pub fn record_edge(&mut self, parent: &Path, child: &Path) -> bool {
        if !self.nodes.contains_key(parent) {
            return false;
        }
        let (node, _) = self.ensure_node(child);
        node.add_parent(parent)
    }

    /// Remove a node. Absent paths are ignored.
    pub fn remove_node(&mut self, path: &Path) -> Option<Node> {
        self.nodes.remove(path)
    }

    pub fn has(&self, path: &Path) -> bool {
        self.nodes.contains_key(path)
    }

    pub fn get(&self, path: &Path) -> Option<&Node> {
        self.nodes.get(path)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of recorded parent links, including links to evicted parents.
    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|n| n.parents.len()).sum()
    }

    /// Iterate over all tracked paths.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.nodes.keys().map(PathBuf::as_path)
    }

    /// Iterate over all nodes.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Remove every node, returning them.
    pub fn drain(&mut self) -> Vec<Node> {
        self.nodes.drain().map(|(_, node)| node).collect()
    }
}
