//! Core data structures for the dependency graph

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One trackable unit of loaded code.
///
/// `parents` holds the reverse edges: every path recorded as depending on
/// this node. A parent may outlive its presence in the graph (it was evicted
/// earlier), so consumers must check the graph before following one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    path: PathBuf,
    pub parents: HashSet<PathBuf>,
}

impl Node {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Node {
            path: path.into(),
            parents: HashSet::new(),
        }
    }

    /// Absolute path identifying this node. Never changes after creation.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A node with no recorded dependents.
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// Record `parent` as a dependent. Returns false if it was already present.
    pub fn add_parent(&mut self, parent: impl Into<PathBuf>) -> bool {
        self.parents.insert(parent.into())
    }

    pub fn has_parent(&self, parent: &Path) -> bool {
        self.parents.contains(parent)
    }
}
