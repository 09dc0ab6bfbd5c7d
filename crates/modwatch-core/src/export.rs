//! Serializable views of the dependency graph

use crate::graph::DependencyGraph;
use petgraph::dot::Dot;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub path: PathBuf,
    /// Sorted. May name parents that are no longer tracked.
    pub parents: Vec<PathBuf>,
}

/// Point-in-time copy of the graph, sorted by path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<SnapshotNode>,
}

impl GraphSnapshot {
    pub fn from_graph(graph: &DependencyGraph) -> Self {
        let mut nodes: Vec<SnapshotNode> = graph
            .nodes()
            .map(|node| {
                let mut parents: Vec<PathBuf> = node.parents.iter().cloned().collect();
                parents.sort();
                SnapshotNode {
                    path: node.path().to_path_buf(),
                    parents,
                }
            })
            .collect();
        nodes.sort_by(|a, b| a.path.cmp(&b.path));
        GraphSnapshot { nodes }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Build a petgraph with edges pointing from dependent to dependency.
    /// Links to untracked parents are omitted.
    pub fn to_petgraph(&self) -> DiGraph<String, &'static str> {
        let mut graph = DiGraph::new();
        let mut index: HashMap<&PathBuf, NodeIndex> = HashMap::new();
        for node in &self.nodes {
            let idx = graph.add_node(node.path.display().to_string());
            index.insert(&node.path, idx);
        }
        for node in &self.nodes {
            for parent in &node.parents {
                if let Some(&from) = index.get(parent) {
                    graph.add_edge(from, index[&node.path], "depends on");
                }
            }
        }
        graph
    }

    /// Render as Graphviz DOT.
    pub fn to_dot(&self) -> String {
        let graph = self.to_petgraph();
        format!("{}", Dot::new(&graph))
    }
}
