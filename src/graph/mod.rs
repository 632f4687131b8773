pub mod edge;
pub mod node;

use std::collections::HashMap;

use petgraph::Directed;
use petgraph::Direction;
use petgraph::stable_graph::{EdgeReference, NodeIndex, StableGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};

use edge::EdgeKind;
use node::{GraphNode, NodeKind};

/// The in-memory repository graph: a directed petgraph StableGraph (parallel edges allowed)
/// with an O(1) key index.
///
/// Nodes are registered first and edges resolved afterwards; every cross-cutting edge goes
/// through [`CodeGraph::add_edge_if_present`], so no edge ever points at a missing node.
#[derive(Debug, Clone, Default)]
pub struct CodeGraph {
    /// The underlying directed multigraph.
    pub graph: StableGraph<GraphNode, EdgeKind, Directed>,
    /// Maps node keys to their node indices.
    pub key_index: HashMap<String, NodeIndex>,
    /// Summaries attached in place by the enrichment stage, keyed by node key.
    summaries: HashMap<String, String>,
}

impl CodeGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node. A node whose key is already present replaces the existing node's
    /// attributes and keeps its edges (last writer wins).
    pub fn add_node(&mut self, node: GraphNode) -> NodeIndex {
        let key = node.key();
        if let Some(&existing) = self.key_index.get(&key) {
            self.graph[existing] = node;
            return existing;
        }
        let idx = self.graph.add_node(node);
        self.key_index.insert(key, idx);
        idx
    }

    /// Register `node` and attach it under `parent_key` with a `Contains` edge.
    ///
    /// Returns `None` (and registers nothing) if the parent does not exist. Re-adding an
    /// existing child does not duplicate the `Contains` edge.
    pub fn add_child(&mut self, parent_key: &str, node: GraphNode) -> Option<NodeIndex> {
        let parent_idx = *self.key_index.get(parent_key)?;
        let child_idx = self.add_node(node);
        let already_linked = self
            .graph
            .edges_directed(child_idx, Direction::Incoming)
            .any(|e| e.source() == parent_idx && matches!(e.weight(), EdgeKind::Contains));
        if !already_linked {
            self.graph.add_edge(parent_idx, child_idx, EdgeKind::Contains);
        }
        Some(child_idx)
    }

    /// Add an edge only when both endpoints already exist. Returns whether an edge was added.
    pub fn add_edge_if_present(&mut self, source: &str, target: &str, kind: EdgeKind) -> bool {
        match (self.key_index.get(source), self.key_index.get(target)) {
            (Some(&from), Some(&to)) => {
                self.graph.add_edge(from, to, kind);
                true
            }
            _ => false,
        }
    }

    /// Remove a node and all of its incident edges.
    pub fn remove_node(&mut self, key: &str) -> Option<GraphNode> {
        let idx = self.key_index.remove(key)?;
        self.summaries.remove(key);
        self.graph.remove_node(idx)
    }

    pub fn node(&self, key: &str) -> Option<&GraphNode> {
        self.key_index.get(key).map(|&idx| &self.graph[idx])
    }

    pub fn index_of(&self, key: &str) -> Option<NodeIndex> {
        self.key_index.get(key).copied()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.key_index.contains_key(key)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All nodes in index order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.graph.node_indices().map(move |idx| &self.graph[idx])
    }

    /// All nodes of the given kind, in index order.
    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &GraphNode> {
        self.nodes().filter(move |n| n.kind() == kind)
    }

    /// All edges as `(source key, target key, kind)`, in edge index order.
    pub fn edges(&self) -> impl Iterator<Item = (String, String, &EdgeKind)> {
        self.graph.edge_references().map(move |e| {
            (
                self.graph[e.source()].key(),
                self.graph[e.target()].key(),
                e.weight(),
            )
        })
    }

    /// Number of edges whose tag matches `kind` (payload ignored).
    pub fn edges_of_kind(&self, kind: &EdgeKind) -> usize {
        self.graph
            .edge_references()
            .filter(|e| e.weight().same_kind(kind))
            .count()
    }

    /// Number of `source -> target` edges whose tag matches `kind`.
    pub fn count_edges(&self, source: &str, target: &str, kind: &EdgeKind) -> usize {
        let (Some(from), Some(to)) = (self.index_of(source), self.index_of(target)) else {
            return 0;
        };
        self.graph
            .edges_directed(from, Direction::Outgoing)
            .filter(|e| e.target() == to && e.weight().same_kind(kind))
            .count()
    }

    pub fn has_edge(&self, source: &str, target: &str, kind: &EdgeKind) -> bool {
        self.count_edges(source, target, kind) > 0
    }

    /// Nodes directly contained by `key`.
    pub fn children(&self, key: &str) -> Vec<&GraphNode> {
        self.neighbors_where(key, Direction::Outgoing, |kind, _| {
            matches!(kind, EdgeKind::Contains)
        })
        .into_iter()
        .filter_map(|k| self.node(&k))
        .collect()
    }

    /// The node that contains `key`, if any (the root has none).
    pub fn parent(&self, key: &str) -> Option<&GraphNode> {
        let idx = self.index_of(key)?;
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .find(|e| matches!(e.weight(), EdgeKind::Contains))
            .map(|e| &self.graph[e.source()])
    }

    /// Keys of the nodes adjacent to `key` in `direction` whose connecting edge and node
    /// satisfy `predicate`. Each neighbour is reported once, in edge order.
    pub fn neighbors_where<F>(&self, key: &str, direction: Direction, predicate: F) -> Vec<String>
    where
        F: Fn(&EdgeKind, &GraphNode) -> bool,
    {
        let Some(idx) = self.index_of(key) else {
            return Vec::new();
        };
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for edge in self.edges_in_order(idx, direction) {
            let other = match direction {
                Direction::Outgoing => edge.target(),
                Direction::Incoming => edge.source(),
            };
            let node = &self.graph[other];
            if predicate(edge.weight(), node) && seen.insert(other) {
                out.push(node.key());
            }
        }
        out
    }

    /// Edges incident to `idx` in `direction`, in insertion order.
    ///
    /// petgraph walks adjacency lists newest-first; sorting by edge index keeps every
    /// traversal aligned with the order the builder added edges in.
    pub fn edges_in_order(&self, idx: NodeIndex, direction: Direction) -> Vec<EdgeReference<'_, EdgeKind>> {
        let mut edges: Vec<_> = self.graph.edges_directed(idx, direction).collect();
        edges.sort_by_key(|e| e.id());
        edges
    }

    /// Keys reached by a breadth-first expansion from `seeds` in both directions, up to `depth`
    /// hops, following only edges accepted by `predicate`. Seeds come first.
    pub fn neighborhood<F>(&self, seeds: &[&str], depth: usize, predicate: F) -> Vec<String>
    where
        F: Fn(&EdgeKind, &GraphNode) -> bool,
    {
        crate::query::neighbors::neighborhood(self, seeds, depth, predicate)
            .into_iter()
            .map(|n| n.key)
            .collect()
    }

    /// Attach a summary to an existing node. Keys and edges are untouched.
    pub fn set_summary(&mut self, key: &str, summary: impl Into<String>) -> bool {
        if !self.contains_key(key) {
            return false;
        }
        self.summaries.insert(key.to_owned(), summary.into());
        true
    }

    pub fn summary(&self, key: &str) -> Option<&str> {
        self.summaries.get(key).map(String::as_str)
    }
}
