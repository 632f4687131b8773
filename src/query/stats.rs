use std::collections::BTreeMap;

use serde::Serialize;

use crate::graph::CodeGraph;
use crate::graph::edge::EdgeKind;

/// Node and edge counts of a built graph, keyed by kind name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub nodes_by_kind: BTreeMap<&'static str, usize>,
    pub edges_by_kind: BTreeMap<&'static str, usize>,
    /// Imports edges carrying an `as` alias.
    pub aliased_imports: usize,
    /// Nodes with a summary attached.
    pub summarized: usize,
}

/// Compute graph statistics.
pub fn graph_stats(graph: &CodeGraph) -> GraphStats {
    let mut stats = GraphStats {
        node_count: graph.node_count(),
        edge_count: graph.edge_count(),
        ..GraphStats::default()
    };

    for node in graph.nodes() {
        *stats.nodes_by_kind.entry(node.kind().as_str()).or_default() += 1;
        if graph.summary(&node.key()).is_some() {
            stats.summarized += 1;
        }
    }

    for e in graph.graph.edge_indices() {
        let edge = &graph.graph[e];
        *stats.edges_by_kind.entry(edge.as_str()).or_default() += 1;
        if let EdgeKind::Imports { alias: Some(_) } = edge {
            stats.aliased_imports += 1;
        }
    }

    stats
}
