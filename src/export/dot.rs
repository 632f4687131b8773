use petgraph::Direction;
use petgraph::stable_graph::NodeIndex;
use petgraph::visit::EdgeRef;

use crate::graph::CodeGraph;
use crate::graph::edge::EdgeKind;
use crate::graph::node::{GraphNode, NodeKind};

/// Sanitize a node key for use as a DOT node ID.
///
/// Replaces non-alphanumeric characters with `_` and prepends `n` if the result starts with a
/// digit. Distinct keys can collide after sanitizing, so IDs are suffixed with the node index.
pub fn sanitize_dot_id(s: &str) -> String {
    let mut result: String = s
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if result.starts_with(|c: char| c.is_ascii_digit()) {
        result.insert(0, 'n');
    }
    if result.is_empty() {
        result = "node".to_string();
    }
    result
}

/// Escape a string for a double-quoted DOT attribute.
fn escape_label(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn node_fillcolor(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Directory => "#D5DBDB",
        NodeKind::File => "#FAD7A0",
        NodeKind::GenericFile => "#EAECEE",
        NodeKind::Readme => "#F9E79F",
        NodeKind::Class => "#A9DFBF",
        NodeKind::Function => "#AED6F1",
    }
}

fn node_shape(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Directory => "folder",
        NodeKind::File | NodeKind::GenericFile | NodeKind::Readme => "note",
        NodeKind::Class | NodeKind::Function => "box",
    }
}

fn node_label(node: &GraphNode) -> String {
    match node {
        GraphNode::Class(info) => format!("class {}", info.simple_name()),
        GraphNode::Function(info) => format!("fn {}", info.simple_name()),
        _ => node.key(),
    }
}

fn edge_style(kind: &EdgeKind) -> String {
    match kind {
        EdgeKind::Contains => "style=dashed color=gray".to_string(),
        EdgeKind::Imports { alias: Some(alias) } => format!("style=solid label=\"as {}\"", escape_label(alias)),
        EdgeKind::Imports { alias: None } => "style=solid".to_string(),
        EdgeKind::Inherits => "style=solid arrowhead=onormal".to_string(),
        EdgeKind::Invokes => "style=solid color=blue".to_string(),
    }
}

/// Render the whole graph as DOT: one node per graph node coloured by kind, one edge per
/// graph edge styled by kind.
pub fn export_dot(graph: &CodeGraph) -> String {
    let id_of = |idx: NodeIndex| {
        format!("{}_{}", sanitize_dot_id(&graph.graph[idx].key()), idx.index())
    };

    let mut out = String::new();
    out.push_str("digraph repo_graph {\n");
    out.push_str("    rankdir=LR;\n");
    out.push_str("    node [style=filled fontname=monospace];\n");

    for idx in graph.graph.node_indices() {
        let node = &graph.graph[idx];
        let kind = node.kind();
        out.push_str(&format!(
            "    {} [label=\"{}\" shape={} fillcolor=\"{}\" tooltip=\"{}\"];\n",
            id_of(idx),
            escape_label(&node_label(node)),
            node_shape(kind),
            node_fillcolor(kind),
            escape_label(&node.key()),
        ));
    }

    for idx in graph.graph.node_indices() {
        for edge in graph.edges_in_order(idx, Direction::Outgoing) {
            out.push_str(&format!(
                "    {} -> {} [{}];\n",
                id_of(edge.source()),
                id_of(edge.target()),
                edge_style(edge.weight()),
            ));
        }
    }

    out.push_str("}\n");
    out
}
