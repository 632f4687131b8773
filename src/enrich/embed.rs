use serde::Serialize;
use tracing::{info, warn};

use crate::graph::CodeGraph;
use crate::graph::node::GraphNode;

/// Upper bound on the characters sent for one node (roughly the 8191-token input limit of
/// common embedding models).
pub const MAX_EMBEDDING_CHARS: usize = 32_000;

/// Turns text into a vector.
pub trait Embedder {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}

/// The embedding of one node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeEmbedding {
    pub key: String,
    pub vector: Vec<f32>,
}

/// The text embedded for a node without a summary: kind, key, owning file, code and line range.
pub fn embedding_text(node: &GraphNode) -> String {
    let code = node.text().unwrap_or_default().trim();
    let (start, end) = node
        .span()
        .map(|s| (s.start_line.to_string(), s.end_line.to_string()))
        .unwrap_or_default();
    let text = format!(
        "Node ID: {}\nType: {}\nFile: {}\nCode:\n{code}\nLines: {start}-{end}",
        node.key(),
        node.kind().as_str(),
        node.path(),
    );
    truncate(text)
}

/// The text embedded for a node with a summary: the summary replaces code and lines.
pub fn summary_embedding_text(node: &GraphNode, summary: &str) -> String {
    let text = format!(
        "Node ID: {}\nType: {}\nFile: {}\nSummary:\n{}",
        node.key(),
        node.kind().as_str(),
        node.path(),
        summary.trim(),
    );
    truncate(text)
}

/// Embed every node, preferring its summary when one is attached. Nodes whose embedding fails
/// are logged and left out.
pub fn embed_graph(graph: &CodeGraph, embedder: &dyn Embedder) -> Vec<NodeEmbedding> {
    let total = graph.node_count();
    let mut out = Vec::with_capacity(total);

    for (done, node) in graph.nodes().enumerate() {
        let key = node.key();
        let text = match graph.summary(&key).filter(|s| !s.trim().is_empty()) {
            Some(summary) => summary_embedding_text(node, summary),
            None => embedding_text(node),
        };
        match embedder.embed(&text) {
            Ok(vector) => out.push(NodeEmbedding { key, vector }),
            Err(err) => warn!("failed to embed {key}: {err:#}"),
        }
        if (done + 1) % 10 == 0 || done + 1 == total {
            info!("[{}/{}] embeddings done", done + 1, total);
        }
    }
    out
}

fn truncate(mut text: String) -> String {
    if let Some((byte_idx, _)) = text.char_indices().nth(MAX_EMBEDDING_CHARS) {
        text.truncate(byte_idx);
    }
    text
}
