use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::enrich::summary::edge_summary;
use crate::graph::CodeGraph;
use crate::graph::edge::EdgeKind;
use crate::graph::node::{NodeKind, Span};

/// One node as handed to a persistence stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub key: String,
    pub kind: NodeKind,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub span: Option<Span>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub summary: Option<String>,
}

/// One edge as handed to a persistence stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: String,
    pub target: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub alias: Option<String>,
    /// `"Node <source> <kind> node <target>"`.
    #[serde(default)]
    pub summary: String,
}

/// Every node and edge of a graph, keyed by a caller-supplied repository id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub repo_id: String,
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

impl GraphSnapshot {
    /// Capture the graph, attached summaries included, in node and edge index order.
    pub fn from_graph(graph: &CodeGraph, repo_id: &str) -> Self {
        let nodes = graph
            .nodes()
            .map(|n| {
                let key = n.key();
                NodeRecord {
                    summary: graph.summary(&key).map(str::to_owned),
                    kind: n.kind(),
                    path: n.path().to_owned(),
                    span: n.span(),
                    text: n.text().map(str::to_owned),
                    key,
                }
            })
            .collect();
        let edges = graph
            .edges()
            .map(|(source, target, kind)| EdgeRecord {
                summary: edge_summary(&source, kind, &target),
                kind: kind.as_str().to_owned(),
                alias: match kind {
                    EdgeKind::Imports { alias } => alias.clone(),
                    _ => None,
                },
                source,
                target,
            })
            .collect();
        Self {
            repo_id: repo_id.to_owned(),
            nodes,
            edges,
        }
    }

    pub fn node(&self, key: &str) -> Option<&NodeRecord> {
        self.nodes.iter().find(|n| n.key == key)
    }

    pub fn has_edge(&self, source: &str, target: &str, kind: &str) -> bool {
        self.edges
            .iter()
            .any(|e| e.source == source && e.target == target && e.kind == kind)
    }
}

/// A persistence stage for built graphs.
pub trait GraphSink {
    fn write(&mut self, snapshot: &GraphSnapshot) -> anyhow::Result<()>;
}

/// Writes snapshots as pretty-printed JSON to a file.
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl GraphSink for JsonFileSink {
    fn write(&mut self, snapshot: &GraphSnapshot) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(snapshot).context("serializing graph snapshot")?;
        fs::write(&self.path, json).with_context(|| format!("writing {}", self.path.display()))?;
        info!(
            "wrote {} nodes and {} edges to {}",
            snapshot.nodes.len(),
            snapshot.edges.len(),
            self.path.display()
        );
        Ok(())
    }
}
