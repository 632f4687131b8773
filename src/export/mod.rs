pub mod dot;
pub mod model;

use anyhow::Context;

use crate::enrich::GraphSnapshot;
use crate::graph::CodeGraph;

pub use dot::export_dot;
use model::ExportFormat;

/// Render the graph in the requested format.
pub fn export_graph(graph: &CodeGraph, format: ExportFormat, repo_id: &str) -> anyhow::Result<String> {
    match format {
        ExportFormat::Dot => Ok(export_dot(graph)),
        ExportFormat::Json => {
            let snapshot = GraphSnapshot::from_graph(graph, repo_id);
            serde_json::to_string_pretty(&snapshot).context("serializing graph snapshot")
        }
    }
}
