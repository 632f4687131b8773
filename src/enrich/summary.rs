use serde::Serialize;
use tracing::{info, warn};

use crate::graph::CodeGraph;
use crate::graph::edge::EdgeKind;
use crate::graph::node::{GraphNode, NodeKind, README_KEY};

/// Stored on a node whose summary could not be produced.
pub const SUMMARY_FAILED: &str = "Summary generation failed.";

/// How much of the README accompanies every request.
pub const README_EXCERPT_CHARS: usize = 1500;

/// A node mentioned as context in a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelatedNode {
    pub key: String,
    pub kind: NodeKind,
    /// Declaration text for symbols; for a directory's files, the text of the file's first
    /// class or function.
    pub code: Option<String>,
}

/// What a summarizer gets to see, by node kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SummaryContext {
    /// A class or function with the other symbols declared directly in its file.
    Symbol {
        file_path: String,
        code: String,
        siblings: Vec<RelatedNode>,
    },
    /// A source file with its top-level classes and functions.
    File { children: Vec<RelatedNode> },
    GenericFile,
    /// A directory with its files, each with a code sample when available.
    Directory { children: Vec<RelatedNode> },
}

/// One summarization request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRequest {
    pub key: String,
    pub kind: NodeKind,
    /// Leading excerpt of the repository README, empty when there is none.
    pub readme: String,
    pub context: SummaryContext,
}

impl SummaryRequest {
    /// Assemble the request for `key`. README nodes and unknown keys get none.
    pub fn for_node(graph: &CodeGraph, key: &str, readme: &str) -> Option<Self> {
        let node = graph.node(key)?;
        let context = match node {
            GraphNode::Class(info) | GraphNode::Function(info) => SummaryContext::Symbol {
                file_path: info.path.clone(),
                code: info.text.clone(),
                siblings: symbol_children(graph, &info.path)
                    .into_iter()
                    .filter(|s| s.key != key)
                    .collect(),
            },
            GraphNode::File { .. } => SummaryContext::File {
                children: symbol_children(graph, key),
            },
            GraphNode::GenericFile { .. } => SummaryContext::GenericFile,
            GraphNode::Directory { .. } => SummaryContext::Directory {
                children: graph
                    .children(key)
                    .into_iter()
                    .filter(|c| matches!(c.kind(), NodeKind::File | NodeKind::GenericFile))
                    .map(|c| {
                        let child_key = c.key();
                        RelatedNode {
                            code: symbol_children(graph, &child_key)
                                .into_iter()
                                .find_map(|s| s.code),
                            key: child_key,
                            kind: c.kind(),
                        }
                    })
                    .collect(),
            },
            GraphNode::Readme { .. } => return None,
        };
        Some(Self {
            key: key.to_owned(),
            kind: node.kind(),
            readme: excerpt(readme, README_EXCERPT_CHARS).to_owned(),
            context,
        })
    }

    /// Render the request as a plain-text prompt.
    pub fn prompt(&self) -> String {
        let kind = self.kind.as_str().to_uppercase();
        let mut out = format!("You are analyzing a {kind} node from a software codebase.\n\n");
        match &self.context {
            SummaryContext::Symbol {
                file_path,
                code,
                siblings,
            } => {
                out.push_str(&format!("README:\n{}\n\n", self.readme));
                out.push_str(&format!("Location: {file_path}\nNode ID: {}\n\n", self.key));
                out.push_str(&format!("Main Code:\n{code}\n\n"));
                out.push_str("Other functions/classes in this file:\n");
                for s in siblings.iter().take(5) {
                    let shown = if s.code.is_some() { "(code shown)" } else { "(code hidden)" };
                    out.push_str(&format!("- {}: {shown}\n", s.key));
                }
                out.push_str(&format!(
                    "\nSummarize the purpose of the {} in one sentence.\n",
                    self.kind.as_str()
                ));
            }
            SummaryContext::File { children } => {
                out.push_str(&format!("README:\n{}\n\n", self.readme));
                out.push_str(&format!("File Path: {}\n\n", self.key));
                out.push_str("Top elements defined in file:\n");
                for c in children.iter().take(3) {
                    match &c.code {
                        Some(code) => out.push_str(&format!("- {}:\n{}\n", c.key, excerpt(code, 300))),
                        None => out.push_str(&format!("- {}: (code not available)\n", c.key)),
                    }
                }
                let others: Vec<&str> = children.iter().skip(3).take(3).map(|c| c.key.as_str()).collect();
                out.push_str(&format!("\nOther symbols: {}\n", others.join(", ")));
                out.push_str("\nSummarize the purpose of this file in 2 sentences.\n");
            }
            SummaryContext::GenericFile => {
                out.push_str(&format!("File Path: {}\n", self.key));
                out.push_str(&format!("README:\n{}\n\n", excerpt(&self.readme, 1000)));
                out.push_str(
                    "Give a 1-2 sentence summary of what this file might contain or why it might be useful.\n",
                );
            }
            SummaryContext::Directory { children } => {
                out.push_str(&format!("Directory Path: {}\n", self.key));
                out.push_str(&format!("README:\n{}\n\n", self.readme));
                out.push_str("It contains the following files:\n");
                for c in children.iter().take(5) {
                    if c.code.is_some() {
                        out.push_str(&format!("- {}: (sample code included)\n", c.key));
                    } else {
                        out.push_str(&format!("- {}\n", c.key));
                    }
                }
                out.push_str("\nSummarize the directory's purpose in 1-2 sentences.\n");
            }
        }
        out
    }
}

/// Produces a natural-language summary for one node.
pub trait Summarizer {
    fn summarize(&self, request: &SummaryRequest) -> anyhow::Result<String>;
}

/// Outcome of an annotation run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotateStats {
    pub summarized: usize,
    pub failed: usize,
    /// Nodes that get no request (the README).
    pub skipped: usize,
}

/// Attach a summary to every node in place. Keys and edges are left untouched.
///
/// A failing request stores [`SUMMARY_FAILED`] on the node and the run continues.
pub fn annotate_graph(graph: &mut CodeGraph, summarizer: &dyn Summarizer) -> AnnotateStats {
    let readme = graph
        .node(README_KEY)
        .and_then(|n| n.text())
        .unwrap_or_default()
        .to_owned();
    let keys: Vec<String> = graph.nodes().map(|n| n.key()).collect();
    let total = keys.len();
    let mut stats = AnnotateStats::default();

    for (done, key) in keys.iter().enumerate() {
        let Some(request) = SummaryRequest::for_node(graph, key, &readme) else {
            stats.skipped += 1;
            continue;
        };
        let summary = match summarizer.summarize(&request) {
            Ok(text) => {
                stats.summarized += 1;
                text.trim().to_owned()
            }
            Err(err) => {
                warn!("failed to annotate {key}: {err:#}");
                stats.failed += 1;
                SUMMARY_FAILED.to_owned()
            }
        };
        graph.set_summary(key, summary);

        if (done + 1) % 10 == 0 || done + 1 == total {
            info!("[{}/{}] nodes annotated", done + 1, total);
        }
    }
    stats
}

/// Fixed one-line description of an edge. Edges are never sent to a summarizer.
pub fn edge_summary(source: &str, kind: &EdgeKind, target: &str) -> String {
    format!("Node {source} {} node {target}", kind.as_str())
}

/// Class and function nodes directly contained by `key`, with their text.
fn symbol_children(graph: &CodeGraph, key: &str) -> Vec<RelatedNode> {
    graph
        .children(key)
        .into_iter()
        .filter(|c| c.is_symbol())
        .map(|c| RelatedNode {
            key: c.key(),
            kind: c.kind(),
            code: c.text().map(str::to_owned),
        })
        .collect()
}

/// The first `max_chars` characters of `text`.
fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
