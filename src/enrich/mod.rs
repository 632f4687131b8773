//! Interfaces to the stages that consume a built graph: summarization, embedding, persistence
//! and repository acquisition. Concrete clients are passed in by the caller.

pub mod embed;
pub mod sink;
pub mod source;
pub mod summary;

pub use embed::{Embedder, NodeEmbedding, embed_graph, embedding_text};
pub use sink::{EdgeRecord, GraphSink, GraphSnapshot, JsonFileSink, NodeRecord};
pub use source::{LocalDir, RepoSource};
pub use summary::{AnnotateStats, Summarizer, SummaryRequest, annotate_graph, edge_summary};
