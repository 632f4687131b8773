//! Dependency graph builder for Python repositories.
//!
//! [`build_graph`] walks a repository and returns a [`CodeGraph`] of directory, file,
//! generic-file, README, class and function nodes linked by `contains`, `imports`, `inherits`
//! and `invokes` edges. The [`enrich`] module defines the interfaces of the stages that
//! summarize, embed and persist a built graph.

pub mod builder;
pub mod config;
pub mod enrich;
pub mod export;
pub mod graph;
pub mod parser;
pub mod query;
pub mod resolver;
pub mod walker;

pub use builder::{BuildOptions, BuildOutput, BuildStats, build_graph};
pub use graph::CodeGraph;
