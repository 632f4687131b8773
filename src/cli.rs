use std::path::PathBuf;

use clap::{Parser, Subcommand};

use repo_graph::export::model::ExportFormat;

/// Builds a dependency graph of a Python repository.
///
/// repo-graph walks a repository, parses every Python file and links directories, files,
/// classes and functions by containment, imports, inheritance and calls.
#[derive(Parser, Debug)]
#[command(
    name = "repo-graph",
    version,
    about,
    long_about = None,
    propagate_version = true,
)]
pub struct Cli {
    /// Log every scanned directory and file to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Build flags shared by every subcommand. They override `repo-graph.toml` when set.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Skip every file and directory whose name starts with "test".
    #[arg(long)]
    pub exclude_tests: bool,

    /// Resolve relative imports that climb above the repository root from the root.
    #[arg(long)]
    pub follow_relative_imports: bool,

    /// Honour .gitignore files while walking.
    #[arg(long)]
    pub respect_gitignore: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the graph of a repository and print a summary.
    Index {
        /// Path to the repository root.
        path: PathBuf,

        /// Output the summary as JSON instead of human-readable text.
        #[arg(long)]
        json: bool,

        /// Write the full graph snapshot as JSON to this file.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Repository id recorded in the snapshot (defaults to the directory name).
        #[arg(long)]
        repo_id: Option<String>,

        #[command(flatten)]
        build: BuildArgs,
    },

    /// Print the neighbourhood of one or more nodes.
    ///
    /// Expands breadth-first along edges in both directions.
    Neighbors {
        /// Path to the repository root.
        path: PathBuf,

        /// Node keys, e.g. "pkg/mod.py" or "pkg/mod.py:Class.method".
        #[arg(required = true)]
        keys: Vec<String>,

        /// Maximum number of hops.
        #[arg(long, default_value_t = 1)]
        depth: usize,

        /// Edge kinds to follow (comma-separated: contains,imports,inherits,invokes). All when omitted.
        #[arg(long, value_delimiter = ',')]
        edge: Vec<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        build: BuildArgs,
    },

    /// Export the graph as Graphviz DOT or as the JSON snapshot.
    Export {
        /// Path to the repository root.
        path: PathBuf,

        #[arg(long, value_enum, default_value_t = ExportFormat::Dot)]
        format: ExportFormat,

        /// Repository id recorded in the JSON snapshot (defaults to the directory name).
        #[arg(long)]
        repo_id: Option<String>,

        #[command(flatten)]
        build: BuildArgs,
    },

    /// Print node and edge counts by kind.
    Stats {
        /// Path to the repository root.
        path: PathBuf,

        /// Output as JSON.
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        build: BuildArgs,
    },
}
