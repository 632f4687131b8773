use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::graph::CodeGraph;
use crate::graph::edge::EdgeKind;
use crate::graph::node::{GraphNode, Span, SymbolInfo, symbol_key};
use crate::parser::symbols::{SymbolKind, SymbolRecord};
use crate::parser::{ParseResult, SourceParser};
use crate::resolver::{ResolveStats, resolve_all};
use crate::walker::{SourceFile, walk_repository};

/// Directory names never descended into.
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    ".git",
    ".github",
    ".mypy_cache",
    "__pycache__",
    ".idea",
    "venv",
    "env",
    "assets",
    "evaluation",
    "plots",
    "repo_index",
    "scripts",
    "ven",
];

/// Extensions of non-source text files that still get a node.
pub const DEFAULT_GENERIC_EXTENSIONS: &[&str] = &[
    "js", "jsx", "ts", "tsx", "md", "txt", "ipynb", "json", "yaml", "yml", "cfg", "toml",
];

/// Everything that controls a build.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub exclude_dirs: BTreeSet<String>,
    /// Lowercase extensions without the leading dot.
    pub generic_extensions: BTreeSet<String>,
    /// Skip every file or directory whose name starts with `test` (case-insensitive).
    pub exclude_tests: bool,
    /// Clamp relative imports that climb above the root instead of dropping them.
    pub follow_relative_imports: bool,
    pub respect_gitignore: bool,
    /// Glob patterns; a matching directory is pruned, a matching file gets no node.
    pub exclude_patterns: Vec<String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            exclude_dirs: DEFAULT_EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect(),
            generic_extensions: DEFAULT_GENERIC_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            exclude_tests: false,
            follow_relative_imports: false,
            respect_gitignore: false,
            exclude_patterns: Vec::new(),
        }
    }
}

/// Counters for one build, printed by `index` and serialized by `--json`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    pub directories: usize,
    pub files: usize,
    pub generic_files: usize,
    pub readme: bool,
    pub classes: usize,
    pub functions: usize,
    pub pruned_directories: usize,
    /// Source files kept as nodes but contributing no symbols (decode or syntax error).
    pub unparseable: usize,
    pub unreadable: usize,
    pub contains_edges: usize,
    pub import_edges: usize,
    pub inherits_edges: usize,
    pub invokes_edges: usize,
    pub unresolved_imports: usize,
}

/// The assembled graph plus what downstream stages need to re-open files.
#[derive(Debug)]
pub struct BuildOutput {
    pub graph: CodeGraph,
    /// Source-file key to absolute filesystem path.
    pub file_paths: BTreeMap<String, PathBuf>,
    pub stats: BuildStats,
}

/// Build the repository graph rooted at `root`.
///
/// Runs in four strictly ordered phases:
///
/// 1. **Walk**: directory, file, generic-file and README nodes, empty directories pruned.
/// 2. **Symbols**: every source file is parsed once; classes and functions are attached under
///    their lexical parent.
/// 3. **Imports**: resolved against the complete node set.
/// 4. **References**: inherits/invokes edges between same-file symbols.
///
/// Never fails: unreadable and unparseable files are logged and skipped, and an empty or
/// missing root still yields the root directory node.
pub fn build_graph(root: &Path, options: &BuildOptions) -> BuildOutput {
    let mut graph = CodeGraph::new();
    let mut stats = BuildStats::default();

    let walked = walk_repository(root, options, &mut graph);
    stats.directories = walked.stats.directories;
    stats.files = walked.stats.files;
    stats.generic_files = walked.stats.generic_files;
    stats.readme = walked.stats.readme;
    stats.pruned_directories = walked.stats.pruned_directories;
    stats.unreadable = walked.stats.unreadable;
    info!(
        "walk: {} directories, {} source files, {} generic files",
        stats.directories, stats.files, stats.generic_files
    );

    let file_paths = walked
        .source_files
        .iter()
        .map(|f| {
            let abs = std::path::absolute(&f.abs_path).unwrap_or_else(|_| f.abs_path.clone());
            (f.key.clone(), abs)
        })
        .collect();

    let parsed = parse_sources(&walked.source_files, &mut stats);
    for (file_key, result) in &parsed {
        register_symbols(&mut graph, file_key, &result.symbols, &mut stats);
    }
    info!("symbols: {} classes, {} functions", stats.classes, stats.functions);

    let resolved: ResolveStats = resolve_all(&mut graph, root, &parsed, options.follow_relative_imports);
    stats.unresolved_imports = resolved.unresolved_imports;

    stats.contains_edges = graph.edges_of_kind(&EdgeKind::Contains);
    stats.import_edges = graph.edges_of_kind(&EdgeKind::Imports { alias: None });
    stats.inherits_edges = graph.edges_of_kind(&EdgeKind::Inherits);
    stats.invokes_edges = graph.edges_of_kind(&EdgeKind::Invokes);
    info!(
        "edges: {} imports, {} inherits, {} invokes",
        stats.import_edges, stats.inherits_edges, stats.invokes_edges
    );

    BuildOutput {
        graph,
        file_paths,
        stats,
    }
}

/// Parse every source file once, in parallel with one parser per worker thread. Results keep
/// the walk order. Files that fail to parse are counted and left out.
fn parse_sources(files: &[SourceFile], stats: &mut BuildStats) -> Vec<(String, ParseResult)> {
    if let Err(err) = SourceParser::new() {
        error!("parser unavailable, no symbols will be extracted: {err}");
        stats.unparseable = files.len();
        return Vec::new();
    }

    let results: Vec<Option<ParseResult>> = files
        .par_iter()
        .map_init(SourceParser::new, |parser, file| {
            let parser = parser.as_mut().ok()?;
            match parser.parse_file(&file.bytes) {
                Ok(result) => Some(result),
                Err(err) => {
                    debug!("skipping symbols of {}: {err}", file.key);
                    None
                }
            }
        })
        .collect();

    let mut parsed = Vec::with_capacity(files.len());
    for (file, result) in files.iter().zip(results) {
        match result {
            Some(result) => parsed.push((file.key.clone(), result)),
            None => stats.unparseable += 1,
        }
    }
    parsed
}

/// Attach each symbol under its lexical parent: the enclosing symbol, or the file itself.
fn register_symbols(graph: &mut CodeGraph, file_key: &str, symbols: &[SymbolRecord], stats: &mut BuildStats) {
    for symbol in symbols {
        let parent = match symbol.parent_name() {
            Some(parent_name) => symbol_key(file_key, parent_name),
            None => file_key.to_owned(),
        };
        let info = SymbolInfo {
            path: file_key.to_owned(),
            qualified_name: symbol.qualified_name.clone(),
            span: Span {
                start_line: symbol.start_line,
                end_line: symbol.end_line,
            },
            text: symbol.source_text.clone(),
        };
        let node = match symbol.kind {
            SymbolKind::Class => GraphNode::Class(info),
            SymbolKind::Function => GraphNode::Function(info),
        };
        if graph.add_child(&parent, node).is_none() {
            debug!("{file_key}: parent {parent} of {} missing", symbol.qualified_name);
            continue;
        }
        match symbol.kind {
            SymbolKind::Class => stats.classes += 1,
            SymbolKind::Function => stats.functions += 1,
        }
    }
}
