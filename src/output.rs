use serde::Serialize;

use repo_graph::builder::BuildStats;
use repo_graph::query::neighbors::Neighbor;
use repo_graph::query::stats::GraphStats;

/// Summary of an `index` run.
#[derive(Debug, Serialize)]
pub struct IndexSummary<'a> {
    pub repo_id: &'a str,
    #[serde(flatten)]
    pub stats: &'a BuildStats,
    /// Wall-clock time for the build in seconds.
    pub elapsed_secs: f64,
}

/// Print a summary of the indexing run.
///
/// - `json = true`: emit a pretty-printed JSON object to stdout.
/// - `json = false`: emit a cargo-style human-readable summary to stdout.
///
/// Skipped files are reported on **stderr** so that the stdout stream remains clean for
/// downstream JSON consumers.
pub fn print_summary(summary: &IndexSummary, json: bool) {
    let stats = summary.stats;
    if json {
        match serde_json::to_string_pretty(summary) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("error serialising stats: {}", e),
        }
        return;
    }

    println!(
        "Indexed {} in {:.2}s",
        summary.repo_id, summary.elapsed_secs
    );
    println!(
        "  {} directories, {} source files, {} generic files{}",
        stats.directories,
        stats.files,
        stats.generic_files,
        if stats.readme { ", README" } else { "" },
    );
    println!("  {} classes, {} functions", stats.classes, stats.functions);
    println!(
        "  {} contains, {} imports, {} inherits, {} invokes edges",
        stats.contains_edges, stats.import_edges, stats.inherits_edges, stats.invokes_edges,
    );
    if stats.pruned_directories > 0 {
        println!("  Pruned {} empty directories", stats.pruned_directories);
    }

    if stats.unparseable > 0 {
        eprintln!("  {} files without symbols (parse errors)", stats.unparseable);
    }
    if stats.unreadable > 0 {
        eprintln!("  {} files skipped (unreadable)", stats.unreadable);
    }
}

/// Print graph statistics.
pub fn print_stats(stats: &GraphStats, json: bool) {
    if json {
        match serde_json::to_string_pretty(stats) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("error serialising stats: {}", e),
        }
        return;
    }

    println!("Nodes: {}", stats.node_count);
    for (kind, count) in &stats.nodes_by_kind {
        println!("  {kind:<13}{count}");
    }
    println!("Edges: {}", stats.edge_count);
    for (kind, count) in &stats.edges_by_kind {
        println!("  {kind:<13}{count}");
    }
    if stats.aliased_imports > 0 {
        println!("  ({} aliased imports)", stats.aliased_imports);
    }
}

/// Print a neighbourhood, one node per line indented by depth.
pub fn print_neighbors(neighbors: &[Neighbor], json: bool) {
    if json {
        match serde_json::to_string_pretty(neighbors) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("error serialising neighbours: {}", e),
        }
        return;
    }

    for n in neighbors {
        println!("{}{} [{}]", "  ".repeat(n.depth), n.key, n.kind.as_str());
    }
    println!("{} nodes", neighbors.len());
}
