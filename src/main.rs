mod cli;
mod output;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{BuildArgs, Cli, Commands};
use output::IndexSummary;
use repo_graph::config::RepoGraphConfig;
use repo_graph::enrich::source::repo_id_from_locator;
use repo_graph::enrich::{GraphSink, GraphSnapshot, JsonFileSink, LocalDir, RepoSource};
use repo_graph::graph::edge::EdgeKind;
use repo_graph::query::neighbors::{edge_filter, neighborhood};
use repo_graph::query::stats::graph_stats;
use repo_graph::{BuildOptions, BuildOutput, build_graph};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .init();

    match cli.command {
        Commands::Index {
            path,
            json,
            output: snapshot_path,
            repo_id,
            build,
        } => {
            let root = fetch(&path)?;
            let repo_id = repo_id.unwrap_or_else(|| default_repo_id(&root));
            let start = Instant::now();
            let built = build_repo(&root, &build);
            let elapsed_secs = start.elapsed().as_secs_f64();

            if let Some(path) = snapshot_path {
                let snapshot = GraphSnapshot::from_graph(&built.graph, &repo_id);
                JsonFileSink::new(&path)
                    .write(&snapshot)
                    .with_context(|| format!("writing snapshot to {}", path.display()))?;
            }

            output::print_summary(
                &IndexSummary {
                    repo_id: &repo_id,
                    stats: &built.stats,
                    elapsed_secs,
                },
                json,
            );
        }

        Commands::Neighbors {
            path,
            keys,
            depth,
            edge,
            json,
            build,
        } => {
            let root = fetch(&path)?;
            let built = build_repo(&root, &build);

            let kinds = parse_edge_kinds(&edge)?;
            for key in &keys {
                if !built.graph.contains_key(key) {
                    eprintln!("warning: no node with key {key:?}");
                }
            }
            let seeds: Vec<&str> = keys.iter().map(String::as_str).collect();
            let result = neighborhood(&built.graph, &seeds, depth, edge_filter(&kinds));
            if result.is_empty() {
                bail!("none of the given keys is a node of the graph");
            }
            output::print_neighbors(&result, json);
        }

        Commands::Export {
            path,
            format,
            repo_id,
            build,
        } => {
            let root = fetch(&path)?;
            let repo_id = repo_id.unwrap_or_else(|| default_repo_id(&root));
            let built = build_repo(&root, &build);
            let rendered = repo_graph::export::export_graph(&built.graph, format, &repo_id)?;
            print!("{rendered}");
        }

        Commands::Stats { path, json, build } => {
            let root = fetch(&path)?;
            let built = build_repo(&root, &build);
            output::print_stats(&graph_stats(&built.graph), json);
        }
    }

    Ok(())
}

/// Validate the repository path through the local source.
fn fetch(path: &Path) -> Result<PathBuf> {
    LocalDir.fetch(&path.to_string_lossy())
}

fn default_repo_id(root: &Path) -> String {
    repo_id_from_locator(&root.to_string_lossy())
}

/// Load `repo-graph.toml`, apply the CLI flags on top and build.
fn build_repo(root: &Path, args: &BuildArgs) -> BuildOutput {
    let mut options: BuildOptions = RepoGraphConfig::load(root).to_options();
    options.exclude_tests |= args.exclude_tests;
    options.follow_relative_imports |= args.follow_relative_imports;
    options.respect_gitignore |= args.respect_gitignore;
    build_graph(root, &options)
}

fn parse_edge_kinds(names: &[String]) -> Result<Vec<EdgeKind>> {
    names
        .iter()
        .map(|name| {
            EdgeKind::from_str_loose(name.trim()).with_context(|| {
                format!("unknown edge kind {name:?} (expected contains, imports, inherits or invokes)")
            })
        })
        .collect()
}
