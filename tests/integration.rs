/// Integration test suite: drives the compiled `repo-graph` binary against small Python
/// repositories written to temporary directories.
///
/// The `CARGO_BIN_EXE_repo-graph` environment variable is set by Cargo during `cargo test` to
/// point to the compiled binary for the current profile.
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use repo_graph::enrich::GraphSnapshot;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_repo-graph"))
}

/// Run a repo-graph command and assert it exits successfully.
/// Returns stdout as a String.
fn run_success(args: &[&str]) -> String {
    let out = Command::new(binary())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to invoke repo-graph binary");
    let stdout = String::from_utf8_lossy(&out.stdout).to_string();
    let stderr = String::from_utf8_lossy(&out.stderr).to_string();
    assert!(
        out.status.success(),
        "command {:?} failed with status {:?}\nstdout: {}\nstderr: {}",
        args,
        out.status,
        stdout,
        stderr
    );
    stdout
}

/// Run a repo-graph command and assert it exits with a non-zero status.
/// Returns (stdout, stderr) as Strings.
fn run_failure(args: &[&str]) -> (String, String) {
    let out = Command::new(binary())
        .args(args)
        .output()
        .expect("failed to invoke repo-graph binary");
    let stdout = String::from_utf8_lossy(&out.stdout).to_string();
    let stderr = String::from_utf8_lossy(&out.stderr).to_string();
    assert!(
        !out.status.success(),
        "command {:?} expected to fail but exited successfully\nstdout: {}\nstderr: {}",
        args,
        stdout,
        stderr
    );
    (stdout, stderr)
}

fn write_repo(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    for (rel, contents) in files {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }
    dir
}

fn path_str(p: &Path) -> &str {
    p.to_str().expect("utf-8 temp path")
}

/// Export the JSON snapshot of a repository.
fn snapshot(dir: &Path, extra: &[&str]) -> GraphSnapshot {
    let mut args = vec!["export", path_str(dir), "--format", "json", "--repo-id", "fixture"];
    args.extend_from_slice(extra);
    let stdout = run_success(&args);
    serde_json::from_str(&stdout).expect("export --format json must print a snapshot")
}

/// A small repository covering every node and edge kind.
fn sample_repo() -> TempDir {
    write_repo(&[
        ("README.md", "# Sample\n\nA tiny project.\n"),
        ("a.py", "class Sub(Base): pass\nclass Base: pass\n"),
        ("pkg/__init__.py", ""),
        ("pkg/mod.py", "class Foo: pass\n\ndef bar(): pass\n\ndef outer():\n    def inner():\n        pass\n"),
        ("main.py", "from pkg import mod\nimport pkg.mod as m\n\ndef run():\n    helper()\n"),
        ("tools/__pycache__/cached.py", ""),
        ("tools/venv/site.py", ""),
        ("config.yaml", "key: value\n"),
    ])
}

// ---------------------------------------------------------------------------
// Graph scenarios through the JSON snapshot
// ---------------------------------------------------------------------------

#[test]
fn test_symbols_and_containment() {
    let dir = sample_repo();
    let snap = snapshot(dir.path(), &[]);

    assert_eq!(snap.repo_id, "fixture");
    for key in ["pkg/mod.py", "pkg/mod.py:Foo", "pkg/mod.py:bar"] {
        assert!(snap.node(key).is_some(), "missing node {key}");
    }
    assert!(snap.has_edge("pkg/mod.py", "pkg/mod.py:Foo", "contains"));
    assert!(snap.has_edge("pkg/mod.py", "pkg/mod.py:bar", "contains"));
    assert!(snap.has_edge("pkg/mod.py:outer", "pkg/mod.py:outer.inner", "contains"));
    assert!(snap.has_edge("/", "pkg", "contains"));
}

#[test]
fn test_forward_base_class_is_linked() {
    let dir = sample_repo();
    let snap = snapshot(dir.path(), &[]);
    assert!(snap.has_edge("a.py:Sub", "a.py:Base", "inherits"));
}

#[test]
fn test_imports_are_resolved() {
    let dir = sample_repo();
    let snap = snapshot(dir.path(), &[]);

    assert!(snap.has_edge("main.py", "pkg/mod.py", "imports"));
    // `from pkg import mod` and `import pkg.mod as m` target the same file: one edge.
    let count = snap
        .edges
        .iter()
        .filter(|e| e.source == "main.py" && e.target == "pkg/mod.py" && e.kind == "imports")
        .count();
    assert_eq!(count, 1);
}

#[test]
fn test_directory_with_only_excluded_children_has_no_node() {
    let dir = sample_repo();
    let snap = snapshot(dir.path(), &[]);
    assert!(snap.node("tools").is_none());
    assert!(snap.nodes.iter().all(|n| !n.key.starts_with("tools/")));
}

#[test]
fn test_unresolved_call_is_dropped() {
    let dir = sample_repo();
    let snap = snapshot(dir.path(), &[]);
    assert!(snap.node("main.py:run").is_some());
    assert!(!snap.edges.iter().any(|e| e.source == "main.py:run" && e.kind == "invokes"));
}

#[test]
fn test_readme_and_generic_files() {
    let dir = sample_repo();
    let snap = snapshot(dir.path(), &[]);

    let readme = snap.node("__README__").expect("README node");
    assert_eq!(readme.text.as_deref(), Some("# Sample\n\nA tiny project.\n"));
    assert!(snap.has_edge("/", "__README__", "contains"));
    assert_eq!(
        snap.node("config.yaml").map(|n| n.kind),
        Some(repo_graph::graph::node::NodeKind::GenericFile)
    );
}

#[test]
fn test_every_node_but_root_has_one_container() {
    let dir = sample_repo();
    let snap = snapshot(dir.path(), &[]);
    for node in &snap.nodes {
        let containers = snap
            .edges
            .iter()
            .filter(|e| e.kind == "contains" && e.target == node.key)
            .count();
        let expected = if node.key == "/" { 0 } else { 1 };
        assert_eq!(containers, expected, "{} has {containers} containers", node.key);
    }
}

#[test]
fn test_export_is_deterministic() {
    let dir = sample_repo();
    let first = run_success(&["export", path_str(dir.path()), "--format", "json"]);
    let second = run_success(&["export", path_str(dir.path()), "--format", "json"]);
    assert_eq!(first, second);
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[test]
fn test_index_human_summary() {
    let dir = sample_repo();
    let stdout = run_success(&["index", path_str(dir.path())]);
    assert!(stdout.contains("Indexed"), "stdout: {stdout}");
    assert!(stdout.contains("4 source files"), "stdout: {stdout}");
    assert!(stdout.contains("README"), "stdout: {stdout}");
}

#[test]
fn test_index_json_summary() {
    let dir = sample_repo();
    let stdout = run_success(&["index", path_str(dir.path()), "--json", "--repo-id", "demo"]);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(json["repo_id"], "demo");
    assert_eq!(json["files"], 4);
    assert_eq!(json["classes"], 3);
    assert_eq!(json["inherits_edges"], 1);
    assert!(json["elapsed_secs"].is_number());
}

#[test]
fn test_index_writes_snapshot_file() {
    let dir = sample_repo();
    let out_dir = tempfile::tempdir().unwrap();
    let out = out_dir.path().join("graph.json");
    run_success(&["index", path_str(dir.path()), "--output", path_str(&out), "--repo-id", "demo"]);

    let snap: GraphSnapshot = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(snap.repo_id, "demo");
    assert!(snap.has_edge("main.py", "pkg/mod.py", "imports"));
    let alias = snap
        .edges
        .iter()
        .find(|e| e.kind == "imports" && e.source == "main.py")
        .and_then(|e| e.alias.clone());
    // The first import of the file wins; it carries no alias.
    assert_eq!(alias, None);
}

#[test]
fn test_exclude_tests_flag() {
    let dir = write_repo(&[("app.py", ""), ("tests/test_app.py", "def test_x(): pass\n")]);

    let snap = snapshot(dir.path(), &[]);
    assert!(snap.node("tests/test_app.py").is_some());

    let snap = snapshot(dir.path(), &["--exclude-tests"]);
    assert!(snap.node("tests").is_none());
    assert!(snap.node("tests/test_app.py").is_none());
}

#[test]
fn test_config_file_is_honoured() {
    let dir = write_repo(&[
        ("app.py", ""),
        ("build/gen.py", ""),
        ("repo-graph.toml", "extra_exclude_dirs = [\"build\"]\n"),
    ]);
    let snap = snapshot(dir.path(), &[]);
    assert!(snap.node("build").is_none());
    assert!(snap.node("app.py").is_some());
}

#[test]
fn test_malformed_config_falls_back_to_defaults() {
    let dir = write_repo(&[("app.py", ""), ("repo-graph.toml", "exclude_dirs = 12\n")]);
    let snap = snapshot(dir.path(), &[]);
    assert!(snap.node("app.py").is_some());
}

#[test]
fn test_neighbors_command() {
    let dir = sample_repo();
    let stdout = run_success(&[
        "neighbors",
        path_str(dir.path()),
        "a.py:Base",
        "--edge",
        "inherits",
        "--json",
    ]);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    let keys: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, vec!["a.py:Base", "a.py:Sub"]);
}

#[test]
fn test_neighbors_rejects_unknown_edge_kind() {
    let dir = sample_repo();
    let (_, stderr) = run_failure(&["neighbors", path_str(dir.path()), "a.py", "--edge", "owns"]);
    assert!(stderr.contains("unknown edge kind"), "stderr: {stderr}");
}

#[test]
fn test_neighbors_unknown_key_fails() {
    let dir = sample_repo();
    run_failure(&["neighbors", path_str(dir.path()), "nope.py"]);
}

#[test]
fn test_stats_json() {
    let dir = sample_repo();
    let stdout = run_success(&["stats", path_str(dir.path()), "--json"]);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(json["nodes_by_kind"]["file"], 4);
    assert_eq!(json["nodes_by_kind"]["readme"], 1);
    assert_eq!(json["edges_by_kind"]["inherits"], 1);
}

#[test]
fn test_export_dot() {
    let dir = sample_repo();
    let stdout = run_success(&["export", path_str(dir.path())]);
    assert!(stdout.starts_with("digraph repo_graph {"));
    assert!(stdout.contains("arrowhead=onormal"));
}

#[test]
fn test_missing_path_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing");
    let (_, stderr) = run_failure(&["index", path_str(&missing)]);
    assert!(stderr.contains("does not exist"), "stderr: {stderr}");
}
