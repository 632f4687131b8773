use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::builder::BuildOptions;
use crate::graph::CodeGraph;
use crate::graph::node::{GraphNode, README_KEY, ROOT_KEY};
use crate::parser::languages::is_source_file;

/// README file names looked up at the repository root, in priority order.
/// Matching is case-insensitive; the first candidate with a match wins.
pub const README_CANDIDATES: &[&str] = &["README.md", "readme.md", "README.txt", "readme.txt", "README"];

/// How many leading bytes of a generic file are inspected for NUL bytes.
const BINARY_SNIFF_LEN: usize = 8192;

/// A source file registered during the walk, with the bytes read from disk.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Repository-relative path with `/` separators; also the file node's key.
    pub key: String,
    pub abs_path: PathBuf,
    pub bytes: Vec<u8>,
}

/// Counters collected while walking.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WalkStats {
    pub directories: usize,
    pub files: usize,
    pub generic_files: usize,
    pub readme: bool,
    /// Directories registered and later removed because nothing was attached under them.
    pub pruned_directories: usize,
    /// Files skipped because they could not be read (or looked binary).
    pub unreadable: usize,
}

/// Result of walking the repository tree.
#[derive(Debug, Default)]
pub struct WalkOutput {
    /// Source files in walk order.
    pub source_files: Vec<SourceFile>,
    pub stats: WalkStats,
}

/// A directory entered but not yet known to hold anything.
struct OpenDir {
    key: String,
    confirmed: bool,
}

/// Walk `root` and register the root, README, directory, file and generic-file nodes.
///
/// Entries are visited depth-first in file-name order. Directories listed in
/// `options.exclude_dirs` (and anything matching `options.exclude_patterns`) are pruned before
/// descent. A directory that ends up with no attached descendant is removed again when the walk
/// ascends past it, so no directory is left as an empty leaf.
pub fn walk_repository(root: &Path, options: &BuildOptions, graph: &mut CodeGraph) -> WalkOutput {
    let mut out = WalkOutput::default();

    graph.add_node(GraphNode::Directory {
        path: String::new(),
    });

    if let Some((name, text)) = find_readme(root) {
        debug!("found README: {name}");
        graph.add_child(ROOT_KEY, GraphNode::Readme { path: name, text });
        out.stats.readme = true;
    }

    let filter = EntryFilter::from_options(root, options);
    let walker = ignore::WalkBuilder::new(root)
        .standard_filters(false)
        .git_ignore(options.respect_gitignore)
        .git_exclude(options.respect_gitignore)
        .parents(options.respect_gitignore)
        // Read .gitignore files even when the directory is not inside a git repository.
        .require_git(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| entry.depth() == 0 || filter.keep(entry.path()))
        .build();

    let mut open_dirs: Vec<OpenDir> = Vec::new();

    for result in walker {
        let entry = match result {
            Ok(e) => e,
            Err(err) => {
                warn!("walk error: {err}");
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }

        let path = entry.path();
        let Some(key) = relative_key(root, path) else {
            continue;
        };
        let parent_key = parent_key(&key);

        close_dirs(&mut open_dirs, &parent_key, graph, &mut out.stats);

        let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
        if is_dir {
            debug!("scanning {key}");
            graph.add_child(&parent_key, GraphNode::Directory { path: key.clone() });
            open_dirs.push(OpenDir {
                key,
                confirmed: false,
            });
            continue;
        }

        if !path.is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy();

        if is_source_file(&file_name) {
            let bytes = match std::fs::read(path) {
                Ok(b) => b,
                Err(err) => {
                    debug!("skipping unreadable {key}: {err}");
                    out.stats.unreadable += 1;
                    continue;
                }
            };
            debug!("  file {key}");
            graph.add_child(&parent_key, GraphNode::File { path: key.clone() });
            confirm_open_dirs(&mut open_dirs);
            out.stats.files += 1;
            out.source_files.push(SourceFile {
                key,
                abs_path: path.to_path_buf(),
                bytes,
            });
        } else if has_generic_extension(&file_name, &options.generic_extensions) {
            if !is_readable_text(path) {
                debug!("skipping unreadable or binary {key}");
                out.stats.unreadable += 1;
                continue;
            }
            debug!("  generic {key}");
            graph.add_child(&parent_key, GraphNode::GenericFile { path: key });
            confirm_open_dirs(&mut open_dirs);
            out.stats.generic_files += 1;
        }
    }

    close_dirs(&mut open_dirs, ROOT_KEY, graph, &mut out.stats);

    out.stats.directories = graph
        .nodes()
        .filter(|n| matches!(n, GraphNode::Directory { path } if !path.is_empty()))
        .count();
    out
}

/// Pop every open directory that is not an ancestor of (or equal to) `parent_key`, removing the
/// ones that never received a child. Passing the root key closes everything.
fn close_dirs(open_dirs: &mut Vec<OpenDir>, parent_key: &str, graph: &mut CodeGraph, stats: &mut WalkStats) {
    while let Some(top) = open_dirs.last() {
        if parent_key != ROOT_KEY && is_within(parent_key, &top.key) {
            break;
        }
        let Some(top) = open_dirs.pop() else { break };
        if !top.confirmed {
            debug!("pruning empty directory {}", top.key);
            graph.remove_node(&top.key);
            stats.pruned_directories += 1;
        }
    }
}

/// Every open directory is an ancestor of the entry just attached, so all become non-empty.
fn confirm_open_dirs(open_dirs: &mut [OpenDir]) {
    for dir in open_dirs.iter_mut().rev() {
        if dir.confirmed {
            break;
        }
        dir.confirmed = true;
    }
}

/// True if `key` is `dir` or lies underneath it.
fn is_within(key: &str, dir: &str) -> bool {
    key == dir || key.strip_prefix(dir).is_some_and(|rest| rest.starts_with('/'))
}

/// Repository-relative path with `/` separators, or `None` if `path` is outside `root`.
pub fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Key of the directory holding `key` (the root key for top-level entries).
fn parent_key(key: &str) -> String {
    match key.rsplit_once('/') {
        Some((parent, _)) => parent.to_owned(),
        None => ROOT_KEY.to_owned(),
    }
}

fn has_generic_extension(file_name: &str, extensions: &BTreeSet<String>) -> bool {
    let lower = file_name.to_ascii_lowercase();
    extensions.iter().any(|ext| {
        lower
            .strip_suffix(ext.as_str())
            .is_some_and(|stem| stem.len() > 1 && stem.ends_with('.'))
    })
}

/// A generic file is kept only if it can be opened and its head contains no NUL byte.
fn is_readable_text(path: &Path) -> bool {
    let Ok(file) = File::open(path) else {
        return false;
    };
    let mut head = Vec::with_capacity(BINARY_SNIFF_LEN);
    match file.take(BINARY_SNIFF_LEN as u64).read_to_end(&mut head) {
        Ok(_) => !head.contains(&0),
        Err(_) => false,
    }
}

/// Locate the repository README among [`README_CANDIDATES`] and read it (lossily decoded).
fn find_readme(root: &Path) -> Option<(String, String)> {
    let mut names: Vec<String> = std::fs::read_dir(root)
        .ok()?
        .flatten()
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();

    for candidate in README_CANDIDATES {
        let Some(name) = names.iter().find(|n| n.eq_ignore_ascii_case(candidate)) else {
            continue;
        };
        match std::fs::read(root.join(name)) {
            Ok(bytes) => return Some((name.clone(), String::from_utf8_lossy(&bytes).into_owned())),
            Err(err) => debug!("README candidate {name} unreadable: {err}"),
        }
    }
    None
}

/// Exclusion rules applied before an entry is yielded (and, for directories, before descent).
struct EntryFilter {
    root: PathBuf,
    exclude_dirs: BTreeSet<String>,
    exclude_tests: bool,
    patterns: Vec<glob::Pattern>,
}

impl EntryFilter {
    fn from_options(root: &Path, options: &BuildOptions) -> Self {
        let patterns = options
            .exclude_patterns
            .iter()
            .filter_map(|p| match glob::Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(err) => {
                    warn!("ignoring invalid exclude pattern {p:?}: {err}");
                    None
                }
            })
            .collect();
        Self {
            root: root.to_path_buf(),
            exclude_dirs: options.exclude_dirs.clone(),
            exclude_tests: options.exclude_tests,
            patterns,
        }
    }

    fn keep(&self, path: &Path) -> bool {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let rel = relative_key(&self.root, path).unwrap_or_default();

        // The README node owns this key.
        if rel == README_KEY {
            warn!("skipping {rel}: the name is reserved for the README node");
            return false;
        }
        if path.is_dir() && self.exclude_dirs.contains(&name) {
            return false;
        }
        if self.exclude_tests && name.to_ascii_lowercase().starts_with("test") {
            return false;
        }
        !self.matches_pattern(&rel, &name)
    }

    /// Glob patterns match the repository-relative path or the entry's own name. Ancestors
    /// were checked when their directory was entered.
    fn matches_pattern(&self, rel: &str, name: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| p.matches(rel) || p.matches(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::edge::EdgeKind;
    use crate::graph::node::NodeKind;
    use std::fs;
    use tempfile::TempDir;

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("tempdir")
    }

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    fn walk(root: &Path, options: &BuildOptions) -> (CodeGraph, WalkOutput) {
        let mut graph = CodeGraph::new();
        let out = walk_repository(root, options, &mut graph);
        (graph, out)
    }

    fn keys_of(graph: &CodeGraph, kind: NodeKind) -> Vec<String> {
        let mut keys: Vec<_> = graph.nodes_of_kind(kind).map(|n| n.key()).collect();
        keys.sort();
        keys
    }

    #[test]
    fn test_registers_files_dirs_and_generic_files() {
        let dir = tmp();
        write(dir.path(), "main.py", "print(1)\n");
        write(dir.path(), "pkg/mod.py", "x = 1\n");
        write(dir.path(), "pkg/data.json", "{}");
        write(dir.path(), "logo.png", "not really a png");

        let (graph, out) = walk(dir.path(), &BuildOptions::default());

        assert_eq!(keys_of(&graph, NodeKind::File), vec!["main.py", "pkg/mod.py"]);
        assert_eq!(keys_of(&graph, NodeKind::GenericFile), vec!["pkg/data.json"]);
        assert_eq!(keys_of(&graph, NodeKind::Directory), vec!["/", "pkg"]);
        assert!(graph.has_edge("/", "pkg", &EdgeKind::Contains));
        assert!(graph.has_edge("pkg", "pkg/mod.py", &EdgeKind::Contains));
        assert!(graph.has_edge("/", "main.py", &EdgeKind::Contains));
        assert!(!graph.contains_key("logo.png"));
        assert_eq!(out.source_files.len(), 2);
        assert_eq!(out.stats.files, 2);
        assert_eq!(out.stats.generic_files, 1);
        assert_eq!(out.stats.directories, 1);
    }

    #[test]
    fn test_excluded_dirs_are_not_walked() {
        let dir = tmp();
        write(dir.path(), "app.py", "");
        write(dir.path(), ".git/config.py", "");
        write(dir.path(), "venv/lib/site.py", "");
        write(dir.path(), "pkg/__pycache__/mod.py", "");

        let (graph, _) = walk(dir.path(), &BuildOptions::default());

        assert_eq!(keys_of(&graph, NodeKind::File), vec!["app.py"]);
        assert_eq!(keys_of(&graph, NodeKind::Directory), vec!["/"]);
    }

    #[test]
    fn test_directory_with_only_excluded_subdirs_is_pruned() {
        let dir = tmp();
        write(dir.path(), "main.py", "");
        write(dir.path(), "outer/__pycache__/cached.py", "");
        write(dir.path(), "outer/venv/x.py", "");

        let (graph, out) = walk(dir.path(), &BuildOptions::default());

        assert!(!graph.contains_key("outer"));
        assert_eq!(out.stats.pruned_directories, 1);
        assert_eq!(keys_of(&graph, NodeKind::Directory), vec!["/"]);
    }

    #[test]
    fn test_nested_empty_chain_is_pruned_but_ancestors_of_files_survive() {
        let dir = tmp();
        write(dir.path(), "a/b/c/notes.bin", "");
        write(dir.path(), "a/keep/deep/mod.py", "");
        fs::create_dir_all(dir.path().join("a/empty/also_empty")).unwrap();

        let (graph, _) = walk(dir.path(), &BuildOptions::default());

        assert_eq!(
            keys_of(&graph, NodeKind::Directory),
            vec!["/", "a", "a/keep", "a/keep/deep"]
        );
        assert!(graph.has_edge("a", "a/keep", &EdgeKind::Contains));
        assert!(graph.has_edge("a/keep/deep", "a/keep/deep/mod.py", &EdgeKind::Contains));
    }

    #[test]
    fn test_sibling_prefix_is_not_an_ancestor() {
        let dir = tmp();
        write(dir.path(), "pkg/mod.py", "");
        fs::create_dir_all(dir.path().join("pkg2")).unwrap();

        let (graph, _) = walk(dir.path(), &BuildOptions::default());

        assert!(graph.contains_key("pkg"));
        assert!(!graph.contains_key("pkg2"));
    }

    #[test]
    fn test_readme_node_is_case_insensitive_and_verbatim() {
        let dir = tmp();
        write(dir.path(), "Readme.MD", "# Title\n\nBody\n");
        write(dir.path(), "main.py", "");

        let (graph, out) = walk(dir.path(), &BuildOptions::default());

        let readme = graph.node(README_KEY).expect("readme node");
        assert_eq!(readme.path(), "Readme.MD");
        assert_eq!(readme.text(), Some("# Title\n\nBody\n"));
        assert!(graph.has_edge("/", README_KEY, &EdgeKind::Contains));
        assert!(out.stats.readme);
        // The README is also a generic file of its own.
        assert!(graph.contains_key("Readme.MD"));
    }

    #[test]
    fn test_nested_readme_is_not_the_repository_readme() {
        let dir = tmp();
        write(dir.path(), "docs/README.md", "nested");

        let (graph, _) = walk(dir.path(), &BuildOptions::default());

        assert!(!graph.contains_key(README_KEY));
        assert!(graph.contains_key("docs/README.md"));
    }

    #[test]
    fn test_binary_generic_file_is_skipped() {
        let dir = tmp();
        fs::write(dir.path().join("blob.txt"), [0u8, 1, 2, 3]).unwrap();
        write(dir.path(), "notes.txt", "hello");

        let (graph, out) = walk(dir.path(), &BuildOptions::default());

        assert!(!graph.contains_key("blob.txt"));
        assert!(graph.contains_key("notes.txt"));
        assert_eq!(out.stats.unreadable, 1);
    }

    #[test]
    fn test_exclude_tests_option() {
        let dir = tmp();
        write(dir.path(), "app.py", "");
        write(dir.path(), "test_app.py", "");
        write(dir.path(), "tests/helpers.py", "");

        let (graph, _) = walk(dir.path(), &BuildOptions::default());
        assert_eq!(keys_of(&graph, NodeKind::File).len(), 3);

        let options = BuildOptions {
            exclude_tests: true,
            ..BuildOptions::default()
        };
        let (graph, _) = walk(dir.path(), &options);
        assert_eq!(keys_of(&graph, NodeKind::File), vec!["app.py"]);
        assert!(!graph.contains_key("tests"));
    }

    #[test]
    fn test_exclude_patterns_option() {
        let dir = tmp();
        write(dir.path(), "app.py", "");
        write(dir.path(), "gen/schema_pb2.py", "");
        write(dir.path(), "config.toml", "");

        let options = BuildOptions {
            exclude_patterns: vec!["*_pb2.py".into(), "*.toml".into()],
            ..BuildOptions::default()
        };
        let (graph, _) = walk(dir.path(), &options);

        assert_eq!(keys_of(&graph, NodeKind::File), vec!["app.py"]);
        assert!(!graph.contains_key("config.toml"));
        assert!(!graph.contains_key("gen"));
    }

    #[test]
    fn test_gitignore_only_when_requested() {
        let dir = tmp();
        write(dir.path(), ".gitignore", "build/\n");
        write(dir.path(), "build/out.py", "");
        write(dir.path(), "app.py", "");

        let (graph, _) = walk(dir.path(), &BuildOptions::default());
        assert!(graph.contains_key("build/out.py"));

        let options = BuildOptions {
            respect_gitignore: true,
            ..BuildOptions::default()
        };
        let (graph, _) = walk(dir.path(), &options);
        assert!(!graph.contains_key("build/out.py"));
        assert!(graph.contains_key("app.py"));
    }

    #[test]
    fn test_empty_repository_keeps_root() {
        let dir = tmp();
        let (graph, out) = walk(dir.path(), &BuildOptions::default());
        assert_eq!(graph.node_count(), 1);
        assert!(graph.contains_key(ROOT_KEY));
        assert!(out.source_files.is_empty());
    }

    #[test]
    fn test_generic_extension_matching() {
        let exts: BTreeSet<String> = ["md", "yml"].iter().map(|s| s.to_string()).collect();
        assert!(has_generic_extension("README.MD", &exts));
        assert!(has_generic_extension("ci.yml", &exts));
        assert!(!has_generic_extension("md", &exts));
        assert!(!has_generic_extension("cmd", &exts));
    }

    #[test]
    fn test_is_within() {
        assert!(is_within("pkg", "pkg"));
        assert!(is_within("pkg/sub", "pkg"));
        assert!(!is_within("pkg2", "pkg"));
        assert!(!is_within("pk", "pkg"));
    }

    #[test]
    fn test_directory_named_like_readme_key_is_skipped() {
        let dir = tmp();
        write(dir.path(), "README.md", "# Project\n");
        write(dir.path(), "__README__/notes.py", "def note(): pass\n");

        let (graph, out) = walk(dir.path(), &BuildOptions::default());

        let readme = graph.node(README_KEY).expect("readme node");
        assert_eq!(readme.kind(), NodeKind::Readme);
        assert_eq!(readme.text(), Some("# Project\n"));
        assert!(!graph.contains_key("__README__/notes.py"));
        assert!(out.source_files.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_source_file_gets_no_node() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tmp();
        write(dir.path(), "ok.py", "");
        write(dir.path(), "locked.py", "def hidden(): pass\n");
        let locked = dir.path().join("locked.py");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read(&locked).is_ok() {
            // Permission bits do not apply (running as root).
            return;
        }

        let (graph, out) = walk(dir.path(), &BuildOptions::default());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

        assert!(!graph.contains_key("locked.py"));
        assert!(graph.contains_key("ok.py"));
        assert_eq!(out.stats.unreadable, 1);
        assert_eq!(out.stats.files, 1);
        assert_eq!(
            out.source_files.iter().map(|f| f.key.as_str()).collect::<Vec<_>>(),
            vec!["ok.py"]
        );
    }
}
