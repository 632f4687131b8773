use std::path::Path;

use crate::parser::languages::{PACKAGE_INDEX_FILE, SOURCE_EXTENSION};

/// Resolve dotted module segments to the key of a file under `root`.
///
/// `a.b.c` resolves to `a/b/c.py` if that file exists, otherwise to the package index
/// `a/b/c/__init__.py`. Existence is checked on disk; the caller decides whether the resolved
/// file is actually a node of the graph.
pub fn resolve_module(root: &Path, segments: &[String]) -> Option<String> {
    if segments.iter().any(|s| s.is_empty()) {
        return None;
    }

    if !segments.is_empty() {
        let module_file = format!("{}.{SOURCE_EXTENSION}", segments.join("/"));
        if root.join(&module_file).is_file() {
            return Some(module_file);
        }
    }

    let package_index = segments
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(PACKAGE_INDEX_FILE))
        .collect::<Vec<_>>()
        .join("/");
    root.join(&package_index).is_file().then_some(package_index)
}

/// Split a dotted module name into segments. `None` (as in `from . import x`) yields nothing.
pub fn module_segments(module: Option<&str>) -> Vec<String> {
    match module {
        Some(m) if !m.is_empty() => m.split('.').map(str::to_owned).collect(),
        _ => Vec::new(),
    }
}

/// The directory segments a relative import of the given `level` is anchored at.
///
/// The anchor is the importing file's path with its last `level` segments removed, so one dot
/// means the file's own directory. When the import climbs above the repository root the anchor
/// is clamped at the root if `clamp_at_root` is set, and the import is dropped otherwise.
pub fn relative_anchor(file_key: &str, level: usize, clamp_at_root: bool) -> Option<Vec<String>> {
    let parts: Vec<String> = file_key.split('/').map(str::to_owned).collect();
    if level <= parts.len() {
        return Some(parts[..parts.len() - level].to_vec());
    }
    clamp_at_root.then(Vec::new)
}
