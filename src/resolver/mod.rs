pub mod module_path;

use std::collections::HashSet;
use std::path::Path;

use tracing::debug;

use crate::graph::CodeGraph;
use crate::graph::edge::EdgeKind;
use crate::graph::node::symbol_key;
use crate::parser::ParseResult;
use crate::parser::imports::{ImportRecord, ImportedName};
use crate::parser::relationships::{ReferenceKind, ReferenceRecord};

use module_path::{module_segments, relative_anchor, resolve_module};

/// Statistics collected during the resolution passes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResolveStats {
    /// `imports` edges added.
    pub imports: usize,
    /// Imported modules or entities with no matching node (stdlib, third-party, missing).
    pub unresolved_imports: usize,
    /// `inherits` edges added.
    pub inherits: usize,
    /// `invokes` edges added.
    pub invokes: usize,
    /// References whose target is not a symbol of the same file.
    pub unresolved_references: usize,
}

/// Run the import pass and then the reference pass over every parsed file.
///
/// Both passes require the complete node set: every edge is added through
/// [`CodeGraph::add_edge_if_present`], so a target that is not a node yields no edge.
///
/// # Parameters
/// - `parsed`: `(file key, parse result)` pairs in walk order; files that failed to parse are
///   simply absent
/// - `follow_relative_imports`: clamp relative imports that climb above the root instead of
///   dropping them
pub fn resolve_all(
    graph: &mut CodeGraph,
    root: &Path,
    parsed: &[(String, ParseResult)],
    follow_relative_imports: bool,
) -> ResolveStats {
    let mut stats = ResolveStats::default();

    for (file_key, result) in parsed {
        let mut resolver = ImportResolver {
            graph: &mut *graph,
            root,
            file_key,
            follow_relative_imports,
            seen: HashSet::new(),
            stats: &mut stats,
        };
        for import in &result.imports {
            resolver.resolve(import);
        }
    }

    for (file_key, result) in parsed {
        resolve_references(graph, file_key, &result.references, &mut stats);
    }

    stats
}

/// Per-file import resolution state.
struct ImportResolver<'a> {
    graph: &'a mut CodeGraph,
    root: &'a Path,
    file_key: &'a str,
    follow_relative_imports: bool,
    /// Targets already linked from this file; the first import of a target wins.
    seen: HashSet<String>,
    stats: &'a mut ResolveStats,
}

impl ImportResolver<'_> {
    fn resolve(&mut self, import: &ImportRecord) {
        match import {
            ImportRecord::Plain { module, alias } => {
                let segments = module_segments(Some(module));
                match resolve_module(self.root, &segments) {
                    Some(target) => self.link(&target, alias.clone()),
                    None => self.unresolved(module),
                }
            }
            ImportRecord::From {
                module,
                level,
                entities,
            } => {
                let Some(base) = self.base_segments(module.as_deref(), *level) else {
                    debug!(
                        "{}: relative import climbs above the repository root, dropped",
                        self.file_key
                    );
                    self.stats.unresolved_imports += 1;
                    return;
                };
                if import.is_wildcard() {
                    match resolve_module(self.root, &base) {
                        Some(target) => self.link(&target, None),
                        None => self.unresolved(&base.join(".")),
                    }
                    return;
                }
                for entity in entities {
                    self.resolve_entity(&base, entity);
                }
            }
        }
    }

    /// Module segments an absolute or relative from-import refers to.
    fn base_segments(&self, module: Option<&str>, level: usize) -> Option<Vec<String>> {
        let mut base = if level > 0 {
            relative_anchor(self.file_key, level, self.follow_relative_imports)?
        } else {
            Vec::new()
        };
        base.extend(module_segments(module));
        Some(base)
    }

    /// `from base import entity`: the entity is a submodule if `base.entity` is a file,
    /// otherwise a symbol defined in the module `base` resolves to.
    fn resolve_entity(&mut self, base: &[String], entity: &ImportedName) {
        let mut submodule = base.to_vec();
        submodule.push(entity.name.clone());
        if let Some(target) = resolve_module(self.root, &submodule) {
            self.link(&target, entity.alias.clone());
            return;
        }

        match resolve_module(self.root, base) {
            Some(module_file) => {
                let target = symbol_key(&module_file, &entity.name);
                self.link(&target, entity.alias.clone());
            }
            None => self.unresolved(&submodule.join(".")),
        }
    }

    fn link(&mut self, target: &str, alias: Option<String>) {
        if self.seen.contains(target) {
            return;
        }
        if self
            .graph
            .add_edge_if_present(self.file_key, target, EdgeKind::Imports { alias })
        {
            self.seen.insert(target.to_owned());
            self.stats.imports += 1;
        } else {
            self.unresolved(target);
        }
    }

    fn unresolved(&mut self, what: &str) {
        debug!("{}: unresolved import {what}", self.file_key);
        self.stats.unresolved_imports += 1;
    }
}

/// Link inherits/invokes references to same-file symbols with a matching top-level key.
///
/// The source is the referencing symbol's own node; the target is `"<file>:<simple name>"`,
/// so only top-level classes and functions of the same file can be targets.
fn resolve_references(
    graph: &mut CodeGraph,
    file_key: &str,
    references: &[ReferenceRecord],
    stats: &mut ResolveStats,
) {
    for reference in references {
        let source = symbol_key(file_key, &reference.from);
        let target = symbol_key(file_key, &reference.to_name);
        let kind = match reference.kind {
            ReferenceKind::Inherits => EdgeKind::Inherits,
            ReferenceKind::Invokes => EdgeKind::Invokes,
        };
        if graph.add_edge_if_present(&source, &target, kind) {
            match reference.kind {
                ReferenceKind::Inherits => stats.inherits += 1,
                ReferenceKind::Invokes => stats.invokes += 1,
            }
        } else {
            stats.unresolved_references += 1;
        }
    }
}
