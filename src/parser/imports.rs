use std::sync::OnceLock;

use tree_sitter::{Node, Query, QueryCursor, StreamingIterator};

use super::languages::{SOURCE_EXTENSION, language_for_extension};
use super::node_text;

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// One name listed after `import` in a `from ... import` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedName {
    /// The imported entity, or `*` for a wildcard import.
    pub name: String,
    /// The local alias from `import x as y`.
    pub alias: Option<String>,
}

/// An import statement extracted from a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportRecord {
    /// `import a.b.c` / `import a.b.c as d`
    Plain { module: String, alias: Option<String> },
    /// `from [.]*module import x, y as z` / `from module import *`
    From {
        /// Dotted module after the leading dots, `None` for `from . import x`.
        module: Option<String>,
        /// Number of leading dots; `0` for an absolute import.
        level: usize,
        entities: Vec<ImportedName>,
    },
}

impl ImportRecord {
    /// True for `from module import *`.
    pub fn is_wildcard(&self) -> bool {
        match self {
            ImportRecord::From { entities, .. } => entities.len() == 1 && entities[0].name == "*",
            ImportRecord::Plain { .. } => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// Matches import statements anywhere in the file, including ones nested in functions.
const IMPORT_QUERY: &str = r#"
    (import_statement) @import
    (import_from_statement) @import_from
"#;

static IMPORT_QUERY_CACHE: OnceLock<Query> = OnceLock::new();

fn import_query() -> &'static Query {
    IMPORT_QUERY_CACHE.get_or_init(|| {
        let language = language_for_extension(SOURCE_EXTENSION).expect("python grammar is built in");
        Query::new(&language, IMPORT_QUERY).expect("invalid import query")
    })
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extract all import statements in document order.
pub fn extract_imports(root: Node, source: &str) -> Vec<ImportRecord> {
    let query = import_query();
    let import_idx = query
        .capture_index_for_name("import")
        .expect("import query must have @import");
    let from_idx = query
        .capture_index_for_name("import_from")
        .expect("import query must have @import_from");

    let mut results = Vec::new();
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, root, source.as_bytes());

    while let Some(m) = matches.next() {
        for capture in m.captures {
            if capture.index == import_idx {
                results.extend(plain_imports(capture.node, source));
            } else if capture.index == from_idx
                && let Some(record) = from_import(capture.node, source)
            {
                results.push(record);
            }
        }
    }

    results
}

/// `import a.b, c as d` yields one record per listed module.
fn plain_imports(node: Node, source: &str) -> Vec<ImportRecord> {
    let mut out = Vec::new();
    let mut cursor = node.walk();
    for name in node.children_by_field_name("name", &mut cursor) {
        let (module, alias) = name_and_alias(name, source);
        if !module.is_empty() {
            out.push(ImportRecord::Plain { module, alias });
        }
    }
    out
}

fn from_import(node: Node, source: &str) -> Option<ImportRecord> {
    let module_node = node.child_by_field_name("module_name")?;
    let (module, level) = match module_node.kind() {
        "relative_import" => relative_module(module_node, source),
        _ => (Some(dotted_name(module_node, source)), 0),
    };

    let mut entities = Vec::new();
    let mut cursor = node.walk();
    for name in node.children_by_field_name("name", &mut cursor) {
        let (name, alias) = name_and_alias(name, source);
        if !name.is_empty() {
            entities.push(ImportedName { name, alias });
        }
    }

    let mut cursor = node.walk();
    if node
        .children(&mut cursor)
        .any(|child| child.kind() == "wildcard_import")
    {
        entities = vec![ImportedName {
            name: "*".to_owned(),
            alias: None,
        }];
    }

    Some(ImportRecord::From {
        module,
        level,
        entities,
    })
}

/// Split a `relative_import` node (`..pkg.mod`) into its module part and its level.
fn relative_module(node: Node, source: &str) -> (Option<String>, usize) {
    let mut level = 0;
    let mut module = None;
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "import_prefix" => {
                level = node_text(child, source).chars().filter(|&c| c == '.').count();
            }
            "dotted_name" => module = Some(dotted_name(child, source)),
            _ => {}
        }
    }
    (module, level)
}

/// A listed name is either a `dotted_name` or an `aliased_import` (`name as alias`).
fn name_and_alias(node: Node, source: &str) -> (String, Option<String>) {
    if node.kind() == "aliased_import" {
        let name = node
            .child_by_field_name("name")
            .map(|n| dotted_name(n, source))
            .unwrap_or_default();
        let alias = node
            .child_by_field_name("alias")
            .map(|n| node_text(n, source).to_owned());
        (name, alias)
    } else {
        (dotted_name(node, source), None)
    }
}

/// Normalised text of a `dotted_name`: identifiers joined by `.`, whitespace dropped.
fn dotted_name(node: Node, source: &str) -> String {
    if node.kind() != "dotted_name" {
        return node_text(node, source).to_owned();
    }
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .filter(|c| c.kind() == "identifier")
        .map(|c| node_text(c, source))
        .collect::<Vec<_>>()
        .join(".")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
