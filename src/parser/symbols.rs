use serde::{Deserialize, Serialize};
use tree_sitter::Node;

use super::languages::CONSTRUCTOR_NAME;
use super::node_text;

/// The kind of a declared symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    Class,
    /// Functions, methods and nested functions alike.
    Function,
}

/// A class or function declared in a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRecord {
    /// Enclosing class/function names and the symbol's own name, joined by `.`.
    pub qualified_name: String,
    pub kind: SymbolKind,
    /// 1-based line of the `class`/`def` keyword (decorators are not part of the span).
    pub start_line: usize,
    /// 1-based last line of the body.
    pub end_line: usize,
    /// Raw declaration text.
    pub source_text: String,
}

impl SymbolRecord {
    /// Dotted name of the lexical parent, or `None` for a top-level symbol.
    pub fn parent_name(&self) -> Option<&str> {
        self.qualified_name.rsplit_once('.').map(|(parent, _)| parent)
    }
}

/// A recorded declaration still attached to its syntax node.
///
/// Shared by symbol extraction and reference extraction so both agree on which declarations
/// exist and what they are called.
pub(crate) struct Definition<'tree> {
    pub qualified_name: String,
    pub kind: SymbolKind,
    pub node: Node<'tree>,
}

/// Walk the whole tree and collect every recorded declaration in document order.
///
/// A `def __init__` directly inside a class body is skipped together with everything nested
/// in it.
pub(crate) fn collect_definitions<'tree>(root: Node<'tree>, source: &str) -> Vec<Definition<'tree>> {
    let mut out = Vec::new();
    let mut scope: Vec<(String, SymbolKind)> = Vec::new();
    visit(root, source, &mut scope, &mut out);
    out
}

fn visit<'tree>(
    node: Node<'tree>,
    source: &str,
    scope: &mut Vec<(String, SymbolKind)>,
    out: &mut Vec<Definition<'tree>>,
) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        let kind = match child.kind() {
            "class_definition" => SymbolKind::Class,
            "function_definition" => SymbolKind::Function,
            _ => {
                visit(child, source, scope, out);
                continue;
            }
        };
        let Some(name_node) = child.child_by_field_name("name") else {
            continue;
        };
        let name = node_text(name_node, source).to_owned();

        let in_class = matches!(scope.last(), Some((_, SymbolKind::Class)));
        if kind == SymbolKind::Function && in_class && name == CONSTRUCTOR_NAME {
            continue;
        }

        let qualified_name = scope
            .iter()
            .map(|(n, _)| n.as_str())
            .chain(std::iter::once(name.as_str()))
            .collect::<Vec<_>>()
            .join(".");
        out.push(Definition {
            qualified_name,
            kind,
            node: child,
        });

        scope.push((name, kind));
        visit(child, source, scope, out);
        scope.pop();
    }
}

/// Turn collected declarations into symbol records.
pub(crate) fn extract_symbols(definitions: &[Definition], source: &str) -> Vec<SymbolRecord> {
    definitions
        .iter()
        .map(|def| SymbolRecord {
            qualified_name: def.qualified_name.clone(),
            kind: def.kind,
            start_line: def.node.start_position().row + 1,
            end_line: def.node.end_position().row + 1,
            source_text: node_text(def.node, source).to_owned(),
        })
        .collect()
}
