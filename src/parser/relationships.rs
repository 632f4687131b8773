use std::collections::HashSet;
use std::sync::OnceLock;

use tree_sitter::{Node, Query, QueryCursor, StreamingIterator};

use super::languages::{SOURCE_EXTENSION, language_for_extension};
use super::node_text;
use super::symbols::{Definition, SymbolKind};

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// The kind of symbol-level reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// `class Sub(Base)`: from a class to a base-class name.
    Inherits,
    /// `helper()` / `obj.helper()`: from a function to a callee name.
    Invokes,
}

/// A lexical reference from a declared symbol to a simple name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceRecord {
    /// Dotted name of the referencing class or function.
    pub from: String,
    /// Trailing identifier of the referenced expression (`Base` for `mod.Base`).
    pub to_name: String,
    pub kind: ReferenceKind,
    /// 1-based line of the first occurrence.
    pub line: usize,
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// Call sites whose callee has a simple trailing name.
///
/// Pattern 1: `foo(...)`, a direct call to an identifier.
/// Pattern 2: `obj.method(...)`, where the trailing attribute is the name.
/// Calls through subscripts or other calls (`fns[0]()`, `make()()`) have no simple name and
/// only their inner calls match.
const CALLS_QUERY: &str = r#"
    (call
      function: (identifier) @callee)

    (call
      function: (attribute
        attribute: (identifier) @callee))
"#;

static CALLS_QUERY_CACHE: OnceLock<Query> = OnceLock::new();

fn calls_query() -> &'static Query {
    CALLS_QUERY_CACHE.get_or_init(|| {
        let language = language_for_extension(SOURCE_EXTENSION).expect("python grammar is built in");
        Query::new(&language, CALLS_QUERY).expect("invalid calls query")
    })
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extract base-class references for every class and call references for every function.
///
/// A function's calls include its decorators and everything reachable in its subtree, nested
/// functions and classes included. Duplicates of the same `(from, to_name, kind)` are collapsed onto the
/// first occurrence.
pub(crate) fn extract_references(definitions: &[Definition], source: &str) -> Vec<ReferenceRecord> {
    let mut results: Vec<ReferenceRecord> = Vec::new();
    let mut seen: HashSet<(String, String, ReferenceKind)> = HashSet::new();

    let mut push = |record: ReferenceRecord| {
        let key = (record.from.clone(), record.to_name.clone(), record.kind);
        if seen.insert(key) {
            results.push(record);
        }
    };

    for def in definitions {
        match def.kind {
            SymbolKind::Class => {
                for (name, line) in base_class_names(def.node, source) {
                    push(ReferenceRecord {
                        from: def.qualified_name.clone(),
                        to_name: name,
                        kind: ReferenceKind::Inherits,
                        line,
                    });
                }
            }
            SymbolKind::Function => {
                let decorator_calls = decorators(def.node)
                    .into_iter()
                    .flat_map(|d| call_names(d, source));
                for (name, line) in decorator_calls.chain(call_names(def.node, source)) {
                    push(ReferenceRecord {
                        from: def.qualified_name.clone(),
                        to_name: name,
                        kind: ReferenceKind::Invokes,
                        line,
                    });
                }
            }
        }
    }

    results
}

/// Simple names of the base-class expressions in a `class_definition`.
///
/// Keyword arguments (`metaclass=...`), subscripts (`Generic[T]`) and calls are skipped.
fn base_class_names(class_node: Node, source: &str) -> Vec<(String, usize)> {
    let Some(bases) = class_node.child_by_field_name("superclasses") else {
        return Vec::new();
    };
    let mut out = Vec::new();
    let mut cursor = bases.walk();
    for base in bases.named_children(&mut cursor) {
        if let Some(name) = simple_name(base, source) {
            out.push((name.to_owned(), base.start_position().row + 1));
        }
    }
    out
}

/// Decorators of a definition. They hang off the wrapping `decorated_definition`, outside the
/// definition node itself.
fn decorators(def_node: Node) -> Vec<Node> {
    let Some(parent) = def_node.parent().filter(|p| p.kind() == "decorated_definition") else {
        return Vec::new();
    };
    let mut cursor = parent.walk();
    parent
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "decorator")
        .collect()
}

/// Simple callee names of every call site under `node`, in document order.
fn call_names(node: Node, source: &str) -> Vec<(String, usize)> {
    let query = calls_query();
    let callee_idx = query
        .capture_index_for_name("callee")
        .expect("calls query must have @callee");

    let mut out = Vec::new();
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, node, source.as_bytes());
    while let Some(m) = matches.next() {
        for capture in m.captures {
            if capture.index == callee_idx {
                out.push((
                    node_text(capture.node, source).to_owned(),
                    capture.node.start_position().row + 1,
                ));
            }
        }
    }
    out
}

/// The trailing identifier of a name or dotted attribute expression.
fn simple_name<'a>(expr: Node, source: &'a str) -> Option<&'a str> {
    match expr.kind() {
        "identifier" => Some(node_text(expr, source)),
        "attribute" => expr
            .child_by_field_name("attribute")
            .map(|attr| node_text(attr, source)),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;

    fn references(src: &str) -> Vec<ReferenceRecord> {
        parse_source(src.as_bytes()).expect("parse").references
    }

    fn of_kind(refs: &[ReferenceRecord], kind: ReferenceKind) -> Vec<(String, String)> {
        refs.iter()
            .filter(|r| r.kind == kind)
            .map(|r| (r.from.clone(), r.to_name.clone()))
            .collect()
    }

    fn pair(a: &str, b: &str) -> (String, String) {
        (a.to_owned(), b.to_owned())
    }

    #[test]
    fn test_base_class_simple_and_dotted() {
        let src = "class Sub(Base, mod.Mixin, metaclass=Meta): pass\n";
        let refs = references(src);
        assert_eq!(
            of_kind(&refs, ReferenceKind::Inherits),
            vec![pair("Sub", "Base"), pair("Sub", "Mixin")]
        );
    }

    #[test]
    fn test_subscript_base_is_skipped() {
        let refs = references("class Box(Generic[T]): pass\n");
        assert!(of_kind(&refs, ReferenceKind::Inherits).is_empty());
    }

    #[test]
    fn test_direct_and_method_calls() {
        let src = "def run():\n    helper()\n    self.save()\n    a.b.c.flush(1)\n";
        let refs = references(src);
        assert_eq!(
            of_kind(&refs, ReferenceKind::Invokes),
            vec![pair("run", "helper"), pair("run", "save"), pair("run", "flush")]
        );
    }

    #[test]
    fn test_outer_function_sees_nested_calls() {
        let src = "\
def outer():
    def inner():
        target()
    inner()
";
        let refs = references(src);
        let calls = of_kind(&refs, ReferenceKind::Invokes);
        assert!(calls.contains(&pair("outer", "target")));
        assert!(calls.contains(&pair("outer", "inner")));
        assert!(calls.contains(&pair("outer.inner", "target")));
    }

    #[test]
    fn test_repeated_calls_collapse() {
        let src = "def run():\n    helper()\n    helper()\n    helper()\n";
        let refs = references(src);
        let calls = of_kind(&refs, ReferenceKind::Invokes);
        assert_eq!(calls, vec![pair("run", "helper")]);
        assert_eq!(refs[0].line, 2);
    }

    #[test]
    fn test_constructor_calls_are_not_attributed() {
        let src = "\
class Foo:
    def __init__(self):
        setup()
";
        let refs = references(src);
        assert!(of_kind(&refs, ReferenceKind::Invokes).is_empty());
    }

    #[test]
    fn test_class_body_calls_are_not_invokes() {
        // Only functions carry invokes references.
        let refs = references("class Foo:\n    x = make()\n");
        assert!(of_kind(&refs, ReferenceKind::Invokes).is_empty());
    }

    #[test]
    fn test_calls_of_calls_and_subscripts() {
        let src = "def run():\n    factory()()\n    handlers[0]()\n";
        let refs = references(src);
        assert_eq!(of_kind(&refs, ReferenceKind::Invokes), vec![pair("run", "factory")]);
    }

    #[test]
    fn test_decorator_calls_are_attributed_to_the_function() {
        let src = "\
def deco():
    pass

@deco()
@app.route(\"/\")
@plain
def handler():
    work()
";
        let refs = references(src);
        assert_eq!(
            of_kind(&refs, ReferenceKind::Invokes),
            vec![pair("handler", "deco"), pair("handler", "route"), pair("handler", "work")]
        );
        let deco = refs.iter().find(|r| r.to_name == "deco").unwrap();
        assert_eq!(deco.line, 4);
    }

    #[test]
    fn test_decorated_method_keeps_symbol_span_at_def() {
        let src = "class Api:\n    @cached(ttl=5)\n    def get(self):\n        pass\n";
        let result = parse_source(src.as_bytes()).expect("parse");
        assert_eq!(
            of_kind(&result.references, ReferenceKind::Invokes),
            vec![pair("Api.get", "cached")]
        );
        let get = result.symbols.iter().find(|s| s.qualified_name == "Api.get").unwrap();
        assert_eq!(get.start_line, 3);
    }
}
