pub mod imports;
pub mod languages;
pub mod relationships;
pub mod symbols;

use tree_sitter::{Node, Parser, Tree};

use imports::{ImportRecord, extract_imports};
use languages::{SOURCE_EXTENSION, language_for_extension};
use relationships::{ReferenceRecord, extract_references};
use symbols::{SymbolRecord, collect_definitions, extract_symbols};

/// Why a source file could not be turned into a syntax tree.
///
/// Every variant means the same thing to the builder: the file contributes no symbols and no
/// import/reference edges. The variants exist for logging.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("source is not valid UTF-8: {0}")]
    Decode(#[from] std::str::Utf8Error),
    #[error("syntax error near line {line}")]
    Syntax { line: usize },
    #[error("failed to load the grammar: {0}")]
    Language(String),
    #[error("tree-sitter produced no tree")]
    NoTree,
}

/// A successfully parsed source file: the decoded text and its error-free syntax tree.
pub struct ParsedFile {
    source: String,
    tree: Tree,
}

impl ParsedFile {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root_node(&self) -> Node<'_> {
        self.tree.root_node()
    }
}

/// Everything the builder needs from one source file.
///
/// The tree-sitter `Tree` is NOT retained. It is dropped after extraction; the later
/// resolution passes only need these records.
#[derive(Debug, Clone, Default)]
pub struct ParseResult {
    /// Declared classes and functions in document order (constructors excluded).
    pub symbols: Vec<SymbolRecord>,
    /// Import statements anywhere in the file, in document order.
    pub imports: Vec<ImportRecord>,
    /// Base-class and call references, keyed by the referencing symbol's dotted name.
    pub references: Vec<ReferenceRecord>,
}

/// Owns a tree-sitter parser configured for the source language.
///
/// Constructed once per build and passed down, so every file reuses the same parser.
pub struct SourceParser {
    parser: Parser,
}

impl SourceParser {
    pub fn new() -> Result<Self, ParseError> {
        let language = language_for_extension(SOURCE_EXTENSION)
            .ok_or_else(|| ParseError::Language(format!("no grammar for .{SOURCE_EXTENSION}")))?;
        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .map_err(|e| ParseError::Language(e.to_string()))?;
        Ok(Self { parser })
    }

    /// Decode and parse raw file bytes.
    ///
    /// # Errors
    /// - [`ParseError::Decode`] if the bytes are not UTF-8
    /// - [`ParseError::Syntax`] if the tree contains any error or missing node, or a Python 2
    ///   `print`/`exec` statement
    /// - [`ParseError::NoTree`] if tree-sitter gives up
    pub fn parse(&mut self, bytes: &[u8]) -> Result<ParsedFile, ParseError> {
        let source = std::str::from_utf8(bytes)?.to_owned();
        let tree = self
            .parser
            .parse(source.as_bytes(), None)
            .ok_or(ParseError::NoTree)?;
        let root = tree.root_node();
        if root.has_error() {
            let line = first_error_line(root).unwrap_or(root.start_position().row + 1);
            return Err(ParseError::Syntax { line });
        }
        if let Some(line) = first_legacy_statement_line(root) {
            return Err(ParseError::Syntax { line });
        }
        Ok(ParsedFile { source, tree })
    }

    /// Parse a file and extract its symbols, imports and references in one go.
    pub fn parse_file(&mut self, bytes: &[u8]) -> Result<ParseResult, ParseError> {
        let parsed = self.parse(bytes)?;
        Ok(analyze(&parsed))
    }
}

/// Run the three extractors over an already parsed file.
pub fn analyze(parsed: &ParsedFile) -> ParseResult {
    let root = parsed.root_node();
    let source = parsed.source();
    let definitions = collect_definitions(root, source);
    ParseResult {
        symbols: extract_symbols(&definitions, source),
        imports: extract_imports(root, source),
        references: extract_references(&definitions, source),
    }
}

/// Convenience wrapper that allocates a fresh parser. Suitable for one-off parses and tests;
/// bulk parsing should hold on to a [`SourceParser`].
pub fn parse_source(bytes: &[u8]) -> Result<ParseResult, ParseError> {
    SourceParser::new()?.parse_file(bytes)
}

/// 1-based line of the first ERROR or MISSING node under `node`, depth-first.
fn first_error_line(node: Node) -> Option<usize> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_position().row + 1);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(line) = first_error_line(child) {
            return Some(line);
        }
    }
    None
}

/// Statements the grammar accepts for Python 2 code but Python 3 rejects.
const LEGACY_STATEMENTS: &[&str] = &["print_statement", "exec_statement"];

/// 1-based line of the first Python 2 only statement (`print x`, `exec code`) under `node`.
fn first_legacy_statement_line(node: Node) -> Option<usize> {
    if LEGACY_STATEMENTS.contains(&node.kind()) {
        return Some(node.start_position().row + 1);
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if let Some(line) = first_legacy_statement_line(child) {
            return Some(line);
        }
    }
    None
}

/// Extract the UTF-8 text of a node from the original source.
pub(crate) fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    source.get(node.byte_range()).unwrap_or("")
}
