use serde::{Deserialize, Serialize};

/// Key of the repository root directory node.
pub const ROOT_KEY: &str = "/";

/// Key of the (single) README node. Never collides with a repository path.
pub const README_KEY: &str = "__README__";

/// The kind tag of a graph node, as exposed to downstream consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Directory,
    File,
    GenericFile,
    Readme,
    Class,
    Function,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Directory => "directory",
            NodeKind::File => "file",
            NodeKind::GenericFile => "generic_file",
            NodeKind::Readme => "readme",
            NodeKind::Class => "class",
            NodeKind::Function => "function",
        }
    }
}

/// Inclusive, 1-based line range of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start_line: usize,
    pub end_line: usize,
}

/// A class or function declared in a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolInfo {
    /// Repository-relative path of the declaring file.
    pub path: String,
    /// Dotted name reflecting lexical nesting, e.g. `Outer.Inner.method`.
    pub qualified_name: String,
    pub span: Span,
    /// Raw source text of the declaration.
    pub text: String,
}

impl SymbolInfo {
    /// `"<path>:<qualified name>"`.
    pub fn key(&self) -> String {
        symbol_key(&self.path, &self.qualified_name)
    }

    /// The last segment of the qualified name.
    pub fn simple_name(&self) -> &str {
        self.qualified_name
            .rsplit('.')
            .next()
            .unwrap_or(&self.qualified_name)
    }
}

/// A node in the repository graph. Each variant carries only the fields its kind needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphNode {
    /// A retained directory. The root directory has an empty path.
    Directory { path: String },
    /// A recognized source file.
    File { path: String },
    /// A recognized non-source text/config file. Never parsed.
    GenericFile { path: String },
    /// The repository README, read verbatim.
    Readme { path: String, text: String },
    Class(SymbolInfo),
    Function(SymbolInfo),
}

impl GraphNode {
    /// The node's unique key. Derived entirely from the variant's data.
    pub fn key(&self) -> String {
        match self {
            GraphNode::Directory { path } if path.is_empty() => ROOT_KEY.to_owned(),
            GraphNode::Directory { path } | GraphNode::File { path } | GraphNode::GenericFile { path } => {
                path.clone()
            }
            GraphNode::Readme { .. } => README_KEY.to_owned(),
            GraphNode::Class(info) | GraphNode::Function(info) => info.key(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            GraphNode::Directory { .. } => NodeKind::Directory,
            GraphNode::File { .. } => NodeKind::File,
            GraphNode::GenericFile { .. } => NodeKind::GenericFile,
            GraphNode::Readme { .. } => NodeKind::Readme,
            GraphNode::Class(_) => NodeKind::Class,
            GraphNode::Function(_) => NodeKind::Function,
        }
    }

    /// Repository-relative path of the owning file (empty for the root directory).
    pub fn path(&self) -> &str {
        match self {
            GraphNode::Directory { path }
            | GraphNode::File { path }
            | GraphNode::GenericFile { path }
            | GraphNode::Readme { path, .. } => path,
            GraphNode::Class(info) | GraphNode::Function(info) => &info.path,
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            GraphNode::Class(info) | GraphNode::Function(info) => Some(info.span),
            _ => None,
        }
    }

    /// Raw source text, present only on class, function and README nodes.
    pub fn text(&self) -> Option<&str> {
        match self {
            GraphNode::Readme { text, .. } => Some(text),
            GraphNode::Class(info) | GraphNode::Function(info) => Some(&info.text),
            _ => None,
        }
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self, GraphNode::Class(_) | GraphNode::Function(_))
    }
}

/// Build the key of a class/function node.
pub fn symbol_key(path: &str, qualified_name: &str) -> String {
    format!("{path}:{qualified_name}")
}
