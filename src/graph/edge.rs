use serde::{Deserialize, Serialize};

/// The kind of directed edge between two nodes in the repository graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Parent -> child: filesystem nesting (directory/file) or lexical nesting (file/class/function).
    Contains,
    /// File -> file or file -> symbol: a resolved import statement.
    /// `alias` is the local name of a plain `import x as y`.
    Imports { alias: Option<String> },
    /// Class -> class: a same-file base class matched by simple name.
    Inherits,
    /// Function -> class/function: a same-file call target matched by simple name.
    Invokes,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Contains => "contains",
            EdgeKind::Imports { .. } => "imports",
            EdgeKind::Inherits => "inherits",
            EdgeKind::Invokes => "invokes",
        }
    }

    /// Parse a CLI/config edge name. Case-insensitive.
    pub fn from_str_loose(s: &str) -> Option<EdgeKind> {
        match s.to_ascii_lowercase().as_str() {
            "contains" => Some(EdgeKind::Contains),
            "imports" | "import" => Some(EdgeKind::Imports { alias: None }),
            "inherits" | "extends" => Some(EdgeKind::Inherits),
            "invokes" | "calls" => Some(EdgeKind::Invokes),
            _ => None,
        }
    }

    /// True when both kinds have the same tag, ignoring payload.
    pub fn same_kind(&self, other: &EdgeKind) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}
