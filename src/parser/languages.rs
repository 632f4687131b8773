use tree_sitter::Language;

/// Extension of the files that are parsed for symbols, imports and references.
pub const SOURCE_EXTENSION: &str = "py";

/// File name of a package index module (`import pkg` resolves to `pkg/__init__.py`).
pub const PACKAGE_INDEX_FILE: &str = "__init__.py";

/// Name of the conventional class initializer. Never represented as its own node.
pub const CONSTRUCTOR_NAME: &str = "__init__";

/// Return the tree-sitter [`Language`] for the given file extension, or `None` if the extension
/// is not a parsed source extension.
pub fn language_for_extension(ext: &str) -> Option<Language> {
    match ext {
        SOURCE_EXTENSION => Some(tree_sitter_python::LANGUAGE.into()),
        _ => None,
    }
}

/// True if `file_name` carries the source extension (case-sensitive, like the interpreter).
pub fn is_source_file(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .is_some_and(|(stem, ext)| !stem.is_empty() && ext == SOURCE_EXTENSION)
}
