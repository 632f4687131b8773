/// Output format for graph export.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum, serde::Serialize, serde::Deserialize)]
pub enum ExportFormat {
    /// Graphviz DOT (default).
    #[default]
    Dot,
    /// The full graph snapshot as pretty-printed JSON.
    Json,
}
