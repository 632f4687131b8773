use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::builder::BuildOptions;

/// Name of the configuration file looked up at the repository root.
pub const CONFIG_FILE_NAME: &str = "repo-graph.toml";

/// Configuration loaded from `repo-graph.toml` at the repository root. Every key is optional.
#[derive(Debug, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RepoGraphConfig {
    /// Replaces the default excluded directory names.
    pub exclude_dirs: Option<Vec<String>>,
    /// Added to the (default or replaced) excluded directory names.
    pub extra_exclude_dirs: Option<Vec<String>>,
    /// Replaces the default generic-file extensions. A leading dot is accepted.
    pub generic_extensions: Option<Vec<String>>,
    pub exclude_tests: Option<bool>,
    pub follow_relative_imports: Option<bool>,
    pub respect_gitignore: Option<bool>,
    /// Glob patterns excluded from the walk.
    pub exclude: Option<Vec<String>>,
}

impl RepoGraphConfig {
    /// Load configuration from `repo-graph.toml` in the given root directory.
    ///
    /// Returns a default (empty) configuration if the file does not exist or cannot be parsed.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(config) => config,
                Err(err) => {
                    warn!("failed to parse {CONFIG_FILE_NAME}: {err}. Using defaults.");
                    Self::default()
                }
            },
            Err(err) => {
                warn!("failed to read {CONFIG_FILE_NAME}: {err}. Using defaults.");
                Self::default()
            }
        }
    }

    /// Build options from the defaults with this file's values applied.
    pub fn to_options(&self) -> BuildOptions {
        let mut options = BuildOptions::default();

        if let Some(dirs) = &self.exclude_dirs {
            options.exclude_dirs = dirs.iter().cloned().collect();
        }
        if let Some(extra) = &self.extra_exclude_dirs {
            options.exclude_dirs.extend(extra.iter().cloned());
        }
        if let Some(exts) = &self.generic_extensions {
            options.generic_extensions = normalize_extensions(exts);
        }
        if let Some(v) = self.exclude_tests {
            options.exclude_tests = v;
        }
        if let Some(v) = self.follow_relative_imports {
            options.follow_relative_imports = v;
        }
        if let Some(v) = self.respect_gitignore {
            options.respect_gitignore = v;
        }
        if let Some(patterns) = &self.exclude {
            options.exclude_patterns = patterns.clone();
        }
        options
    }
}

fn normalize_extensions(exts: &[String]) -> BTreeSet<String> {
    exts.iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}
