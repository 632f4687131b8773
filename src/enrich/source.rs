use std::path::{Path, PathBuf};

use anyhow::{Context, bail};

/// Acquires a repository and returns the local directory to build from.
pub trait RepoSource {
    fn fetch(&self, locator: &str) -> anyhow::Result<PathBuf>;
}

/// A repository that is already on disk. The locator is a directory path.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalDir;

impl RepoSource for LocalDir {
    fn fetch(&self, locator: &str) -> anyhow::Result<PathBuf> {
        let path = Path::new(locator);
        if !path.exists() {
            bail!("repository path {locator} does not exist");
        }
        if !path.is_dir() {
            bail!("repository path {locator} is not a directory");
        }
        path.canonicalize()
            .with_context(|| format!("resolving {locator}"))
    }
}

/// Default repository id: the last path or URL segment without a `.git` suffix.
pub fn repo_id_from_locator(locator: &str) -> String {
    let last = locator
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let id = last.strip_suffix(".git").unwrap_or(last);
    if id.is_empty() { "repo".to_owned() } else { id.to_owned() }
}
