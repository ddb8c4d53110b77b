//! Tracking and best-effort removal of generated side-effect paths.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Set of filesystem paths created by stages during one run.
///
/// Used only for cleanup; insertion is idempotent and each run owns its own
/// set, so concurrent runs cannot interfere with each other's artifacts.
#[derive(Debug, Default)]
pub struct GeneratedPathSet {
    paths: BTreeSet<PathBuf>,
}

impl GeneratedPathSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a generated path. Recording the same path twice has no
    /// additional effect.
    pub fn insert(&mut self, path: impl Into<PathBuf>) {
        self.paths.insert(path.into());
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.paths.iter()
    }

    /// Remove every recorded path from disk, best-effort.
    ///
    /// Failures are logged and swallowed so cleanup can never mask the error
    /// that triggered it.
    pub async fn remove_all(&self) {
        for path in &self.paths {
            let result = if path.is_dir() {
                tokio::fs::remove_dir_all(path).await
            } else {
                tokio::fs::remove_file(path).await
            };
            match result {
                Ok(()) => debug!(path = ?path, "Removed generated path"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = ?path, error = %e, "Failed to remove generated path"),
            }
        }
    }
}
