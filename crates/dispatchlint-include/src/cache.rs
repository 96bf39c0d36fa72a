use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Memo of `(cwd, base include)` to the directory or file it resolved to.
///
/// Misses are cached as `None` too. One cache lives for one parse run.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: HashMap<(PathBuf, String), Option<PathBuf>>,
    hits: usize,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, cwd: &Path, base: &str) -> Option<Option<PathBuf>> {
        let found = self
            .entries
            .get(&(cwd.to_path_buf(), base.to_string()))
            .cloned();
        if found.is_some() {
            self.hits += 1;
            tracing::trace!(cwd = %cwd.display(), base, "include base cache hit");
        }
        found
    }

    pub fn insert(&mut self, cwd: &Path, base: &str, resolved: Option<PathBuf>) {
        self.entries
            .insert((cwd.to_path_buf(), base.to_string()), resolved);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }
}
