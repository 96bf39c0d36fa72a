use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use dispatchlint_config::DirectoryPolicy;
use dispatchlint_syntax::Environment;
use globset::{Glob, GlobMatcher};
use walkdir::WalkDir;

use crate::cache::ResolutionCache;
use crate::paths::{normalize_path, split_at_wildcard, strip_relative_prefix, tails};

/// Resolves include expressions to the set of existing files they denote.
///
/// Relative bases are searched against `cwd` and then each of its ancestors,
/// so an include written for the deployed layout still resolves inside a
/// checked-out configuration tree. Absolute bases that do not exist have
/// their leading components dropped one at a time and are searched the same
/// way.
#[derive(Debug, Default)]
pub struct PathResolver {
    policy: DirectoryPolicy,
    cache: ResolutionCache,
}

impl PathResolver {
    pub fn new(policy: DirectoryPolicy) -> Self {
        PathResolver {
            policy,
            cache: ResolutionCache::new(),
        }
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// Resolve `include` against `cwd`, returning a sorted set of files.
    ///
    /// Unresolved `${NAME}` references yield an empty set.
    pub fn resolve_files(
        &mut self,
        include: &str,
        cwd: &Path,
        environment: &Environment,
    ) -> BTreeSet<PathBuf> {
        let include = match environment.substitute_strict(include) {
            Ok(include) => include,
            Err(names) => {
                tracing::warn!(
                    include,
                    "cannot resolve include, undefined variable(s): {}",
                    names.join(", ")
                );
                return BTreeSet::new();
            }
        };

        if include.contains('[') {
            let mut files = BTreeSet::new();
            for variant in expand_brackets(&include) {
                files.extend(self.resolve_expanded(&variant, cwd));
            }
            if files.is_empty() {
                tracing::warn!(include, "no file matches optional include");
            }
            return files;
        }

        self.resolve_expanded(&include, cwd)
    }

    fn resolve_expanded(&mut self, include: &str, cwd: &Path) -> BTreeSet<PathBuf> {
        let (base, suffix) = split_at_wildcard(include);
        let Some(resolved) = self.locate(base, cwd) else {
            tracing::debug!(include, cwd = %cwd.display(), "include base not found");
            return BTreeSet::new();
        };

        if suffix.is_empty() {
            return self.single(resolved);
        }
        if !resolved.is_dir() {
            tracing::debug!(path = %resolved.display(), "wildcard base is not a directory");
            return BTreeSet::new();
        }

        let components: Vec<&str> = suffix.split('/').filter(|part| !part.is_empty()).collect();
        let mut seen = HashSet::from([canonical(&resolved)]);
        self.expand_components(&resolved, &components, &mut seen)
            .unwrap_or_default()
    }

    fn single(&mut self, path: PathBuf) -> BTreeSet<PathBuf> {
        if !path.is_dir() {
            return BTreeSet::from([path]);
        }
        match self.policy {
            DirectoryPolicy::Expand => {
                tracing::warn!(path = %path.display(), "include names a directory, reading its files");
                self.expand_directory(&path, &mut HashSet::new()).unwrap_or_default()
            }
            DirectoryPolicy::Skip | DirectoryPolicy::Refuse => {
                tracing::warn!(path = %path.display(), "include names a directory, ignoring it");
                BTreeSet::new()
            }
        }
    }

    /// Walk `components` below `dir`; `None` means the directory policy
    /// refused the whole include.
    ///
    /// `seen` holds the canonical form of every directory expanded and file
    /// returned so far, so symlinked aliases are read once and directory
    /// loops end.
    fn expand_components(
        &mut self,
        dir: &Path,
        components: &[&str],
        seen: &mut HashSet<PathBuf>,
    ) -> Option<BTreeSet<PathBuf>> {
        let Some((first, rest)) = components.split_first() else {
            return Some(BTreeSet::new());
        };

        let candidates: Vec<PathBuf> = if first.contains('*') {
            let matcher = compile(first)?;
            list_directory(dir)
                .into_iter()
                .filter(|path| {
                    path.file_name()
                        .is_some_and(|name| matcher.is_match(Path::new(name)))
                })
                .collect()
        } else {
            let candidate = dir.join(first);
            if candidate.exists() {
                vec![candidate]
            } else {
                Vec::new()
            }
        };

        let mut files = BTreeSet::new();
        for candidate in candidates {
            if !rest.is_empty() {
                if candidate.is_dir() {
                    files.extend(self.expand_components(&candidate, rest, seen)?);
                }
                continue;
            }
            if !candidate.is_dir() {
                if seen.insert(canonical(&candidate)) {
                    files.insert(candidate);
                }
                continue;
            }
            match self.policy {
                DirectoryPolicy::Expand => {
                    files.extend(self.expand_directory(&candidate, seen)?);
                }
                DirectoryPolicy::Skip => {
                    tracing::debug!(path = %candidate.display(), "skipping directory matched by include");
                }
                DirectoryPolicy::Refuse => {
                    tracing::warn!(
                        path = %candidate.display(),
                        "include pattern matches a directory, refusing the include"
                    );
                    return None;
                }
            }
        }
        Some(files)
    }

    fn expand_directory(&mut self, dir: &Path, seen: &mut HashSet<PathBuf>) -> Option<BTreeSet<PathBuf>> {
        if !seen.insert(canonical(dir)) {
            tracing::debug!(path = %dir.display(), "directory already expanded, skipping it");
            return Some(BTreeSet::new());
        }
        self.expand_components(dir, &["*"], seen)
    }

    /// Find the existing path `base` denotes when read from `cwd`.
    fn locate(&mut self, base: &str, cwd: &Path) -> Option<PathBuf> {
        if let Some(cached) = self.cache.get(cwd, base) {
            return cached;
        }

        let found = if Path::new(base).is_absolute() {
            let absolute = PathBuf::from(base);
            if absolute.exists() {
                Some(normalize_path(absolute))
            } else {
                tails(&absolute)
                    .into_iter()
                    .find_map(|tail| search_ancestors(cwd, &tail))
            }
        } else {
            search_ancestors(cwd, Path::new(strip_relative_prefix(base)))
        };

        match &found {
            Some(path) => tracing::debug!(base, resolved = %path.display(), "resolved include base"),
            None => tracing::debug!(base, cwd = %cwd.display(), "include base does not exist"),
        }
        self.cache.insert(cwd, base, found.clone());
        found
    }
}

fn search_ancestors(cwd: &Path, relative: &Path) -> Option<PathBuf> {
    cwd.ancestors()
        .map(|ancestor| ancestor.join(relative))
        .find(|candidate| candidate.exists())
        .map(normalize_path)
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn compile(pattern: &str) -> Option<GlobMatcher> {
    match Glob::new(pattern) {
        Ok(glob) => Some(glob.compile_matcher()),
        Err(err) => {
            tracing::warn!(pattern, "invalid include pattern: {err}");
            None
        }
    }
}

fn list_directory(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.into_path()),
            Err(err) => {
                tracing::warn!(dir = %dir.display(), "cannot list include directory: {err}");
                None
            }
        })
        .collect()
}

/// Every spelling of `include` with each `[x]` either removed or inlined.
pub fn expand_brackets(include: &str) -> Vec<String> {
    let Some(open) = include.find('[') else {
        return vec![include.to_string()];
    };
    let Some(len) = include[open + 1..].find(']') else {
        return vec![include.to_string()];
    };
    let close = open + 1 + len;
    let prefix = &include[..open];
    let inner = &include[open + 1..close];

    let mut variants = Vec::new();
    for rest in expand_brackets(&include[close + 1..]) {
        variants.push(format!("{prefix}{rest}"));
        variants.push(format!("{prefix}{inner}{rest}"));
    }
    variants
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn brackets_expand_to_both_spellings() {
        assert_eq!(expand_brackets("file.con[f]"), vec!["file.con", "file.conf"]);
        assert_eq!(
            expand_brackets("a[b]c[d]"),
            vec!["ac", "abc", "acd", "abcd"]
        );
        assert_eq!(expand_brackets("no-brackets"), vec!["no-brackets"]);
        assert_eq!(expand_brackets("open[only"), vec!["open[only"]);
    }
}
