use std::path::{Component, Path, PathBuf};

/// Canonicalise `.` and `..` path segments without touching the filesystem.
pub fn normalize_path(path: PathBuf) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// True when the include expression uses `*` or `[x]` syntax.
pub fn has_pattern(include: &str) -> bool {
    include.contains('*') || include.contains('[')
}

/// Drop every leading `./` and `../` segment of a relative include.
pub fn strip_relative_prefix(include: &str) -> &str {
    let mut rest = include;
    loop {
        if let Some(stripped) = rest.strip_prefix("../") {
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix("./") {
            rest = stripped;
        } else if rest == ".." || rest == "." {
            return "";
        } else {
            return rest;
        }
    }
}

/// Split an include at the path separator preceding its first `*`.
///
/// Returns the literal base and the wildcard suffix. The suffix never starts
/// with `/`; an include without `*` is all base.
pub fn split_at_wildcard(include: &str) -> (&str, &str) {
    let Some(star) = include.find('*') else {
        return (include, "");
    };
    match include[..star].rfind('/') {
        Some(0) => ("/", &include[1..]),
        Some(slash) => (&include[..slash], &include[slash + 1..]),
        None => ("", include),
    }
}

/// Progressively shorter tails of `path`, dropping one leading component at a time.
pub fn tails(path: &Path) -> Vec<PathBuf> {
    let parts: Vec<_> = path
        .components()
        .filter(|component| matches!(component, Component::Normal(_)))
        .collect();
    (1..parts.len())
        .map(|start| parts[start..].iter().collect::<PathBuf>())
        .collect()
}
