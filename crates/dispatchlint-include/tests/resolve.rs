use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use dispatchlint_config::DirectoryPolicy;
use dispatchlint_include::PathResolver;
use dispatchlint_syntax::Environment;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn write_file(base: &TempDir, path: &str, contents: &str) -> PathBuf {
    let absolute = base.path().join(path);
    if let Some(parent) = absolute.parent() {
        std::fs::create_dir_all(parent).expect("create parent directories");
    }
    std::fs::write(&absolute, contents).expect("write fixture");
    absolute
}

fn set(paths: &[&Path]) -> BTreeSet<PathBuf> {
    paths.iter().map(|path| path.to_path_buf()).collect()
}

#[test]
fn parent_relative_include_is_found_through_an_ancestor() {
    let temp = TempDir::new().expect("tempdir");
    let target = write_file(&temp, "a/b/d/e.conf", "");
    let cwd = temp.path().join("a/b/c");
    std::fs::create_dir_all(&cwd).expect("cwd");

    let mut resolver = PathResolver::new(DirectoryPolicy::Expand);
    let files = resolver.resolve_files("../d/e.conf", &cwd, &Environment::isolated());
    assert_eq!(files, set(&[&target]));
}

#[test]
fn missing_include_resolves_to_nothing() {
    let temp = TempDir::new().expect("tempdir");
    let cwd = temp.path().join("a/b/c");
    std::fs::create_dir_all(&cwd).expect("cwd");

    let mut resolver = PathResolver::new(DirectoryPolicy::Expand);
    let files = resolver.resolve_files(
        "../dispatchlint-missing-dir/e.conf",
        &cwd,
        &Environment::isolated(),
    );
    assert!(files.is_empty());
}

#[test]
fn optional_bracket_matches_the_existing_spelling_once() {
    let temp = TempDir::new().expect("tempdir");
    let target = write_file(&temp, "conf/file.conf", "");

    let mut resolver = PathResolver::new(DirectoryPolicy::Expand);
    let files = resolver.resolve_files(
        "file.con[f]",
        &temp.path().join("conf"),
        &Environment::isolated(),
    );
    assert_eq!(files, set(&[&target]));
}

#[test]
fn wildcard_lists_matching_files_in_sorted_order() {
    let temp = TempDir::new().expect("tempdir");
    let b = write_file(&temp, "conf.d/farms/b.farm", "");
    let a = write_file(&temp, "conf.d/farms/a.farm", "");
    write_file(&temp, "conf.d/farms/notes.txt", "");

    let mut resolver = PathResolver::new(DirectoryPolicy::Expand);
    let files = resolver.resolve_files("farms/*.farm", &temp.path().join("conf.d"), &Environment::isolated());
    assert_eq!(files.into_iter().collect::<Vec<_>>(), vec![a, b]);
}

#[test]
fn wildcard_in_a_middle_segment_descends_into_matching_directories() {
    let temp = TempDir::new().expect("tempdir");
    let one = write_file(&temp, "sites/one/vhost.conf", "");
    let two = write_file(&temp, "sites/two/vhost.conf", "");
    write_file(&temp, "sites/two/other.conf", "");

    let mut resolver = PathResolver::new(DirectoryPolicy::Expand);
    let files = resolver.resolve_files("sites/*/vhost.conf", temp.path(), &Environment::isolated());
    assert_eq!(files, set(&[&one, &two]));
}

#[test]
fn directory_policy_controls_matched_directories() {
    let temp = TempDir::new().expect("tempdir");
    let top = write_file(&temp, "conf.d/top.conf", "");
    let nested = write_file(&temp, "conf.d/nested/inner.conf", "");
    let env = Environment::isolated();

    let mut expand = PathResolver::new(DirectoryPolicy::Expand);
    assert_eq!(
        expand.resolve_files("conf.d/*", temp.path(), &env),
        set(&[&top, &nested])
    );

    let mut skip = PathResolver::new(DirectoryPolicy::Skip);
    assert_eq!(skip.resolve_files("conf.d/*", temp.path(), &env), set(&[&top]));

    let mut refuse = PathResolver::new(DirectoryPolicy::Refuse);
    assert!(refuse.resolve_files("conf.d/*", temp.path(), &env).is_empty());
}

#[test]
fn plain_directory_include_is_read_as_its_files_when_expanding() {
    let temp = TempDir::new().expect("tempdir");
    let inner = write_file(&temp, "conf.d/inner.conf", "");
    let env = Environment::isolated();

    let mut expand = PathResolver::new(DirectoryPolicy::Expand);
    assert_eq!(expand.resolve_files("conf.d", temp.path(), &env), set(&[&inner]));

    let mut skip = PathResolver::new(DirectoryPolicy::Skip);
    assert!(skip.resolve_files("conf.d", temp.path(), &env).is_empty());
}

#[cfg(unix)]
#[test]
fn directory_symlink_loops_are_expanded_once() {
    let temp = TempDir::new().expect("tempdir");
    let file = write_file(&temp, "conf.d/a.conf", "");
    let conf_d = temp.path().join("conf.d");
    std::os::unix::fs::symlink(&conf_d, conf_d.join("loop")).expect("symlink");
    std::fs::create_dir_all(conf_d.join("sub")).expect("sub");
    std::os::unix::fs::symlink(&conf_d, conf_d.join("sub/up")).expect("symlink");
    let env = Environment::isolated();

    let mut resolver = PathResolver::new(DirectoryPolicy::Expand);
    assert_eq!(resolver.resolve_files("conf.d", temp.path(), &env), set(&[&file]));
    assert_eq!(resolver.resolve_files("conf.d/*", temp.path(), &env), set(&[&file]));
}

#[test]
fn variables_are_substituted_before_resolution() {
    let temp = TempDir::new().expect("tempdir");
    let farm = write_file(&temp, "conf.d/enabled_farms/publish.farm", "");

    let mut env = Environment::isolated();
    env.define("FARMS", "conf.d/enabled_farms");

    let mut resolver = PathResolver::new(DirectoryPolicy::Expand);
    assert_eq!(
        resolver.resolve_files("${FARMS}/*.farm", temp.path(), &env),
        set(&[&farm])
    );
    assert!(resolver
        .resolve_files("${UNDEFINED}/*.farm", temp.path(), &env)
        .is_empty());
}

#[test]
fn absolute_include_falls_back_to_a_matching_tail() {
    let temp = TempDir::new().expect("tempdir");
    let vhost = write_file(&temp, "conf.d/vhost.conf", "");
    let cwd = temp.path().join("conf");
    std::fs::create_dir_all(&cwd).expect("cwd");

    let mut resolver = PathResolver::new(DirectoryPolicy::Expand);
    let files = resolver.resolve_files(
        "/opt/dispatchlint-fixture/conf.d/vhost.conf",
        &cwd,
        &Environment::isolated(),
    );
    assert_eq!(files, set(&[&vhost]));
}

#[test]
fn repeated_lookups_are_served_from_the_cache() {
    let temp = TempDir::new().expect("tempdir");
    write_file(&temp, "conf.d/a.any", "");
    let env = Environment::isolated();

    let mut resolver = PathResolver::new(DirectoryPolicy::Expand);
    let first = resolver.resolve_files("conf.d/*.any", temp.path(), &env);
    let second = resolver.resolve_files("conf.d/*.any", temp.path(), &env);
    assert_eq!(first, second);
    assert_eq!(resolver.cache().len(), 1);
    assert_eq!(resolver.cache().hits(), 1);

    resolver.resolve_files("missing/*.any", temp.path(), &env);
    resolver.resolve_files("missing/*.any", temp.path(), &env);
    assert_eq!(resolver.cache().len(), 2);
    assert_eq!(resolver.cache().hits(), 2);
}
