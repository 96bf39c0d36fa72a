//! Shared test harness utilities for dispatchlint crates.

use std::path::{Path, PathBuf};
use std::sync::Once;

use dispatchlint_config::Config;
use tempfile::TempDir;

/// Returns a baseline configuration for tests.
pub fn test_config() -> Config {
    Config::default()
}

/// Baseline configuration with tighter include and line ceilings.
pub fn limited_config(max_include_depth: usize, max_config_lines: usize) -> Config {
    let mut config = Config::default();
    config.limits.max_include_depth = max_include_depth;
    config.limits.max_config_lines = max_config_lines;
    config
}

/// Install a test-writer subscriber once so `RUST_LOG` shows parser logs.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Temporary configuration tree populated file by file.
pub struct Fixture {
    temp: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Fixture {
            temp: TempDir::new().expect("tempdir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.temp.path().join(relative)
    }

    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let absolute = self.path(relative);
        if let Some(parent) = absolute.parent() {
            std::fs::create_dir_all(parent).expect("create parent directories");
        }
        std::fs::write(&absolute, contents).expect("write fixture");
        absolute
    }

    pub fn mkdir(&self, relative: &str) -> PathBuf {
        let absolute = self.path(relative);
        std::fs::create_dir_all(&absolute).expect("create directory");
        absolute
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}
