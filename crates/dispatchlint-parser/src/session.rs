use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use dispatchlint_config::{Config, DirectoryPolicy, LimitSettings};
use dispatchlint_include::PathResolver;
use dispatchlint_syntax::{
    normalize_lines, read_lines, ConfigLine, Dialect, Diagnostics, Environment, NormalizeOptions,
};

use crate::ParseError;

/// State shared by every file read during one top-level parse.
///
/// The include counter only ever grows, so a file included twice counts
/// twice. Both counters are checked before descending into another file.
#[derive(Debug)]
pub struct ParseSession {
    limits: LimitSettings,
    resolver: PathResolver,
    environment: Environment,
    diagnostics: Diagnostics,
    includes: usize,
    lines: usize,
    files: usize,
}

impl ParseSession {
    pub fn new(config: &Config) -> Self {
        Self::with_parts(
            config.limits,
            config.includes.directory_policy,
            Environment::from_settings(&config.environment),
        )
    }

    pub fn with_parts(
        limits: LimitSettings,
        policy: DirectoryPolicy,
        environment: Environment,
    ) -> Self {
        ParseSession {
            limits,
            resolver: PathResolver::new(policy),
            environment,
            diagnostics: Diagnostics::new(),
            includes: 0,
            lines: 0,
            files: 0,
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn environment_mut(&mut self) -> &mut Environment {
        &mut self.environment
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn files_parsed(&self) -> usize {
        self.files
    }

    pub fn lines_parsed(&self) -> usize {
        self.lines
    }

    pub fn includes_followed(&self) -> usize {
        self.includes
    }

    /// Resolve an include expression relative to `cwd`.
    pub fn resolve(&mut self, include: &str, cwd: &Path) -> BTreeSet<PathBuf> {
        self.resolver
            .resolve_files(include, cwd, &self.environment)
    }

    /// Count one more include descent into `path` and enforce both ceilings.
    pub fn enter_include(&mut self, path: &Path) -> Result<(), ParseError> {
        self.includes += 1;
        if self.includes > self.limits.max_include_depth {
            return Err(ParseError::IncludeDepthExceeded {
                max: self.limits.max_include_depth,
                path: path.to_path_buf(),
            });
        }
        self.check_lines(path)
    }

    /// Read and normalise one file, adding its lines to the running total.
    ///
    /// Dispatcher files are substituted here; httpd files are substituted
    /// per directive so that `Define` takes effect for later lines.
    pub fn load_file(
        &mut self,
        path: &Path,
        included_from: Option<&Path>,
        dialect: Dialect,
    ) -> Result<Vec<ConfigLine>, ParseError> {
        let io_error = |source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(io_error)?;
        let records = read_lines(&mut BufReader::new(file)).map_err(io_error)?;

        let options = match dialect {
            Dialect::Dispatcher => NormalizeOptions::new(dialect).with_environment(&self.environment),
            Dialect::Httpd => NormalizeOptions::new(dialect),
        };
        let lines = normalize_lines(path, included_from, &records, options, &mut self.diagnostics);

        self.files += 1;
        self.lines += lines.len();
        tracing::debug!(
            path = %path.display(),
            lines = lines.len(),
            total = self.lines,
            "loaded configuration file"
        );
        self.check_lines(path)?;
        Ok(lines)
    }

    fn check_lines(&self, path: &Path) -> Result<(), ParseError> {
        if self.lines > self.limits.max_config_lines {
            return Err(ParseError::LineLimitExceeded {
                max: self.limits.max_config_lines,
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }
}
