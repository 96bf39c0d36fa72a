//! Settings and loader for the dispatchlint toolkit.
//!
//! The loader resolves configuration using a precedence stack:
//! override flag → working directory → git root → built-in defaults.
//! Every layer is a `.dispatchlint.toml` file. Parsed settings are normalised
//! into typed structures so downstream crates never touch raw TOML.

mod levels;

use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub use levels::{CheckMode, DirectoryPolicy, Severity, Verbosity};

const CONFIG_FILE_NAME: &str = ".dispatchlint.toml";

pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 1000;
pub const DEFAULT_MAX_CONFIG_LINES: usize = 500_000;
pub const DEFAULT_DISPATCHER_ENTRY: &str = "conf.dispatcher.d/dispatcher.any";
pub const DEFAULT_HTTPD_ENTRY: &str = "conf/httpd.conf";

/// Complete configuration resolved from defaults and on-disk overrides.
#[derive(Clone, Debug)]
pub struct Config {
    pub limits: LimitSettings,
    pub includes: IncludeSettings,
    pub analysis: AnalysisSettings,
    pub environment: EnvironmentSettings,
    pub sources: ConfigSources,
}

/// Ceilings guarding against circular includes and pathological fan-out.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LimitSettings {
    pub max_include_depth: usize,
    pub max_config_lines: usize,
}

impl Default for LimitSettings {
    fn default() -> Self {
        LimitSettings {
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
            max_config_lines: DEFAULT_MAX_CONFIG_LINES,
        }
    }
}

/// Settings consulted by the include path resolver.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct IncludeSettings {
    pub directory_policy: DirectoryPolicy,
}

/// Settings covering rule evaluation and violation reporting.
#[derive(Clone, Debug)]
pub struct AnalysisSettings {
    pub verbosity: Verbosity,
    pub check_mode: CheckMode,
    pub dispatcher_entry: PathBuf,
    pub httpd_entry: PathBuf,
    pub rules_file: Option<PathBuf>,
    pub disabled_rules: Vec<String>,
    pub severity: HashMap<String, Severity>,
}

impl AnalysisSettings {
    /// Returns the effective severity for the rule `id`, falling back to `declared`.
    pub fn severity_for(&self, id: &str, declared: Severity) -> Severity {
        self.severity.get(id).copied().unwrap_or(declared)
    }

    pub fn is_rule_disabled(&self, id: &str) -> bool {
        self.disabled_rules.iter().any(|disabled| disabled == id)
    }
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        AnalysisSettings {
            verbosity: Verbosity::default(),
            check_mode: CheckMode::default(),
            dispatcher_entry: PathBuf::from(DEFAULT_DISPATCHER_ENTRY),
            httpd_entry: PathBuf::from(DEFAULT_HTTPD_ENTRY),
            rules_file: None,
            disabled_rules: Vec::new(),
            severity: HashMap::new(),
        }
    }
}

/// Variables visible to `${NAME}` substitution.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EnvironmentSettings {
    pub inherit_process: bool,
    pub variables: BTreeMap<String, String>,
}

impl Default for EnvironmentSettings {
    fn default() -> Self {
        EnvironmentSettings {
            inherit_process: true,
            variables: BTreeMap::new(),
        }
    }
}

/// Provenance information for resolved configuration.
#[derive(Clone, Debug)]
pub struct ConfigSources {
    pub working_directory: PathBuf,
    pub layers: Vec<ConfigSource>,
}

/// Specific layer of configuration (default/git/local/override).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigSource {
    pub kind: ConfigSourceKind,
    pub path: Option<PathBuf>,
    pub base_dir: PathBuf,
}

impl ConfigSource {
    fn default(base_dir: PathBuf) -> Self {
        ConfigSource {
            kind: ConfigSourceKind::Default,
            path: None,
            base_dir,
        }
    }

    fn for_file(kind: ConfigSourceKind, path: PathBuf) -> Self {
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        ConfigSource {
            kind,
            path: Some(path),
            base_dir,
        }
    }

    fn describe(&self) -> String {
        match (&self.kind, &self.path) {
            (ConfigSourceKind::Default, _) => "built-in defaults".to_owned(),
            (kind, Some(path)) => format!("{} at {}", kind, path.display()),
            (kind, None) => kind.to_string(),
        }
    }
}

/// Kinds of configuration sources, ordered from lowest to highest precedence.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfigSourceKind {
    Default,
    GitRoot,
    Local,
    Override,
}

impl fmt::Display for ConfigSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConfigSourceKind::Default => "defaults",
            ConfigSourceKind::GitRoot => "git-root config",
            ConfigSourceKind::Local => "local config",
            ConfigSourceKind::Override => "override config",
        };
        f.write_str(label)
    }
}

/// Loader options, typically supplied by an embedding tool.
#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub override_path: Option<PathBuf>,
    pub working_dir: Option<PathBuf>,
}

impl LoadOptions {
    pub fn with_override_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.override_path = Some(path.into());
        self
    }

    pub fn with_working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(path.into());
        self
    }
}

/// Errors surfaced while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to resolve working directory {attempted}: {source}")]
    WorkingDirectory {
        attempted: PathBuf,
        source: io::Error,
    },
    #[error("override config {path} not found")]
    OverrideNotFound { path: PathBuf },
    #[error("failed to read config {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("configuration validation failed:\n{0}")]
    Validation(ConfigValidationErrors),
}

impl Config {
    /// Loads configuration using the precedence rules and returns typed settings.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let working_dir = resolve_working_dir(options.working_dir)?;
        let override_path = options
            .override_path
            .map(|path| make_absolute(&path, &working_dir));

        if let Some(path) = &override_path {
            if !path.exists() {
                return Err(ConfigError::OverrideNotFound { path: path.clone() });
            }
        }

        let default_source = ConfigSource::default(working_dir.clone());
        let mut merged = PartialConfig::default();
        merged.merge(defaults_layer(default_source.clone()));

        let mut source_layers = vec![default_source];

        let git_root = find_git_root(&working_dir);
        let git_config_path = git_root.as_ref().map(|root| root.join(CONFIG_FILE_NAME));
        let local_config_path = working_dir.join(CONFIG_FILE_NAME);

        if let Some(path) = git_config_path.as_ref() {
            if path.exists() && Some(path) != override_path.as_ref() && path != &local_config_path {
                let source = ConfigSource::for_file(ConfigSourceKind::GitRoot, path.clone());
                merged.merge(load_layer(path, source.clone())?);
                source_layers.push(source);
            }
        }

        if local_config_path.exists() && Some(&local_config_path) != override_path.as_ref() {
            let source = ConfigSource::for_file(ConfigSourceKind::Local, local_config_path.clone());
            merged.merge(load_layer(&local_config_path, source.clone())?);
            source_layers.push(source);
        }

        if let Some(path) = override_path {
            let source = ConfigSource::for_file(ConfigSourceKind::Override, path.clone());
            merged.merge(load_layer(&path, source.clone())?);
            source_layers.push(source);
        }

        let resolved = merged.finalize().map_err(ConfigError::Validation)?;
        Ok(Config {
            limits: resolved.limits,
            includes: resolved.includes,
            analysis: resolved.analysis,
            environment: resolved.environment,
            sources: ConfigSources {
                working_directory: working_dir,
                layers: source_layers,
            },
        })
    }

    /// Parses a single TOML document on top of the built-in defaults without
    /// consulting the filesystem. Relative paths resolve against `base_dir`.
    pub fn from_toml_str(contents: &str, base_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let base_dir = base_dir.into();
        let default_source = ConfigSource::default(base_dir.clone());
        let inline_source = ConfigSource {
            kind: ConfigSourceKind::Override,
            path: None,
            base_dir: base_dir.clone(),
        };

        let mut merged = PartialConfig::default();
        merged.merge(defaults_layer(default_source.clone()));
        let layer = parse_layer(contents, inline_source.clone()).map_err(|err| match err {
            LayerParseError::Parse { source } => ConfigError::Parse {
                path: base_dir.join(CONFIG_FILE_NAME),
                source,
            },
        })?;
        merged.merge(layer);

        let resolved = merged.finalize().map_err(ConfigError::Validation)?;
        Ok(Config {
            limits: resolved.limits,
            includes: resolved.includes,
            analysis: resolved.analysis,
            environment: resolved.environment,
            sources: ConfigSources {
                working_directory: base_dir,
                layers: vec![default_source, inline_source],
            },
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        let working_directory = PathBuf::from(".");
        Config {
            limits: LimitSettings::default(),
            includes: IncludeSettings::default(),
            analysis: AnalysisSettings::default(),
            environment: EnvironmentSettings::default(),
            sources: ConfigSources {
                layers: vec![ConfigSource::default(working_directory.clone())],
                working_directory,
            },
        }
    }
}

fn resolve_working_dir(override_dir: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    match override_dir {
        Some(path) => fs::canonicalize(&path).map_err(|source| ConfigError::WorkingDirectory {
            attempted: path,
            source,
        }),
        None => env::current_dir().map_err(|source| ConfigError::WorkingDirectory {
            attempted: PathBuf::from("."),
            source,
        }),
    }
}

fn make_absolute(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn load_layer(path: &Path, source: ConfigSource) -> Result<PartialConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.into(),
        source,
    })?;
    parse_layer(&contents, source).map_err(|err| match err {
        LayerParseError::Parse { source } => ConfigError::Parse {
            path: path.into(),
            source,
        },
    })
}

fn parse_layer(contents: &str, source: ConfigSource) -> Result<PartialConfig, LayerParseError> {
    let raw: RawConfig =
        toml::from_str(contents).map_err(|source| LayerParseError::Parse { source })?;
    Ok(raw.into_partial(source))
}

fn defaults_layer(source: ConfigSource) -> PartialConfig {
    let limits = LimitsPartial {
        max_include_depth: Some(Located::new(DEFAULT_MAX_INCLUDE_DEPTH, source.clone())),
        max_config_lines: Some(Located::new(DEFAULT_MAX_CONFIG_LINES, source.clone())),
    };

    let includes = IncludesPartial {
        directory_policy: Some(Located::new(
            DirectoryPolicy::default().to_string(),
            source.clone(),
        )),
    };

    let analysis = AnalysisPartial {
        verbosity: Some(Located::new(Verbosity::default().to_string(), source.clone())),
        check_mode: Some(Located::new(CheckMode::default().to_string(), source.clone())),
        dispatcher_entry: Some(Located::new(
            PathBuf::from(DEFAULT_DISPATCHER_ENTRY),
            source.clone(),
        )),
        httpd_entry: Some(Located::new(
            PathBuf::from(DEFAULT_HTTPD_ENTRY),
            source.clone(),
        )),
        ..AnalysisPartial::default()
    };

    let environment = EnvironmentPartial {
        inherit_process: Some(Located::new(true, source)),
        ..EnvironmentPartial::default()
    };

    PartialConfig {
        limits: Some(limits),
        includes: Some(includes),
        analysis: Some(analysis),
        environment: Some(environment),
    }
}

fn find_git_root(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        if dir.join(".git").exists() {
            return Some(dir.to_path_buf());
        }
        current = dir.parent();
    }
    None
}

#[derive(Debug)]
enum LayerParseError {
    Parse { source: toml::de::Error },
}

#[derive(Clone, Debug, Default)]
struct PartialConfig {
    limits: Option<LimitsPartial>,
    includes: Option<IncludesPartial>,
    analysis: Option<AnalysisPartial>,
    environment: Option<EnvironmentPartial>,
}

impl PartialConfig {
    fn merge(&mut self, mut other: PartialConfig) {
        if let Some(other_limits) = other.limits.take() {
            match &mut self.limits {
                Some(limits) => limits.merge(other_limits),
                None => self.limits = Some(other_limits),
            }
        }

        if let Some(other_includes) = other.includes.take() {
            match &mut self.includes {
                Some(includes) => includes.merge(other_includes),
                None => self.includes = Some(other_includes),
            }
        }

        if let Some(other_analysis) = other.analysis.take() {
            match &mut self.analysis {
                Some(analysis) => analysis.merge(other_analysis),
                None => self.analysis = Some(other_analysis),
            }
        }

        if let Some(other_environment) = other.environment.take() {
            match &mut self.environment {
                Some(environment) => environment.merge(other_environment),
                None => self.environment = Some(other_environment),
            }
        }
    }

    fn finalize(self) -> Result<ResolvedConfig, ConfigValidationErrors> {
        let mut errors = Vec::new();

        let limits_partial = self.limits.unwrap_or_default();
        let max_include_depth = positive_limit(
            limits_partial.max_include_depth,
            DEFAULT_MAX_INCLUDE_DEPTH,
            "limits.max_include_depth",
            &mut errors,
        );
        let max_config_lines = positive_limit(
            limits_partial.max_config_lines,
            DEFAULT_MAX_CONFIG_LINES,
            "limits.max_config_lines",
            &mut errors,
        );

        let includes_partial = self.includes.unwrap_or_default();
        let directory_policy = parse_choice::<DirectoryPolicy>(
            includes_partial.directory_policy,
            "includes.directory_policy",
            &mut errors,
        );

        let analysis_partial = self.analysis.unwrap_or_default();
        let verbosity =
            parse_choice::<Verbosity>(analysis_partial.verbosity, "analysis.verbosity", &mut errors);
        let check_mode = parse_choice::<CheckMode>(
            analysis_partial.check_mode,
            "analysis.check_mode",
            &mut errors,
        );
        let dispatcher_entry = entry_path(
            analysis_partial.dispatcher_entry,
            DEFAULT_DISPATCHER_ENTRY,
            "analysis.dispatcher_entry",
            &mut errors,
        );
        let httpd_entry = entry_path(
            analysis_partial.httpd_entry,
            DEFAULT_HTTPD_ENTRY,
            "analysis.httpd_entry",
            &mut errors,
        );
        let rules_file = analysis_partial
            .rules_file
            .as_ref()
            .map(resolve_path);
        let disabled_rules = analysis_partial
            .disabled_rules
            .map(|located| located.value)
            .unwrap_or_default();
        let severity = parse_severity_map(analysis_partial.severity, &mut errors);

        let environment_partial = self.environment.unwrap_or_default();
        let inherit_process = environment_partial
            .inherit_process
            .map(|located| located.value)
            .unwrap_or(true);
        let variables = environment_partial
            .variables
            .into_iter()
            .map(|(name, located)| (name, located.value))
            .collect();

        if !errors.is_empty() {
            return Err(ConfigValidationErrors(errors));
        }

        Ok(ResolvedConfig {
            limits: LimitSettings {
                max_include_depth,
                max_config_lines,
            },
            includes: IncludeSettings { directory_policy },
            analysis: AnalysisSettings {
                verbosity,
                check_mode,
                dispatcher_entry,
                httpd_entry,
                rules_file,
                disabled_rules,
                severity,
            },
            environment: EnvironmentSettings {
                inherit_process,
                variables,
            },
        })
    }
}

#[derive(Clone, Debug, Default)]
struct LimitsPartial {
    max_include_depth: Option<Located<usize>>,
    max_config_lines: Option<Located<usize>>,
}

impl LimitsPartial {
    fn merge(&mut self, other: LimitsPartial) {
        if other.max_include_depth.is_some() {
            self.max_include_depth = other.max_include_depth;
        }
        if other.max_config_lines.is_some() {
            self.max_config_lines = other.max_config_lines;
        }
    }
}

#[derive(Clone, Debug, Default)]
struct IncludesPartial {
    directory_policy: Option<Located<String>>,
}

impl IncludesPartial {
    fn merge(&mut self, other: IncludesPartial) {
        if other.directory_policy.is_some() {
            self.directory_policy = other.directory_policy;
        }
    }
}

#[derive(Clone, Debug, Default)]
struct AnalysisPartial {
    verbosity: Option<Located<String>>,
    check_mode: Option<Located<String>>,
    dispatcher_entry: Option<Located<PathBuf>>,
    httpd_entry: Option<Located<PathBuf>>,
    rules_file: Option<Located<PathBuf>>,
    disabled_rules: Option<Located<Vec<String>>>,
    severity: HashMap<String, Located<String>>,
}

impl AnalysisPartial {
    fn merge(&mut self, other: AnalysisPartial) {
        if other.verbosity.is_some() {
            self.verbosity = other.verbosity;
        }
        if other.check_mode.is_some() {
            self.check_mode = other.check_mode;
        }
        if other.dispatcher_entry.is_some() {
            self.dispatcher_entry = other.dispatcher_entry;
        }
        if other.httpd_entry.is_some() {
            self.httpd_entry = other.httpd_entry;
        }
        if other.rules_file.is_some() {
            self.rules_file = other.rules_file;
        }
        if other.disabled_rules.is_some() {
            self.disabled_rules = other.disabled_rules;
        }
        for (key, value) in other.severity {
            self.severity.insert(key, value);
        }
    }
}

#[derive(Clone, Debug, Default)]
struct EnvironmentPartial {
    inherit_process: Option<Located<bool>>,
    variables: BTreeMap<String, Located<String>>,
}

impl EnvironmentPartial {
    fn merge(&mut self, other: EnvironmentPartial) {
        if other.inherit_process.is_some() {
            self.inherit_process = other.inherit_process;
        }
        for (key, value) in other.variables {
            self.variables.insert(key, value);
        }
    }
}

#[derive(Clone, Debug)]
struct Located<T> {
    value: T,
    source: ConfigSource,
}

impl<T> Located<T> {
    fn new(value: T, source: ConfigSource) -> Self {
        Located { value, source }
    }
}

fn resolve_path(located: &Located<PathBuf>) -> PathBuf {
    let path = &located.value;
    if path.is_absolute() {
        path.clone()
    } else {
        located.source.base_dir.join(path)
    }
}

fn positive_limit(
    located: Option<Located<usize>>,
    fallback: usize,
    context: &str,
    errors: &mut Vec<ConfigValidationError>,
) -> usize {
    let Some(located) = located else {
        return fallback;
    };
    if located.value == 0 {
        errors.push(
            ConfigValidationError::new(
                Some(located.source),
                "limit must be at least 1 (received 0)".into(),
            )
            .with_context(context),
        );
        return fallback;
    }
    located.value
}

fn parse_choice<T>(
    located: Option<Located<String>>,
    context: &str,
    errors: &mut Vec<ConfigValidationError>,
) -> T
where
    T: std::str::FromStr + Default,
{
    let Some(located) = located else {
        return T::default();
    };
    match located.value.parse::<T>() {
        Ok(value) => value,
        Err(_) => {
            errors.push(
                ConfigValidationError::new(
                    Some(located.source.clone()),
                    format!("unknown value '{}'", located.value),
                )
                .with_context(context),
            );
            T::default()
        }
    }
}

fn entry_path(
    located: Option<Located<PathBuf>>,
    fallback: &str,
    context: &str,
    errors: &mut Vec<ConfigValidationError>,
) -> PathBuf {
    let Some(located) = located else {
        return PathBuf::from(fallback);
    };
    if located.value.as_os_str().is_empty() {
        errors.push(
            ConfigValidationError::new(Some(located.source), "entry path cannot be empty".into())
                .with_context(context),
        );
        return PathBuf::from(fallback);
    }
    located.value
}

fn parse_severity_map(
    raw: HashMap<String, Located<String>>,
    errors: &mut Vec<ConfigValidationError>,
) -> HashMap<String, Severity> {
    let mut result = HashMap::new();
    for (rule_id, located_value) in raw {
        match located_value.value.parse::<Severity>() {
            Ok(level) => {
                result.insert(rule_id, level);
            }
            Err(_) => errors.push(
                ConfigValidationError::new(
                    Some(located_value.source.clone()),
                    format!(
                        "invalid severity '{}' for rule '{}'",
                        located_value.value, rule_id
                    ),
                )
                .with_context("analysis.severity"),
            ),
        }
    }
    result
}

#[derive(Clone, Debug)]
struct ResolvedConfig {
    limits: LimitSettings,
    includes: IncludeSettings,
    analysis: AnalysisSettings,
    environment: EnvironmentSettings,
}

/// Container for validation failures, formatted as a bullet list.
#[derive(Debug)]
pub struct ConfigValidationErrors(pub Vec<ConfigValidationError>);

impl fmt::Display for ConfigValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, err) in self.0.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "- {err}")?;
        }
        Ok(())
    }
}

impl ConfigValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ConfigValidationError> {
        self.0.iter()
    }
}

/// Validation failure with optional provenance.
#[derive(Clone, Debug)]
pub struct ConfigValidationError {
    pub source: Option<ConfigSource>,
    pub message: String,
    pub context: Option<String>,
}

impl ConfigValidationError {
    fn new(source: Option<ConfigSource>, message: String) -> Self {
        ConfigValidationError {
            source,
            message,
            context: None,
        }
    }

    fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            write!(f, "{}: {}", context, self.message)?;
        } else {
            write!(f, "{}", self.message)?;
        }
        if let Some(source) = &self.source {
            write!(f, " ({})", source.describe())?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    limits: Option<RawLimits>,
    #[serde(default)]
    includes: Option<RawIncludes>,
    #[serde(default)]
    analysis: Option<RawAnalysis>,
    #[serde(default)]
    environment: Option<RawEnvironment>,
}

impl RawConfig {
    fn into_partial(self, source: ConfigSource) -> PartialConfig {
        PartialConfig {
            limits: self.limits.map(|limits| limits.into_partial(source.clone())),
            includes: self
                .includes
                .map(|includes| includes.into_partial(source.clone())),
            analysis: self
                .analysis
                .map(|analysis| analysis.into_partial(source.clone())),
            environment: self
                .environment
                .map(|environment| environment.into_partial(source)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawLimits {
    #[serde(default)]
    max_include_depth: Option<usize>,
    #[serde(default)]
    max_config_lines: Option<usize>,
}

impl RawLimits {
    fn into_partial(self, source: ConfigSource) -> LimitsPartial {
        LimitsPartial {
            max_include_depth: self
                .max_include_depth
                .map(|value| Located::new(value, source.clone())),
            max_config_lines: self
                .max_config_lines
                .map(|value| Located::new(value, source)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawIncludes {
    #[serde(default)]
    directory_policy: Option<String>,
}

impl RawIncludes {
    fn into_partial(self, source: ConfigSource) -> IncludesPartial {
        IncludesPartial {
            directory_policy: self
                .directory_policy
                .map(|value| Located::new(value, source)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawAnalysis {
    #[serde(default)]
    verbosity: Option<String>,
    #[serde(default)]
    check_mode: Option<String>,
    #[serde(default)]
    dispatcher_entry: Option<PathBuf>,
    #[serde(default)]
    httpd_entry: Option<PathBuf>,
    #[serde(default)]
    rules_file: Option<PathBuf>,
    #[serde(default)]
    disabled_rules: Option<Vec<String>>,
    #[serde(default)]
    severity: HashMap<String, String>,
}

impl RawAnalysis {
    fn into_partial(self, source: ConfigSource) -> AnalysisPartial {
        let severity = self
            .severity
            .into_iter()
            .map(|(key, value)| (key, Located::new(value, source.clone())))
            .collect();

        AnalysisPartial {
            verbosity: self.verbosity.map(|value| Located::new(value, source.clone())),
            check_mode: self
                .check_mode
                .map(|value| Located::new(value, source.clone())),
            dispatcher_entry: self
                .dispatcher_entry
                .map(|value| Located::new(value, source.clone())),
            httpd_entry: self
                .httpd_entry
                .map(|value| Located::new(value, source.clone())),
            rules_file: self
                .rules_file
                .map(|value| Located::new(value, source.clone())),
            disabled_rules: self
                .disabled_rules
                .map(|value| Located::new(value, source)),
            severity,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawEnvironment {
    #[serde(default)]
    inherit_process: Option<bool>,
    #[serde(default)]
    variables: BTreeMap<String, String>,
}

impl RawEnvironment {
    fn into_partial(self, source: ConfigSource) -> EnvironmentPartial {
        EnvironmentPartial {
            inherit_process: self
                .inherit_process
                .map(|value| Located::new(value, source.clone())),
            variables: self
                .variables
                .into_iter()
                .map(|(key, value)| (key, Located::new(value, source.clone())))
                .collect(),
        }
    }
}
