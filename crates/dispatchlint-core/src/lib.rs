//! Core orchestration layer for dispatchlint.
//!
//! An [`Analyzer`] parses the dispatcher and httpd trees below a
//! configuration root, turns parser diagnostics into violations, evaluates
//! the rule set and reduces the result according to the configured
//! verbosity.

mod error;
mod report;

use std::path::Path;
use std::sync::Arc;

use dispatchlint_config::{Config, Severity};
use dispatchlint_parser::{parse_dispatcher, parse_httpd, ParseSession};
use dispatchlint_rules::{apply_verbosity, AnalyzerRule, RuleEngine, RuleSet, Violation};
use dispatchlint_syntax::Diagnostics;

pub use error::AnalyzeError;
pub use report::AnalysisReport;

/// Rule id carried by violations raised while reading configuration.
pub const PARSER_DIAGNOSTIC_RULE: &str = "parser-diagnostic";

/// Entry point for higher-level consumers (CLI, report renderers, etc.).
pub struct Analyzer {
    config: Config,
    engine: RuleEngine,
}

impl Analyzer {
    /// Bootstrap from configuration, loading `analysis.rules_file` when set.
    pub fn bootstrap(config: Config) -> Result<Self, AnalyzeError> {
        let rules = match &config.analysis.rules_file {
            Some(path) => RuleSet::from_path(path)?,
            None => RuleSet::default(),
        };
        Ok(Self::with_rules(config, rules))
    }

    pub fn with_rules(config: Config, rules: RuleSet) -> Self {
        let engine = RuleEngine::new(rules, &config.analysis);
        Self { config, engine }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> &RuleEngine {
        &self.engine
    }

    /// Analyse the configuration tree rooted at `root`.
    ///
    /// Each dialect is read with its own [`ParseSession`], so include caches
    /// and `Define`d variables never leak from one to the other.
    pub fn analyze(&self, root: &Path) -> Result<AnalysisReport, AnalyzeError> {
        if !root.is_dir() {
            return Err(AnalyzeError::MissingConfiguration {
                path: root.to_path_buf(),
                reason: "not a readable configuration directory",
            });
        }

        let dispatcher_entry = root.join(&self.config.analysis.dispatcher_entry);
        let httpd_entry = root.join(&self.config.analysis.httpd_entry);
        if !dispatcher_entry.is_file() && !httpd_entry.is_file() {
            return Err(AnalyzeError::MissingConfiguration {
                path: root.to_path_buf(),
                reason: "holds neither a dispatcher nor an httpd entry file",
            });
        }

        let mut report = AnalysisReport::default();
        let mut violations = Vec::new();

        if dispatcher_entry.is_file() {
            let mut session = ParseSession::new(&self.config);
            let dispatcher = parse_dispatcher(&mut session, &dispatcher_entry)?;
            violations.extend(self.engine.evaluate_dispatcher(&dispatcher));
            self.absorb(&mut session, &mut report, &mut violations);
            report.dispatcher = Some(dispatcher);
        } else {
            tracing::debug!(path = %dispatcher_entry.display(), "no dispatcher configuration");
        }

        if httpd_entry.is_file() {
            let mut session = ParseSession::new(&self.config);
            let httpd = parse_httpd(&mut session, &httpd_entry)?;
            violations.extend(self.engine.evaluate_httpd(&httpd));
            self.absorb(&mut session, &mut report, &mut violations);
            report.httpd = Some(httpd);
        } else {
            tracing::debug!(path = %httpd_entry.display(), "no httpd configuration");
        }

        tracing::info!(
            files = report.files_parsed,
            lines = report.lines_parsed,
            violations = violations.len(),
            "analysis finished"
        );
        report.violations = apply_verbosity(violations, self.config.analysis.verbosity);
        Ok(report)
    }

    fn absorb(&self, session: &mut ParseSession, report: &mut AnalysisReport, violations: &mut Vec<Violation>) {
        report.files_parsed += session.files_parsed();
        report.lines_parsed += session.lines_parsed();
        if self.config.analysis.is_rule_disabled(PARSER_DIAGNOSTIC_RULE) {
            return;
        }
        violations.extend(diagnostic_violations(session.take_diagnostics()));
    }
}

/// One violation of the built-in parser rule per diagnostic, keeping the
/// diagnostic's own severity.
fn diagnostic_violations(diagnostics: Diagnostics) -> Vec<Violation> {
    let mut rules: Vec<(Severity, Arc<AnalyzerRule>)> = Vec::new();
    let mut violations = Vec::new();
    for diagnostic in diagnostics.into_vec() {
        let rule = match rules.iter().find(|(severity, _)| *severity == diagnostic.severity) {
            Some((_, rule)) => rule.clone(),
            None => {
                let rule = Arc::new(parser_rule(diagnostic.severity));
                rules.push((diagnostic.severity, rule.clone()));
                rule
            }
        };
        violations.push(Violation::new(rule, diagnostic.message, diagnostic.source));
    }
    violations
}

fn parser_rule(severity: Severity) -> AnalyzerRule {
    AnalyzerRule {
        id: PARSER_DIAGNOSTIC_RULE.to_string(),
        description: "configuration could not be read as written".to_string(),
        severity,
        element: String::new(),
        checks: Vec::new(),
        farm_type_applicability: Vec::new(),
        enabled: true,
        tags: vec!["parser".to_string()],
        effort: None,
    }
}
