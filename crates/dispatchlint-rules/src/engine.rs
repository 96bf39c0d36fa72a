use std::sync::Arc;

use dispatchlint_config::{AnalysisSettings, CheckMode};
use dispatchlint_parser::{DispatcherConfig, HttpdConfig};

use crate::check::{Check, CheckResult, Outcome};
use crate::element::{ElementPath, Root, Scope};
use crate::{AnalyzerRule, RuleSet, Violation};

/// Evaluates enabled rules against parsed configuration trees.
#[derive(Clone, Debug, Default)]
pub struct RuleEngine {
    rules: Vec<LoadedRule>,
    check_mode: CheckMode,
}

/// An enabled rule with its element path parsed once; `None` when the path
/// names nothing the trees have.
#[derive(Clone, Debug)]
struct LoadedRule {
    rule: Arc<AnalyzerRule>,
    path: Option<ElementPath>,
}

impl RuleEngine {
    /// Drops disabled rules and applies the configured severity overrides.
    pub fn new(rules: RuleSet, settings: &AnalysisSettings) -> Self {
        let mut enabled = Vec::new();
        for mut rule in rules.into_rules() {
            if !rule.enabled || settings.is_rule_disabled(&rule.id) {
                tracing::debug!(rule = %rule.id, "rule disabled");
                continue;
            }
            let path = ElementPath::parse(&rule.element);
            if path.is_none() {
                tracing::warn!(rule = %rule.id, "rule targets unknown element '{}'", rule.element);
            }
            rule.severity = settings.severity_for(&rule.id, rule.severity);
            enabled.push(LoadedRule {
                rule: Arc::new(rule),
                path,
            });
        }
        RuleEngine {
            rules: enabled,
            check_mode: settings.check_mode,
        }
    }

    pub fn with_check_mode(mut self, check_mode: CheckMode) -> Self {
        self.check_mode = check_mode;
        self
    }

    pub fn check_mode(&self) -> CheckMode {
        self.check_mode
    }

    pub fn rules(&self) -> impl ExactSizeIterator<Item = &Arc<AnalyzerRule>> + '_ {
        self.rules.iter().map(|loaded| &loaded.rule)
    }

    /// Run `rule` against one node. A path that does not resolve on this
    /// node yields nothing.
    pub fn evaluate(&self, rule: &Arc<AnalyzerRule>, scope: Scope<'_>) -> Vec<Violation> {
        match ElementPath::parse(&rule.element) {
            Some(path) => self.evaluate_at(rule, &path, scope),
            None => Vec::new(),
        }
    }

    fn evaluate_at(&self, rule: &Arc<AnalyzerRule>, path: &ElementPath, scope: Scope<'_>) -> Vec<Violation> {
        let Some(target) = path.resolve(scope) else {
            return Vec::new();
        };

        let mut violations = Vec::new();
        for check in &rule.checks {
            let result = check.evaluate(&target);
            if check.passes(&result) {
                if self.check_mode == CheckMode::Any {
                    return Vec::new();
                }
                continue;
            }
            if self.check_mode == CheckMode::Any && !violations.is_empty() {
                continue;
            }
            violations.push(violation(rule, check, result, scope));
            if self.check_mode == CheckMode::FirstFailure {
                break;
            }
        }
        violations
    }

    /// Farm rules run once per applicable farm, dispatcher rules once.
    pub fn evaluate_dispatcher(&self, config: &DispatcherConfig) -> Vec<Violation> {
        let mut violations = Vec::new();
        for (farm, farm_type) in config.farms() {
            for (rule, path) in self.rules_for(Root::Farm) {
                if rule.applies_to(farm_type) {
                    violations.extend(self.evaluate_at(rule, path, Scope::Farm(farm)));
                }
            }
        }
        for (rule, path) in self.rules_for(Root::Dispatcher) {
            violations.extend(self.evaluate_at(rule, path, Scope::Dispatcher(config)));
        }
        tracing::debug!(count = violations.len(), "evaluated dispatcher rules");
        violations
    }

    /// Httpd rules run once per `<VirtualHost>` section.
    pub fn evaluate_httpd(&self, config: &HttpdConfig) -> Vec<Violation> {
        let mut violations = Vec::new();
        for vhost in config.virtual_hosts() {
            for (rule, path) in self.rules_for(Root::Httpd) {
                violations.extend(self.evaluate_at(rule, path, Scope::VirtualHost(vhost)));
            }
        }
        tracing::debug!(count = violations.len(), "evaluated httpd rules");
        violations
    }

    fn rules_for(&self, root: Root) -> impl Iterator<Item = (&Arc<AnalyzerRule>, &ElementPath)> {
        self.rules.iter().filter_map(move |loaded| {
            let path = loaded.path.as_ref().filter(|path| path.root() == root)?;
            Some((&loaded.rule, path))
        })
    }
}

fn violation(rule: &Arc<AnalyzerRule>, check: &Check, result: CheckResult, scope: Scope<'_>) -> Violation {
    let mut context = check
        .context
        .clone()
        .filter(|context| !context.is_empty())
        .unwrap_or_else(|| rule.description.clone());
    if context.is_empty() {
        context = format!("check on {} failed", rule.element);
    }
    if let Outcome::Malformed(reason) = &result.outcome {
        context = format!("{context} (malformed check: {reason})");
    }
    let source = if result.source.is_builtin() {
        scope.source().clone()
    } else {
        result.source
    };
    Violation::new(rule.clone(), context, source)
}
