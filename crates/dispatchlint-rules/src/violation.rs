use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;

use dispatchlint_config::Severity;
use dispatchlint_syntax::Source;

use crate::AnalyzerRule;

/// A rule that did not hold at `source`.
///
/// Two violations are the same when they share the rule id and the
/// (file, line) fingerprint. Neither `context` nor the severity takes part
/// in equality or hashing.
#[derive(Clone, Debug)]
pub struct Violation {
    pub rule: Arc<AnalyzerRule>,
    pub context: String,
    pub source: Source,
}

impl Violation {
    pub fn new(rule: Arc<AnalyzerRule>, context: impl Into<String>, source: Source) -> Self {
        Violation {
            rule,
            context: context.into(),
            source,
        }
    }

    pub fn rule_id(&self) -> &str {
        &self.rule.id
    }

    pub fn severity(&self) -> Severity {
        self.rule.severity
    }

    fn identity(&self) -> (&str, &Path, usize) {
        let (file, line) = self.source.fingerprint();
        (self.rule_id(), file, line)
    }

    /// Report order: most severe first, then rule id, file and line.
    pub fn report_order(&self, other: &Self) -> Ordering {
        self.severity()
            .cmp(&other.severity())
            .then_with(|| self.identity().cmp(&other.identity()))
    }
}

impl PartialEq for Violation {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for Violation {}

impl Hash for Violation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} ({})",
            self.severity(),
            self.rule_id(),
            self.context,
            self.source
        )
    }
}

/// A violation kept by the reducer, with the number of violations of the
/// same rule it stands for when rules were collapsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CountedViolation {
    pub violation: Violation,
    pub count: Option<usize>,
}

impl CountedViolation {
    pub fn uncounted(violation: Violation) -> Self {
        CountedViolation {
            violation,
            count: None,
        }
    }
}

impl fmt::Display for CountedViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.violation.fmt(f)?;
        match self.count {
            Some(count) if count > 1 => write!(f, " and {} more", count - 1),
            _ => Ok(()),
        }
    }
}
