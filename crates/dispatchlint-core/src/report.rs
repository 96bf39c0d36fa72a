use std::collections::BTreeMap;

use dispatchlint_config::Severity;
use dispatchlint_parser::{DispatcherConfig, HttpdConfig};
use dispatchlint_rules::CountedViolation;

/// Everything one analysis run produced. Either tree is `None` when its
/// entry file does not exist.
#[derive(Clone, Debug, Default)]
pub struct AnalysisReport {
    pub dispatcher: Option<DispatcherConfig>,
    pub httpd: Option<HttpdConfig>,
    pub violations: Vec<CountedViolation>,
    pub files_parsed: usize,
    pub lines_parsed: usize,
}

impl AnalysisReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Number of reported violations per severity, counting collapsed
    /// entries once per violation they stand for.
    pub fn severity_counts(&self) -> BTreeMap<Severity, usize> {
        let mut counts = BTreeMap::new();
        for kept in &self.violations {
            *counts.entry(kept.violation.severity()).or_insert(0) += kept.count.unwrap_or(1);
        }
        counts
    }

    pub fn worst_severity(&self) -> Option<Severity> {
        self.violations.iter().map(|kept| kept.violation.severity()).min()
    }
}
