use std::collections::{HashMap, HashSet};

use dispatchlint_config::Verbosity;

use crate::{CountedViolation, Violation};

/// Sort and drop duplicates, keeping the most severe of each; with
/// `collapse_by_rule`, keep only the first violation of every rule id and
/// count the ones it stands for.
pub fn reduce(mut violations: Vec<Violation>, collapse_by_rule: bool) -> Vec<CountedViolation> {
    violations.sort_by(Violation::report_order);
    let mut seen = HashSet::new();
    violations.retain(|violation| seen.insert(violation.clone()));

    if !collapse_by_rule {
        return violations.into_iter().map(CountedViolation::uncounted).collect();
    }

    let mut kept: Vec<CountedViolation> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for violation in violations {
        match positions.get(violation.rule_id()) {
            Some(&position) => {
                if let Some(count) = kept[position].count.as_mut() {
                    *count += 1;
                }
            }
            None => {
                positions.insert(violation.rule_id().to_string(), kept.len());
                kept.push(CountedViolation {
                    violation,
                    count: Some(1),
                });
            }
        }
    }
    kept
}

pub fn apply_verbosity(violations: Vec<Violation>, verbosity: Verbosity) -> Vec<CountedViolation> {
    match verbosity {
        Verbosity::Full => violations.into_iter().map(CountedViolation::uncounted).collect(),
        Verbosity::Partial => reduce(violations, false),
        Verbosity::Minimized => reduce(violations, true),
    }
}
