use std::fs;
use std::path::{Path, PathBuf};

use dispatchlint_config::Severity;
use dispatchlint_parser::FarmType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::check::Check;

/// A declarative rule: which element to inspect and the checks it must pass.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzerRule {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub severity: Severity,
    pub element: String,
    #[serde(default)]
    pub checks: Vec<Check>,
    #[serde(default)]
    pub farm_type_applicability: Vec<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub effort: Option<String>,
}

fn enabled_by_default() -> bool {
    true
}

impl AnalyzerRule {
    /// An empty applicability list applies to every farm.
    pub fn applies_to(&self, farm_type: FarmType) -> bool {
        self.farm_type_applicability.is_empty()
            || self
                .farm_type_applicability
                .iter()
                .any(|kind| kind.eq_ignore_ascii_case(farm_type.as_str()))
    }
}

#[derive(Debug, Error)]
pub enum RuleLoadError {
    #[error("failed to read rules from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid rule definitions: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("invalid rule definitions in {path}: {source}")]
    ParseFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A list of rules deserialised from a JSON array.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RuleSet {
    rules: Vec<AnalyzerRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<AnalyzerRule>) -> Self {
        RuleSet { rules }
    }

    pub fn from_json_str(contents: &str) -> Result<Self, RuleLoadError> {
        serde_json::from_str(contents)
            .map(RuleSet::new)
            .map_err(RuleLoadError::Parse)
    }

    pub fn from_path(path: &Path) -> Result<Self, RuleLoadError> {
        let contents = fs::read_to_string(path).map_err(|source| RuleLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let rules = serde_json::from_str(&contents).map_err(|source| RuleLoadError::ParseFile {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded rule definitions");
        Ok(RuleSet::new(rules))
    }

    pub fn rules(&self) -> &[AnalyzerRule] {
        &self.rules
    }

    pub fn into_rules(self) -> Vec<AnalyzerRule> {
        self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Append `other`; a rule with an id already present replaces the
    /// earlier definition in place.
    pub fn merge(&mut self, other: RuleSet) {
        for rule in other.rules {
            match self.rules.iter_mut().find(|existing| existing.id == rule.id) {
                Some(existing) => *existing = rule,
                None => self.rules.push(rule),
            }
        }
    }
}
