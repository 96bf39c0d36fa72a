//! Declarative rules evaluated against parsed dispatcher and httpd trees.
//!
//! Rules arrive as JSON ([`RuleSet`]), name an element path such as
//! `farm.cache.statfileslevel` and carry typed [`Check`]s. The [`RuleEngine`]
//! turns failing checks into [`Violation`]s; [`reduce`] sorts, deduplicates
//! and optionally collapses them per rule.

mod check;
mod element;
mod engine;
mod reduce;
mod rule;
mod violation;

pub use check::{Check, CheckResult, Condition, FilterValue, Outcome, RuleValue};
pub use element::{Element, ElementPath, Root, Scope, Target};
pub use engine::RuleEngine;
pub use reduce::{apply_verbosity, reduce};
pub use rule::{AnalyzerRule, RuleLoadError, RuleSet};
pub use violation::{CountedViolation, Violation};
