//! Typed check conditions and their evaluation against a resolved element.

use std::collections::HashSet;

use dispatchlint_parser::model::{CacheRule, FilterRule};
use dispatchlint_parser::FilterType;
use dispatchlint_syntax::{Labeled, Source};
use serde::{Deserialize, Serialize};

use crate::element::{Element, Target};

/// One condition of a rule plus its inversion flag.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Check {
    #[serde(flatten)]
    pub condition: Condition,
    #[serde(default)]
    pub fail_if: bool,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "condition", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Condition {
    Equals {
        value: serde_json::Value,
    },
    NotEqual {
        value: serde_json::Value,
    },
    GreaterOrEqual {
        value: serde_json::Value,
    },
    LessOrEqual {
        value: serde_json::Value,
    },
    RuleListStartsWith {
        #[serde(rename = "ruleValue")]
        rule_value: RuleValue,
    },
    RuleListIncludes {
        #[serde(rename = "ruleValue")]
        rule_value: RuleValue,
    },
    FilterListStartsWith {
        #[serde(rename = "filterValue")]
        filter_value: FilterValue,
    },
    FilterListIncludes {
        #[serde(rename = "filterValue")]
        filter_value: FilterValue,
    },
    IsUniqueLabel,
    IncludesDirective {
        #[serde(rename = "directiveValue")]
        directive_value: String,
    },
}

/// Expected cache rule, compared on payloads only.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct RuleValue {
    #[serde(rename = "type")]
    pub rule_type: String,
    #[serde(default)]
    pub glob: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Expected filter rule, compared on payloads only.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct FilterValue {
    #[serde(rename = "type")]
    pub rule_type: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub selectors: Option<String>,
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(default)]
    pub suffix: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub glob: Option<String>,
}

impl RuleValue {
    fn matches(&self, rule: &CacheRule) -> bool {
        type_matches(&self.rule_type, *rule.rule_type.payload())
            && self.glob.as_deref() == text(&rule.glob)
            && self.url.as_deref() == text(&rule.url)
    }
}

impl FilterValue {
    fn matches(&self, rule: &FilterRule) -> bool {
        let expected = [
            self.url.as_deref(),
            self.method.as_deref(),
            self.path.as_deref(),
            self.selectors.as_deref(),
            self.extension.as_deref(),
            self.suffix.as_deref(),
            self.query.as_deref(),
            self.protocol.as_deref(),
            self.glob.as_deref(),
        ];
        type_matches(&self.rule_type, *rule.rule_type.payload()) && expected == rule.criteria()
    }
}

fn type_matches(expected: &str, actual: FilterType) -> bool {
    FilterType::parse(expected) == Some(actual)
}

fn text(field: &Option<dispatchlint_syntax::Value<String>>) -> Option<&str> {
    field.as_ref().map(|value| value.payload().as_str())
}

/// Raw result of a condition before `failIf` is applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Satisfied,
    Unsatisfied,
    /// The comparison literal or the target type made the check meaningless.
    Malformed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckResult {
    pub outcome: Outcome,
    /// Where a violation raised by this result points.
    pub source: Source,
}

impl Check {
    pub fn evaluate(&self, target: &Target<'_>) -> CheckResult {
        let mut source = target.source.clone();
        let outcome = match &self.condition {
            Condition::Equals { value } => equals(&target.element, value),
            Condition::NotEqual { value } => match equals(&target.element, value) {
                Outcome::Satisfied => Outcome::Unsatisfied,
                Outcome::Unsatisfied => Outcome::Satisfied,
                malformed => malformed,
            },
            Condition::GreaterOrEqual { value } => compare(&target.element, value, |a, b| a >= b),
            Condition::LessOrEqual { value } => compare(&target.element, value, |a, b| a <= b),
            Condition::RuleListStartsWith { rule_value } => match &target.element {
                Element::Rules(rules) => {
                    outcome_of(rules.first().is_some_and(|rule| rule_value.matches(rule.value.payload())))
                }
                other => wrong_type("a cache rule list", other),
            },
            Condition::RuleListIncludes { rule_value } => match &target.element {
                Element::Rules(rules) => {
                    outcome_of(rules.iter().any(|rule| rule_value.matches(rule.value.payload())))
                }
                other => wrong_type("a cache rule list", other),
            },
            Condition::FilterListStartsWith { filter_value } => match &target.element {
                Element::Filters(filters) => outcome_of(
                    filters
                        .first()
                        .is_some_and(|rule| filter_value.matches(rule.value.payload())),
                ),
                other => wrong_type("a filter list", other),
            },
            Condition::FilterListIncludes { filter_value } => match &target.element {
                Element::Filters(filters) => {
                    outcome_of(filters.iter().any(|rule| filter_value.matches(rule.value.payload())))
                }
                other => wrong_type("a filter list", other),
            },
            Condition::IsUniqueLabel => match labels(&target.element) {
                Some(labels) => match last_duplicate(labels) {
                    Some(duplicate) => {
                        source = duplicate.clone();
                        Outcome::Unsatisfied
                    }
                    None => Outcome::Satisfied,
                },
                None => wrong_type("a labeled list", &target.element),
            },
            Condition::IncludesDirective { directive_value } => match &target.element {
                Element::Directives(directives) => {
                    let (name, args) = match directive_value.trim().split_once(char::is_whitespace) {
                        Some((name, args)) => (name, Some(args.trim())),
                        None => (directive_value.trim(), None),
                    };
                    outcome_of(directives.iter().any(|directive| {
                        directive.is(name)
                            && args.map_or(true, |args| directive.arguments().eq_ignore_ascii_case(args))
                    }))
                }
                other => wrong_type("a directive block", other),
            },
        };
        CheckResult { outcome, source }
    }

    /// Apply `failIf`; malformed checks never pass.
    pub fn passes(&self, result: &CheckResult) -> bool {
        match result.outcome {
            Outcome::Satisfied => !self.fail_if,
            Outcome::Unsatisfied => self.fail_if,
            Outcome::Malformed(_) => false,
        }
    }
}

fn outcome_of(satisfied: bool) -> Outcome {
    if satisfied {
        Outcome::Satisfied
    } else {
        Outcome::Unsatisfied
    }
}

fn wrong_type(expected: &str, found: &Element<'_>) -> Outcome {
    Outcome::Malformed(format!("expected {expected}, found {}", found.kind()))
}

/// Text of a JSON literal: strings as-is, numbers and booleans printed.
fn literal(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(text) => Some(text.clone()),
        serde_json::Value::Number(number) => Some(number.to_string()),
        serde_json::Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn integer_literal(value: &serde_json::Value) -> Result<i64, Outcome> {
    let text = literal(value).ok_or_else(|| Outcome::Malformed(format!("'{value}' is not a number")))?;
    text.trim().parse::<i64>().map_err(|_| {
        tracing::warn!("malformed numeric check literal '{text}'");
        Outcome::Malformed(format!("'{text}' is not a number"))
    })
}

fn equals(element: &Element<'_>, value: &serde_json::Value) -> Outcome {
    match element {
        Element::Integer(actual) => match integer_literal(value) {
            Ok(expected) => outcome_of(*actual == expected),
            Err(malformed) => malformed,
        },
        Element::Boolean(actual) => match literal(value).as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("true" | "1") => outcome_of(*actual),
            Some("false" | "0") => outcome_of(!*actual),
            _ => Outcome::Malformed(format!("'{value}' is not a boolean")),
        },
        Element::Text(actual) => match literal(value) {
            Some(expected) => outcome_of(actual.as_ref() == expected),
            None => Outcome::Malformed(format!("'{value}' is not a text literal")),
        },
        Element::Absent => Outcome::Unsatisfied,
        other => wrong_type("a scalar value", other),
    }
}

fn compare(element: &Element<'_>, value: &serde_json::Value, op: fn(i64, i64) -> bool) -> Outcome {
    let actual = match element {
        Element::Integer(actual) => *actual,
        Element::Text(text) => match text.trim().parse::<i64>() {
            Ok(actual) => actual,
            Err(_) => {
                tracing::warn!("malformed numeric value '{text}'");
                return Outcome::Malformed(format!("'{text}' is not a number"));
            }
        },
        other => return wrong_type("a number", other),
    };
    match integer_literal(value) {
        Ok(expected) => outcome_of(op(actual, expected)),
        Err(malformed) => malformed,
    }
}

fn labels<'a>(element: &Element<'a>) -> Option<Vec<(Option<&'a str>, &'a Source)>> {
    fn collect<'a, T>(items: &'a [Labeled<T>]) -> Vec<(Option<&'a str>, &'a Source)> {
        items.iter().map(|item| (item.label(), item.source())).collect()
    }
    match element {
        Element::Filters(items) => Some(collect(*items)),
        Element::Rules(items) => Some(collect(*items)),
        Element::Renders(items) => Some(collect(*items)),
        Element::Farms(items) => Some(collect(*items)),
        _ => None,
    }
}

/// Source of the last repeated label, if any label repeats.
fn last_duplicate<'a>(labels: Vec<(Option<&'a str>, &'a Source)>) -> Option<&'a Source> {
    let mut seen = HashSet::new();
    let mut duplicate = None;
    for (label, source) in labels {
        let Some(label) = label else {
            continue;
        };
        if !seen.insert(label) {
            duplicate = Some(source);
        }
    }
    duplicate
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatchlint_syntax::Value;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn target(element: Element<'_>) -> Target<'_> {
        Target {
            element,
            source: Source::new("farm.any", 7, None),
        }
    }

    fn check(condition: Condition, fail_if: bool) -> Check {
        Check {
            condition,
            fail_if,
            context: None,
        }
    }

    #[test]
    fn deserialises_tagged_conditions() {
        let parsed: Vec<Check> = serde_json::from_value(json!([
            { "condition": "EQUALS", "value": 2 },
            { "condition": "IS_UNIQUE_LABEL", "failIf": true },
            { "condition": "RULE_LIST_STARTS_WITH", "ruleValue": { "type": "deny", "glob": "*" } },
            { "condition": "INCLUDES_DIRECTIVE", "directiveValue": "Header", "context": "headers" }
        ]))
        .expect("checks deserialise");

        assert_eq!(parsed[0].condition, Condition::Equals { value: json!(2) });
        assert!(parsed[1].fail_if);
        assert_eq!(
            parsed[2].condition,
            Condition::RuleListStartsWith {
                rule_value: RuleValue {
                    rule_type: "deny".into(),
                    glob: Some("*".into()),
                    url: None,
                }
            }
        );
        assert_eq!(parsed[3].context.as_deref(), Some("headers"));
    }

    #[test]
    fn numeric_checks_compare_integers() {
        let ge = check(Condition::GreaterOrEqual { value: json!("2") }, false);
        assert_eq!(ge.evaluate(&target(Element::Integer(3))).outcome, Outcome::Satisfied);
        assert_eq!(ge.evaluate(&target(Element::Integer(1))).outcome, Outcome::Unsatisfied);

        let le = check(Condition::LessOrEqual { value: json!(600000) }, false);
        assert_eq!(le.evaluate(&target(Element::Integer(600000))).outcome, Outcome::Satisfied);
    }

    #[test]
    fn malformed_literals_fail_closed_even_with_fail_if() {
        for fail_if in [false, true] {
            let check = check(Condition::GreaterOrEqual { value: json!("two") }, fail_if);
            let result = check.evaluate(&target(Element::Integer(3)));
            assert!(matches!(result.outcome, Outcome::Malformed(_)));
            assert!(!check.passes(&result));
        }
    }

    #[test]
    fn fail_if_inverts_the_outcome() {
        let equals = check(Condition::Equals { value: json!(true) }, true);
        let result = equals.evaluate(&target(Element::Boolean(true)));
        assert_eq!(result.outcome, Outcome::Satisfied);
        assert!(!equals.passes(&result));

        let not_equal = check(Condition::NotEqual { value: json!("/var/www") }, false);
        let result = not_equal.evaluate(&target(Element::Text("/srv".into())));
        assert!(not_equal.passes(&result));
    }

    #[test]
    fn wrong_target_type_is_malformed() {
        let check = check(Condition::FilterListIncludes { filter_value: FilterValue::default() }, false);
        let result = check.evaluate(&target(Element::Integer(1)));
        assert_eq!(
            result.outcome,
            Outcome::Malformed("expected a filter list, found an integer".into())
        );
    }

    #[test]
    fn unique_label_reports_the_last_duplicate_only() {
        let item = |label: &str, line: usize| {
            Labeled::new(
                Some(label.to_string()),
                Value::new(CacheRule::default(), Source::new("farm.any", line, None)),
            )
        };
        let rules = vec![item("a", 1), item("b", 2), item("a", 3), item("b", 4), item("a", 5)];
        let check = check(Condition::IsUniqueLabel, false);

        let result = check.evaluate(&target(Element::Rules(&rules)));
        assert_eq!(result.outcome, Outcome::Unsatisfied);
        assert_eq!(result.source.line, 5);

        let unique = vec![item("a", 1), item("b", 2)];
        assert_eq!(
            check.evaluate(&target(Element::Rules(&unique))).outcome,
            Outcome::Satisfied
        );
    }

    #[test]
    fn rule_lists_match_on_payload() {
        let deny_all = Labeled::new(
            Some("0000".into()),
            Value::new(
                CacheRule {
                    rule_type: Value::new(FilterType::Deny, Source::new("farm.any", 3, None)),
                    glob: Some(Value::new("*".into(), Source::new("farm.any", 3, None))),
                    url: None,
                },
                Source::new("farm.any", 3, None),
            ),
        );
        let rules = vec![deny_all];
        let starts_with = check(
            Condition::RuleListStartsWith {
                rule_value: RuleValue {
                    rule_type: "DENY".into(),
                    glob: Some("*".into()),
                    url: None,
                },
            },
            false,
        );
        assert_eq!(
            starts_with.evaluate(&target(Element::Rules(&rules))).outcome,
            Outcome::Satisfied
        );

        let empty: Vec<Labeled<CacheRule>> = Vec::new();
        assert_eq!(
            starts_with.evaluate(&target(Element::Rules(&empty))).outcome,
            Outcome::Unsatisfied
        );
    }
}
