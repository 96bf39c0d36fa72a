use std::path::Path;

use dispatchlint_config::{AnalysisSettings, CheckMode, Severity};
use dispatchlint_parser::{build_from_lines, parse_httpd, DispatcherConfig, ParseSession};
use dispatchlint_rules::{reduce, RuleEngine, RuleLoadError, RuleSet, Scope, Violation};
use dispatchlint_syntax::{lines_from_str, normalize_lines, Diagnostics, Dialect, NormalizeOptions};
use dispatchlint_test_support::{test_config, Fixture};
use pretty_assertions::assert_eq;

fn dispatcher(contents: &str) -> DispatcherConfig {
    let mut diagnostics = Diagnostics::new();
    let lines = normalize_lines(
        Path::new("dispatcher.any"),
        None,
        &lines_from_str(contents),
        NormalizeOptions::new(Dialect::Dispatcher),
        &mut diagnostics,
    );
    build_from_lines(lines, &mut diagnostics)
}

fn summary(violations: &[Violation]) -> Vec<(String, usize)> {
    let mut summary: Vec<_> = violations
        .iter()
        .map(|violation| (violation.rule_id().to_string(), violation.source.line))
        .collect();
    summary.sort();
    summary
}

const FARMS: &str = r#"/farms {
  /publish {
    /filter {
      /0001 { /type "allow" /url "/content/*" }
      /0002 { /type "deny" /glob "*" }
    }
    /cache { /statfileslevel "1" }
  }
  /author { /cache { /allowAuthorized "0" } }
  /publish { }
}
"#;

const RULES: &str = r#"[
  {
    "id": "statfileslevel-min",
    "description": "statfileslevel should be at least 2",
    "severity": "MAJOR",
    "element": "farm.cache.statfileslevel",
    "checks": [{ "condition": "GREATER_OR_EQUAL", "value": 2 }]
  },
  {
    "id": "deny-first",
    "severity": "BLOCKER",
    "element": "farm.filter",
    "checks": [{ "condition": "FILTER_LIST_STARTS_WITH", "filterValue": { "type": "DENY", "glob": "*" } }],
    "tags": ["security"],
    "effort": "5min"
  },
  {
    "id": "author-allow-authorized",
    "severity": "MINOR",
    "element": "farm.cache.allowAuthorized",
    "farmTypeApplicability": ["AUTHOR"],
    "checks": [{ "condition": "EQUALS", "value": true, "context": "author caches should allow authorized requests" }]
  },
  {
    "id": "unique-farms",
    "severity": "MAJOR",
    "element": "dispatcher.farms",
    "checks": [{ "condition": "IS_UNIQUE_LABEL" }]
  }
]"#;

#[test]
fn json_rules_evaluate_per_farm() {
    let config = dispatcher(FARMS);
    let rules = RuleSet::from_json_str(RULES).expect("rules parse");
    assert_eq!(rules.len(), 4);
    assert_eq!(rules.rules()[1].tags, vec!["security".to_string()]);

    let engine = RuleEngine::new(rules, &AnalysisSettings::default());
    let violations = engine.evaluate_dispatcher(&config);
    assert_eq!(violations.len(), 8);

    let authored: Vec<_> = violations
        .iter()
        .filter(|violation| violation.rule_id() == "author-allow-authorized")
        .collect();
    assert_eq!(authored.len(), 1);
    assert_eq!(authored[0].source.line, 9);
    assert_eq!(authored[0].context, "author caches should allow authorized requests");

    let duplicates: Vec<_> = violations
        .iter()
        .filter(|violation| violation.rule_id() == "unique-farms")
        .collect();
    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates[0].source.line, 10);

    let statfiles = violations
        .iter()
        .find(|violation| violation.rule_id() == "statfileslevel-min" && violation.source.line == 7);
    assert_eq!(
        statfiles.map(|violation| violation.context.as_str()),
        Some("statfileslevel should be at least 2")
    );

    let collapsed: Vec<_> = reduce(violations, true)
        .into_iter()
        .map(|kept| (kept.violation.rule_id().to_string(), kept.count))
        .collect();
    assert_eq!(
        collapsed,
        vec![
            ("deny-first".to_string(), Some(3)),
            ("statfileslevel-min".to_string(), Some(3)),
            ("unique-farms".to_string(), Some(1)),
            ("author-allow-authorized".to_string(), Some(1)),
        ]
    );
}

#[test]
fn a_single_rule_runs_against_one_farm() {
    let config = dispatcher(FARMS);
    let engine = RuleEngine::new(RuleSet::from_json_str(RULES).expect("rules parse"), &AnalysisSettings::default());
    let rule = engine
        .rules()
        .find(|rule| rule.id == "statfileslevel-min")
        .expect("loaded rule");
    let (publish, _) = config.farms().next().expect("first farm");

    let violations = engine.evaluate(rule, Scope::Farm(publish));
    assert_eq!(summary(&violations), vec![("statfileslevel-min".to_string(), 7)]);
}

const RETRY_RULES: &str = r#"[
  {
    "id": "retry-window",
    "severity": "MINOR",
    "element": "farm.retryDelay",
    "checks": [
      { "condition": "GREATER_OR_EQUAL", "value": 5, "context": "too short" },
      { "condition": "LESS_OR_EQUAL", "value": 3, "context": "small enough" }
    ]
  },
  {
    "id": "retry-never",
    "severity": "MINOR",
    "element": "farm.numberOfRetries",
    "checks": [
      { "condition": "EQUALS", "value": 0 },
      { "condition": "LESS_OR_EQUAL", "value": 1 }
    ]
  }
]"#;

#[test]
fn check_mode_decides_how_checks_combine() {
    let config = dispatcher("/farms {\n  /publish { /retryDelay \"1\" }\n}\n");
    let rules = RuleSet::from_json_str(RETRY_RULES).expect("rules parse");

    let engine = |mode| RuleEngine::new(rules.clone(), &AnalysisSettings::default()).with_check_mode(mode);

    let all = engine(CheckMode::All).evaluate_dispatcher(&config);
    assert_eq!(
        summary(&all),
        vec![
            ("retry-never".to_string(), 2),
            ("retry-never".to_string(), 2),
            ("retry-window".to_string(), 2),
        ]
    );
    assert_eq!(all.iter().filter(|v| v.context == "too short").count(), 1);

    let first = engine(CheckMode::FirstFailure).evaluate_dispatcher(&config);
    assert_eq!(
        summary(&first),
        vec![("retry-never".to_string(), 2), ("retry-window".to_string(), 2)]
    );

    let any = engine(CheckMode::Any).evaluate_dispatcher(&config);
    assert_eq!(summary(&any), vec![("retry-never".to_string(), 2)]);
}

#[test]
fn settings_disable_rules_and_override_severity() {
    let config = dispatcher(FARMS);
    let mut settings = AnalysisSettings::default();
    settings.disabled_rules.push("deny-first".into());
    settings.severity.insert("unique-farms".into(), Severity::Blocker);

    let engine = RuleEngine::new(RuleSet::from_json_str(RULES).expect("rules parse"), &settings);
    assert_eq!(engine.rules().len(), 3);

    let violations = engine.evaluate_dispatcher(&config);
    assert!(violations.iter().all(|violation| violation.rule_id() != "deny-first"));
    let unique = violations
        .iter()
        .find(|violation| violation.rule_id() == "unique-farms")
        .expect("duplicate farm label");
    assert_eq!(unique.severity(), Severity::Blocker);
}

#[test]
fn rules_with_unknown_elements_never_fire() {
    let config = dispatcher(FARMS);
    let rules = RuleSet::from_json_str(
        r#"[{ "id": "nowhere", "severity": "INFO", "element": "farm.cache.nothing.here",
              "checks": [{ "condition": "EQUALS", "value": 1 }] },
            { "id": "off", "severity": "INFO", "element": "farm.retryDelay", "enabled": false,
              "checks": [{ "condition": "EQUALS", "value": 99 }] }]"#,
    )
    .expect("rules parse");
    let engine = RuleEngine::new(rules, &AnalysisSettings::default());
    assert_eq!(engine.rules().len(), 1);
    assert!(engine.evaluate_dispatcher(&config).is_empty());
}

#[test]
fn httpd_rules_run_per_virtual_host() {
    let fixture = Fixture::new();
    let entry = fixture.write(
        "conf/httpd.conf",
        r#"<VirtualHost *:80>
  ServerName publish
  Header always set X-Frame-Options "SAMEORIGIN"
</VirtualHost>
<VirtualHost *:8080>
  ServerName author
</VirtualHost>
"#,
    );
    let mut session = ParseSession::new(&test_config());
    let httpd = parse_httpd(&mut session, &entry).expect("parse httpd");

    let rules = RuleSet::from_json_str(
        r#"[{ "id": "frame-options", "severity": "MAJOR", "element": "httpd.vhost",
              "checks": [{ "condition": "INCLUDES_DIRECTIVE", "directiveValue": "header" }] },
            { "id": "no-author-vhost", "severity": "MINOR", "element": "httpd.vhost.ServerName",
              "checks": [{ "condition": "EQUALS", "value": "author", "failIf": true }] }]"#,
    )
    .expect("rules parse");
    let engine = RuleEngine::new(rules, &AnalysisSettings::default());
    let violations = engine.evaluate_httpd(&httpd);
    assert_eq!(
        summary(&violations),
        vec![("frame-options".to_string(), 5), ("no-author-vhost".to_string(), 6)]
    );
}

#[test]
fn malformed_rule_files_are_errors() {
    let fixture = Fixture::new();
    let path = fixture.write("rules.json", "[{ \"id\": \"x\" }]");
    let err = RuleSet::from_path(&path).expect_err("missing fields");
    assert!(matches!(err, RuleLoadError::ParseFile { .. }), "{err}");

    let err = RuleSet::from_path(&fixture.path("absent.json")).expect_err("missing file");
    assert!(matches!(err, RuleLoadError::Io { .. }));

    let unknown = RuleSet::from_json_str(
        r#"[{ "id": "x", "severity": "MAJOR", "element": "farm.info", "checks": [{ "condition": "MATCHES_REGEX" }] }]"#,
    );
    assert!(matches!(unknown, Err(RuleLoadError::Parse(_))));
}

#[test]
fn merge_replaces_rules_by_id() {
    let mut base = RuleSet::from_json_str(RETRY_RULES).expect("rules parse");
    let overrides = RuleSet::from_json_str(
        r#"[{ "id": "retry-never", "severity": "BLOCKER", "element": "farm.numberOfRetries" },
            { "id": "extra", "severity": "INFO", "element": "farm.info" }]"#,
    )
    .expect("rules parse");
    base.merge(overrides);

    let ids: Vec<_> = base.rules().iter().map(|rule| (rule.id.as_str(), rule.severity)).collect();
    assert_eq!(
        ids,
        vec![
            ("retry-window", Severity::Minor),
            ("retry-never", Severity::Blocker),
            ("extra", Severity::Info),
        ]
    );
}
