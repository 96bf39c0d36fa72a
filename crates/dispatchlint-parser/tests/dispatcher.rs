use std::path::Path;

use dispatchlint_config::{Severity, DEFAULT_MAX_INCLUDE_DEPTH};
use dispatchlint_parser::{
    build_from_lines, parse_dispatcher, FarmType, FilterType, ParseError, ParseSession,
};
use dispatchlint_syntax::{lines_from_str, normalize_lines, Dialect, Diagnostics, NormalizeOptions};
use dispatchlint_test_support::{init_tracing, limited_config, test_config, Fixture};
use pretty_assertions::assert_eq;

fn build(contents: &str) -> (dispatchlint_parser::DispatcherConfig, Diagnostics) {
    let mut diagnostics = Diagnostics::new();
    let lines = normalize_lines(
        Path::new("dispatcher.any"),
        None,
        &lines_from_str(contents),
        NormalizeOptions::new(Dialect::Dispatcher),
        &mut diagnostics,
    );
    let config = build_from_lines(lines, &mut diagnostics);
    (config, diagnostics)
}

const PUBLISH_FARM: &str = r#"/publishfarm {
  /clientheaders { "referer" "user-agent" }
  /virtualhosts { "*" }
  /renders {
    /rend01 { /hostname "127.0.0.1" /port "4503" }
  }
  /filter {
    /0001 { /type "deny" /glob "*" }
    /0002 { /type "allow" /url "/content/*" /extension '(html|json)' }
  }
  /cache {
    /docroot "${DOCROOT}"
    /statfileslevel "2"
    /rules {
      /0000 { /glob "*" /type "allow" }
    }
  }
}
"#;

#[test]
fn parses_farms_through_glob_includes() {
    init_tracing();
    let fixture = Fixture::new();
    let entry = fixture.write(
        "conf.dispatcher.d/dispatcher.any",
        "/name \"internet-server\"\n/farms {\n  $include \"enabled_farms/*.farm\"\n}\n",
    );
    let farm_file = fixture.write("conf.dispatcher.d/enabled_farms/publish.farm", PUBLISH_FARM);

    let mut config = test_config();
    config.environment.inherit_process = false;
    config
        .environment
        .variables
        .insert("DOCROOT".into(), "/mnt/var/www/html".into());
    let mut session = ParseSession::new(&config);
    let dispatcher = parse_dispatcher(&mut session, &entry).expect("parse dispatcher");

    assert_eq!(
        dispatcher.name.as_ref().map(|name| name.payload().as_str()),
        Some("internet-server")
    );
    let farms: Vec<_> = dispatcher.farms().collect();
    assert_eq!(farms.len(), 1);
    let (farm, farm_type) = farms[0];
    assert_eq!(farm.label(), Some("publishfarm"));
    assert_eq!(farm_type, FarmType::Publish);

    let farm = farm.value.payload();
    assert_eq!(
        farm.client_headers.payload(),
        &vec!["referer".to_string(), "user-agent".to_string()]
    );
    let render = &farm.renders.payload()[0];
    assert_eq!(render.label(), Some("rend01"));
    assert_eq!(*render.value.payload().port.payload(), 4503);
    assert_eq!(render.value.payload().hostname.payload(), "127.0.0.1");

    let filters = farm.filter.payload();
    assert_eq!(filters.len(), 2);
    assert_eq!(*filters[0].value.payload().rule_type.payload(), FilterType::Deny);
    let allow = filters[1].value.payload();
    assert_eq!(*allow.rule_type.payload(), FilterType::Allow);
    assert_eq!(allow.url.as_ref().map(|url| url.payload().as_str()), Some("/content/*"));
    assert_eq!(
        allow.extension.as_ref().map(|ext| ext.payload().as_str()),
        Some("(html|json)")
    );

    let cache = farm.cache.payload();
    assert_eq!(cache.docroot.payload(), "/mnt/var/www/html");
    assert_eq!(*cache.statfileslevel.payload(), 2);
    assert_eq!(cache.rules.payload().len(), 1);

    let origin = cache.docroot.source();
    assert_eq!(origin.file, farm_file);
    assert_eq!(origin.line, 12);
    assert_eq!(origin.included_from.as_deref(), Some(entry.as_path()));

    assert!(session.diagnostics().is_empty());
    assert_eq!(session.files_parsed(), 2);
    assert_eq!(session.includes_followed(), 1);
}

#[test]
fn omitted_fields_take_the_farm_opening_source() {
    let (config, _) = build("/farms {\n  /publish {\n    /virtualhosts { \"*\" }\n  }\n}\n");
    let farm = &config.farms.payload()[0].value;
    let retry_delay = &farm.payload().retry_delay;

    assert_eq!(*retry_delay.payload(), 1);
    assert_eq!(retry_delay.source(), farm.source());
    assert_eq!(retry_delay.source().line, 2);
    assert!(!retry_delay.is_explicit());
    assert_eq!(*farm.payload().number_of_retries.payload(), 5);
    assert_eq!(*farm.payload().cache.payload().statfileslevel.payload(), 0);
}

#[test]
fn unknown_block_inside_cache_is_reported_once_and_skipped() {
    let (config, diagnostics) = build(
        r#"/farms {
  /publish {
    /cache {
      /foo { /bar "x" /nested { "y" } }
      /docroot "/srv/www"
    }
  }
}
"#,
    );
    let recorded: Vec<_> = diagnostics.iter().collect();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].severity, Severity::Minor);
    assert!(recorded[0].message.contains("/foo"));
    assert_eq!(recorded[0].source.line, 4);

    let cache = config.farms.payload()[0].value.payload().cache.payload();
    assert_eq!(cache.docroot.payload(), "/srv/www");
}

#[test]
fn farm_without_opening_brace_defaults() {
    let (config, diagnostics) = build("/farms {\n  /broken \"oops\"\n}\n");
    let farms = config.farms.payload();
    assert_eq!(farms.len(), 1);
    assert_eq!(*farms[0].value.payload().retry_delay.payload(), 1);
    assert_eq!(farms[0].source(), config.farms.source());
    assert!(diagnostics.iter().any(|d| d.message.contains("expected '{' to open farm")));
}

#[test]
fn unlabeled_entries_produce_an_info_note() {
    let (config, diagnostics) = build("/farms {\n  { /virtualhosts { \"a\" } }\n}\n");
    let farm = &config.farms.payload()[0];
    assert_eq!(farm.label(), None);
    assert_eq!(
        farm.value.payload().virtual_hosts.payload(),
        &vec!["a".to_string()]
    );
    let severities: Vec<_> = diagnostics.iter().map(|d| d.severity).collect();
    assert_eq!(severities, vec![Severity::Info]);
}

#[test]
fn author_labels_mark_author_farms() {
    let (config, _) = build("/farms {\n  /author-farm { }\n  /publish { }\n}\n");
    let types: Vec<_> = config.farms().map(|(_, farm_type)| farm_type).collect();
    assert_eq!(types, vec![FarmType::Author, FarmType::Publish]);
}

#[test]
fn bad_integer_falls_back_to_the_default() {
    let (config, diagnostics) = build("/farms {\n  /p { /numberOfRetries \"many\" }\n}\n");
    let farm = config.farms.payload()[0].value.payload();
    assert_eq!(*farm.number_of_retries.payload(), 5);
    assert_eq!(farm.number_of_retries.source().line, 2);
    let recorded: Vec<_> = diagnostics.iter().collect();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].severity, Severity::Major);
}

#[test]
fn self_include_hits_the_include_ceiling() {
    let fixture = Fixture::new();
    let entry = fixture.write("conf.dispatcher.d/loop.any", "$include \"loop.any\"\n");

    let mut session = ParseSession::new(&limited_config(5, 10_000));
    let err = parse_dispatcher(&mut session, &entry).expect_err("depth ceiling");
    match err {
        ParseError::IncludeDepthExceeded { max, .. } => assert_eq!(max, 5),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(session.includes_followed(), 6);
}

#[test]
fn self_include_at_the_default_ceiling_is_an_error() {
    let fixture = Fixture::new();
    let entry = fixture.write("conf.dispatcher.d/d/loop.any", "$include \"loop.any\"\n");

    let mut session = ParseSession::new(&test_config());
    let err = parse_dispatcher(&mut session, &entry).expect_err("depth ceiling");
    assert!(
        matches!(err, ParseError::IncludeDepthExceeded { max: DEFAULT_MAX_INCLUDE_DEPTH, .. }),
        "{err}"
    );
    assert_eq!(session.includes_followed(), DEFAULT_MAX_INCLUDE_DEPTH + 1);
}

#[test]
fn line_ceiling_aborts_the_parse() {
    let fixture = Fixture::new();
    let entry = fixture.write(
        "dispatcher.any",
        "/name \"a\"\n$include \"farm.any\"\n",
    );
    fixture.write("farm.any", "/farms {\n  /a { }\n  /b { }\n}\n");

    let mut session = ParseSession::new(&limited_config(10, 4));
    let err = parse_dispatcher(&mut session, &entry).expect_err("line ceiling");
    assert!(matches!(err, ParseError::LineLimitExceeded { max: 4, .. }), "{err}");
}

#[test]
fn missing_plain_include_is_fatal_but_missing_glob_is_not() {
    let fixture = Fixture::new();
    let plain = fixture.write("plain/dispatcher.any", "$include \"nowhere/farm.any\"\n");
    let glob = fixture.write("glob/dispatcher.any", "/name \"g\"\n$include \"nowhere/*.farm\"\n");

    let mut session = ParseSession::new(&test_config());
    let err = parse_dispatcher(&mut session, &plain).expect_err("missing include");
    match err {
        ParseError::IncludeNotFound { include, location } => {
            assert_eq!(include, "nowhere/farm.any");
            assert_eq!(location.line, 1);
        }
        other => panic!("unexpected error: {other}"),
    }

    let mut session = ParseSession::new(&test_config());
    let config = parse_dispatcher(&mut session, &glob).expect("glob include may match nothing");
    assert_eq!(config.name.map(|name| name.into_payload()).as_deref(), Some("g"));
}

#[test]
fn unreadable_entry_is_an_io_error() {
    let fixture = Fixture::new();
    let mut session = ParseSession::new(&test_config());
    let err = parse_dispatcher(&mut session, &fixture.path("absent.any")).expect_err("io");
    assert!(matches!(err, ParseError::Io { .. }));
}
