//! Recursive-descent tree builder for the dispatcher dialect.
//!
//! Malformed blocks never abort the build: a missing `{` yields the default
//! instance, unknown fields are recorded and skipped, and every field left at
//! its default takes the source of the block it belongs to.

use dispatchlint_config::Severity;
use dispatchlint_syntax::{strip_quotes, Labeled, PropagateDefaults, Value};

use crate::model::*;
use crate::reader::{ConfigurationReader, Cursor, Token};

/// Build the top level of a flattened `dispatcher.any`.
pub fn build_dispatcher_config(reader: &mut ConfigurationReader<'_>) -> DispatcherConfig {
    let mut config = DispatcherConfig::default();
    let mut first_source = None;

    loop {
        let mark = reader.mark();
        let Some(token) = reader.next(true) else {
            break;
        };
        if first_source.is_none() {
            first_source = Some(token.source.clone());
        }
        if !token.is_name() {
            unexpected_token(reader, "dispatcher configuration", &token, mark);
            continue;
        }
        let handled = match field_name(&token).as_str() {
            "name" => set(&mut config.name, reader.next_string()),
            "ignoreeintr" => replace(&mut config.ignore_eintr, reader.next_boolean()),
            "farms" => {
                config.farms = parse_labeled_list(reader, "farms", parse_farm);
                true
            }
            _ => false,
        };
        if !handled {
            unknown_field(reader, "dispatcher configuration", &token);
        }
    }

    if let Some(source) = first_source {
        config.propagate_defaults(&source);
    }
    config
}

/// Parse one `{ ... }` block into `T`, dispatching each `/field` to `field`.
///
/// `field` receives the lower-cased field name without its slash and returns
/// false for names it does not know.
pub fn parse_block<'d, T, F>(reader: &mut ConfigurationReader<'d>, what: &str, mut field: F) -> Value<T>
where
    T: Default + PropagateDefaults,
    F: FnMut(&mut ConfigurationReader<'d>, &mut T, &str) -> bool,
{
    let Some(open) = reader.peek().filter(|token| token.is("{")) else {
        let source = reader.current_source();
        reader.record(Severity::Minor, format!("expected '{{' to open {what}"), &source);
        return Value::default();
    };
    reader.next(true);

    let mut node = T::default();
    loop {
        let mark = reader.mark();
        let Some(token) = reader.next(true) else {
            reader.record(Severity::Major, format!("unterminated {what} block"), &open.source);
            break;
        };
        if token.is("}") {
            break;
        }
        if !token.is_name() {
            unexpected_token(reader, what, &token, mark);
            continue;
        }
        if !field(reader, &mut node, &field_name(&token)) {
            unknown_field(reader, what, &token);
        }
    }

    node.propagate_defaults(&open.source);
    Value::new(node, open.source)
}

/// Parse `{ /label { ... } /label { ... } }`, where labels may be omitted.
pub fn parse_labeled_list<'d, T, F>(
    reader: &mut ConfigurationReader<'d>,
    what: &str,
    mut item: F,
) -> Value<Vec<Labeled<T>>>
where
    T: PropagateDefaults,
    F: FnMut(&mut ConfigurationReader<'d>) -> Value<T>,
{
    let Some(open) = reader.peek().filter(|token| token.is("{")) else {
        let source = reader.current_source();
        reader.record(Severity::Minor, format!("expected '{{' to open {what}"), &source);
        return Value::builtin(Vec::new());
    };
    reader.next(true);

    let mut items = Vec::new();
    loop {
        let Some(token) = reader.peek() else {
            reader.record(Severity::Major, format!("unterminated {what} list"), &open.source);
            break;
        };
        if token.is("}") {
            reader.next(true);
            break;
        }
        if token.is("{") {
            reader.record(Severity::Info, format!("entry in {what} has no label"), &token.source);
            items.push(Labeled::new(None, item(reader)));
            continue;
        }
        reader.next(true);
        if !token.is_name() {
            let after = reader.mark();
            unexpected_token(reader, what, &token, after);
            continue;
        }
        let label = strip_quotes(&token.text);
        let label = label.strip_prefix('/').unwrap_or(label).to_string();
        items.push(Labeled::new(Some(label), item(reader)));
    }

    let mut list = Value::new(items, open.source.clone());
    list.propagate_defaults(&open.source);
    list
}

fn parse_farm(reader: &mut ConfigurationReader<'_>) -> Value<Farm> {
    parse_block(reader, "farm", farm_field)
}

fn farm_field(reader: &mut ConfigurationReader<'_>, farm: &mut Farm, name: &str) -> bool {
    match name {
        "clientheaders" => farm.client_headers = reader.next_string_list(),
        "virtualhosts" => farm.virtual_hosts = reader.next_string_list(),
        "renders" => farm.renders = parse_labeled_list(reader, "renders", parse_render),
        "filter" => farm.filter = parse_labeled_list(reader, "filter", parse_filter_rule),
        "cache" => farm.cache = parse_block(reader, "cache", cache_field),
        "sessionmanagement" => {
            farm.session_management =
                Some(parse_block(reader, "sessionmanagement", session_management_field))
        }
        "stickyconnectionsfor" => {
            if let Some(path) = reader.next_string() {
                farm.sticky_connections_for = path.map(|path| vec![path]);
            }
        }
        "health_check" => farm.health_check = Some(parse_block(reader, "health_check", health_check_field)),
        "retrydelay" => farm.retry_delay = reader.next_integer(DEFAULT_RETRY_DELAY),
        "numberofretries" => farm.number_of_retries = reader.next_integer(DEFAULT_NUMBER_OF_RETRIES),
        "unavailablepenalty" => {
            farm.unavailable_penalty = reader.next_integer(DEFAULT_UNAVAILABLE_PENALTY)
        }
        "failover" => return replace(&mut farm.failover, reader.next_boolean()),
        "auth_checker" => farm.auth_checker = Some(parse_block(reader, "auth_checker", auth_checker_field)),
        "vanity_urls" => farm.vanity_urls = Some(parse_block(reader, "vanity_urls", vanity_urls_field)),
        "propagatesyndpost" => return replace(&mut farm.propagate_synd_post, reader.next_boolean()),
        "info" => return replace(&mut farm.info, reader.next_boolean()),
        _ => return false,
    }
    true
}

fn cache_field(reader: &mut ConfigurationReader<'_>, cache: &mut Cache, name: &str) -> bool {
    match name {
        "docroot" => replace(&mut cache.docroot, reader.next_string()),
        "statfile" => set(&mut cache.statfile, reader.next_string()),
        "statfileslevel" => {
            cache.statfileslevel = reader.next_integer(0);
            true
        }
        "servestaleonerror" => replace(&mut cache.serve_stale_on_error, reader.next_boolean()),
        "allowauthorized" => replace(&mut cache.allow_authorized, reader.next_boolean()),
        "rules" => {
            cache.rules = parse_labeled_list(reader, "rules", parse_cache_rule);
            true
        }
        "invalidate" => {
            cache.invalidate = parse_labeled_list(reader, "invalidate", parse_cache_rule);
            true
        }
        "invalidatehandler" => set(&mut cache.invalidate_handler, reader.next_string()),
        "allowedclients" => {
            cache.allowed_clients = parse_labeled_list(reader, "allowedClients", parse_cache_rule);
            true
        }
        "ignoreurlparams" => {
            cache.ignore_url_params = parse_labeled_list(reader, "ignoreUrlParams", parse_cache_rule);
            true
        }
        "headers" => {
            cache.headers = reader.next_string_list();
            true
        }
        "mode" => set(&mut cache.mode, reader.next_string()),
        "graceperiod" => {
            cache.grace_period = reader.next_integer(0);
            true
        }
        "enablettl" => replace(&mut cache.enable_ttl, reader.next_boolean()),
        _ => false,
    }
}

fn parse_cache_rule(reader: &mut ConfigurationReader<'_>) -> Value<CacheRule> {
    parse_block(reader, "rule", |reader, rule: &mut CacheRule, name| match name {
        "type" => replace(&mut rule.rule_type, next_filter_type(reader)),
        "glob" => set(&mut rule.glob, reader.next_string()),
        "url" => set(&mut rule.url, reader.next_string()),
        _ => false,
    })
}

fn parse_filter_rule(reader: &mut ConfigurationReader<'_>) -> Value<FilterRule> {
    parse_block(reader, "filter", filter_field)
}

fn filter_field(reader: &mut ConfigurationReader<'_>, rule: &mut FilterRule, name: &str) -> bool {
    if name == "type" {
        return replace(&mut rule.rule_type, next_filter_type(reader));
    }
    let slot = match name {
        "url" => &mut rule.url,
        "method" => &mut rule.method,
        "path" => &mut rule.path,
        "selectors" => &mut rule.selectors,
        "extension" => &mut rule.extension,
        "suffix" => &mut rule.suffix,
        "query" => &mut rule.query,
        "protocol" => &mut rule.protocol,
        "glob" => &mut rule.glob,
        _ => return false,
    };
    set(slot, reader.next_string())
}

fn next_filter_type(reader: &mut ConfigurationReader<'_>) -> Option<Value<FilterType>> {
    let literal = reader.next_string()?;
    match FilterType::parse(literal.payload()) {
        Some(rule_type) => Some(literal.map(|_| rule_type)),
        None => {
            reader.record(
                Severity::Major,
                format!("unknown rule type '{}', treating it as deny", literal.payload()),
                literal.source(),
            );
            Some(literal.map(|_| FilterType::Deny))
        }
    }
}

fn parse_render(reader: &mut ConfigurationReader<'_>) -> Value<Render> {
    parse_block(reader, "render", |reader, render: &mut Render, name| {
        match name {
            "hostname" => return replace(&mut render.hostname, reader.next_string()),
            "port" => render.port = reader.next_integer(DEFAULT_RENDER_PORT),
            "timeout" => render.timeout = reader.next_integer(0),
            "receivetimeout" => render.receive_timeout = reader.next_integer(DEFAULT_RECEIVE_TIMEOUT),
            "ipv4" => return replace(&mut render.ipv4, reader.next_boolean()),
            "secure" => return replace(&mut render.secure, reader.next_boolean()),
            "always-resolve" => return replace(&mut render.always_resolve, reader.next_boolean()),
            _ => return false,
        }
        true
    })
}

fn session_management_field(
    reader: &mut ConfigurationReader<'_>,
    session: &mut SessionManagement,
    name: &str,
) -> bool {
    match name {
        "directory" => replace(&mut session.directory, reader.next_string()),
        "encode" => replace(&mut session.encode, reader.next_string()),
        "header" => replace(&mut session.header, reader.next_string()),
        "timeout" => {
            session.timeout = reader.next_integer(DEFAULT_SESSION_TIMEOUT);
            true
        }
        _ => false,
    }
}

fn health_check_field(reader: &mut ConfigurationReader<'_>, check: &mut HealthCheck, name: &str) -> bool {
    match name {
        "url" => replace(&mut check.url, reader.next_string()),
        _ => false,
    }
}

fn auth_checker_field(reader: &mut ConfigurationReader<'_>, checker: &mut AuthChecker, name: &str) -> bool {
    match name {
        "url" => replace(&mut checker.url, reader.next_string()),
        "filter" => {
            checker.filter = parse_labeled_list(reader, "auth_checker filter", parse_cache_rule);
            true
        }
        "headers" => {
            checker.headers = parse_labeled_list(reader, "auth_checker headers", parse_cache_rule);
            true
        }
        _ => false,
    }
}

fn vanity_urls_field(reader: &mut ConfigurationReader<'_>, vanity: &mut VanityUrls, name: &str) -> bool {
    match name {
        "url" => replace(&mut vanity.url, reader.next_string()),
        "file" => replace(&mut vanity.file, reader.next_string()),
        "delay" => {
            vanity.delay = reader.next_integer(DEFAULT_VANITY_DELAY);
            true
        }
        _ => false,
    }
}

fn field_name(token: &Token) -> String {
    token.text.trim_start_matches('/').to_ascii_lowercase()
}

/// Store a value read for a known field; end of input keeps the default.
fn replace<T>(slot: &mut Value<T>, value: Option<Value<T>>) -> bool {
    if let Some(value) = value {
        *slot = value;
    }
    true
}

fn set<T>(slot: &mut Option<Value<T>>, value: Option<Value<T>>) -> bool {
    if value.is_some() {
        *slot = value;
    }
    true
}

fn unknown_field(reader: &mut ConfigurationReader<'_>, what: &str, token: &Token) {
    reader.record(
        Severity::Minor,
        format!("unknown field '{}' in {what}", token.text),
        &token.source,
    );
    match reader.peek() {
        Some(next) if next.is("{") => reader.advance_past_this_element(),
        Some(next) if !next.is("}") && !next.is_name() => {
            reader.next(true);
        }
        _ => {}
    }
}

/// Record a stray token; a stray `{` has its whole region skipped.
fn unexpected_token(reader: &mut ConfigurationReader<'_>, what: &str, token: &Token, before: Cursor) {
    reader.record(
        Severity::Minor,
        format!("unexpected '{}' in {what}", token.text),
        &token.source,
    );
    if token.is("{") {
        reader.reset(before);
        reader.advance_past_this_element();
    }
}
