//! Plain data holders populated by the dispatcher tree builder.
//!
//! Every field is a [`Value`] so rule violations can point at the line that
//! set it, or at the enclosing block when the field was left at its default.

use std::fmt;

use dispatchlint_syntax::{Labeled, PropagateDefaults, Source, Value};

pub const DEFAULT_RETRY_DELAY: i64 = 1;
pub const DEFAULT_NUMBER_OF_RETRIES: i64 = 5;
pub const DEFAULT_UNAVAILABLE_PENALTY: i64 = 1;
pub const DEFAULT_RECEIVE_TIMEOUT: i64 = 600_000;
pub const DEFAULT_RENDER_PORT: i64 = 80;
pub const DEFAULT_VANITY_DELAY: i64 = 300;
pub const DEFAULT_SESSION_TIMEOUT: i64 = 800;

/// Top level of a `dispatcher.any` file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatcherConfig {
    pub name: Option<Value<String>>,
    pub ignore_eintr: Value<bool>,
    pub farms: Value<Vec<Labeled<Farm>>>,
}

/// Whether a farm serves authoring or publishing traffic.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FarmType {
    Author,
    Publish,
}

impl FarmType {
    /// Derived from the farm label: anything mentioning `author` is an
    /// author farm.
    pub fn from_label(label: Option<&str>) -> Self {
        match label {
            Some(label) if label.to_ascii_lowercase().contains("author") => FarmType::Author,
            _ => FarmType::Publish,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FarmType::Author => "AUTHOR",
            FarmType::Publish => "PUBLISH",
        }
    }
}

impl fmt::Display for FarmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Farm {
    pub client_headers: Value<Vec<String>>,
    pub virtual_hosts: Value<Vec<String>>,
    pub renders: Value<Vec<Labeled<Render>>>,
    pub filter: Value<Vec<Labeled<FilterRule>>>,
    pub cache: Value<Cache>,
    pub session_management: Option<Value<SessionManagement>>,
    pub sticky_connections_for: Value<Vec<String>>,
    pub health_check: Option<Value<HealthCheck>>,
    pub retry_delay: Value<i64>,
    pub number_of_retries: Value<i64>,
    pub unavailable_penalty: Value<i64>,
    pub failover: Value<bool>,
    pub auth_checker: Option<Value<AuthChecker>>,
    pub vanity_urls: Option<Value<VanityUrls>>,
    pub propagate_synd_post: Value<bool>,
    pub info: Value<bool>,
}

impl Default for Farm {
    fn default() -> Self {
        Farm {
            client_headers: Value::default(),
            virtual_hosts: Value::default(),
            renders: Value::default(),
            filter: Value::default(),
            cache: Value::default(),
            session_management: None,
            sticky_connections_for: Value::default(),
            health_check: None,
            retry_delay: Value::builtin(DEFAULT_RETRY_DELAY),
            number_of_retries: Value::builtin(DEFAULT_NUMBER_OF_RETRIES),
            unavailable_penalty: Value::builtin(DEFAULT_UNAVAILABLE_PENALTY),
            failover: Value::default(),
            auth_checker: None,
            vanity_urls: None,
            propagate_synd_post: Value::default(),
            info: Value::default(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cache {
    pub docroot: Value<String>,
    pub statfile: Option<Value<String>>,
    pub statfileslevel: Value<i64>,
    pub serve_stale_on_error: Value<bool>,
    pub allow_authorized: Value<bool>,
    pub rules: Value<Vec<Labeled<CacheRule>>>,
    pub invalidate: Value<Vec<Labeled<CacheRule>>>,
    pub invalidate_handler: Option<Value<String>>,
    pub allowed_clients: Value<Vec<Labeled<CacheRule>>>,
    pub ignore_url_params: Value<Vec<Labeled<CacheRule>>>,
    pub headers: Value<Vec<String>>,
    pub mode: Option<Value<String>>,
    pub grace_period: Value<i64>,
    pub enable_ttl: Value<bool>,
}

/// `/type "allow"` or `/type "deny"`.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub enum FilterType {
    Allow,
    #[default]
    Deny,
}

impl FilterType {
    pub fn parse(literal: &str) -> Option<Self> {
        if literal.eq_ignore_ascii_case("allow") {
            Some(FilterType::Allow)
        } else if literal.eq_ignore_ascii_case("deny") {
            Some(FilterType::Deny)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FilterType::Allow => "ALLOW",
            FilterType::Deny => "DENY",
        }
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterRule {
    pub rule_type: Value<FilterType>,
    pub url: Option<Value<String>>,
    pub method: Option<Value<String>>,
    pub path: Option<Value<String>>,
    pub selectors: Option<Value<String>>,
    pub extension: Option<Value<String>>,
    pub suffix: Option<Value<String>>,
    pub query: Option<Value<String>>,
    pub protocol: Option<Value<String>>,
    pub glob: Option<Value<String>>,
}

impl FilterRule {
    /// Field payloads in a fixed order, used to compare rules while ignoring
    /// provenance.
    pub fn criteria(&self) -> [Option<&str>; 9] {
        fn text(field: &Option<Value<String>>) -> Option<&str> {
            field.as_ref().map(|value| value.payload().as_str())
        }
        [
            text(&self.url),
            text(&self.method),
            text(&self.path),
            text(&self.selectors),
            text(&self.extension),
            text(&self.suffix),
            text(&self.query),
            text(&self.protocol),
            text(&self.glob),
        ]
    }
}

/// Entry of `/rules`, `/invalidate`, `/allowedClients` and similar lists.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheRule {
    pub rule_type: Value<FilterType>,
    pub glob: Option<Value<String>>,
    pub url: Option<Value<String>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Render {
    pub hostname: Value<String>,
    pub port: Value<i64>,
    pub timeout: Value<i64>,
    pub receive_timeout: Value<i64>,
    pub ipv4: Value<bool>,
    pub secure: Value<bool>,
    pub always_resolve: Value<bool>,
}

impl Default for Render {
    fn default() -> Self {
        Render {
            hostname: Value::default(),
            port: Value::builtin(DEFAULT_RENDER_PORT),
            timeout: Value::default(),
            receive_timeout: Value::builtin(DEFAULT_RECEIVE_TIMEOUT),
            ipv4: Value::default(),
            secure: Value::default(),
            always_resolve: Value::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VanityUrls {
    pub url: Value<String>,
    pub file: Value<String>,
    pub delay: Value<i64>,
}

impl Default for VanityUrls {
    fn default() -> Self {
        VanityUrls {
            url: Value::default(),
            file: Value::default(),
            delay: Value::builtin(DEFAULT_VANITY_DELAY),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthChecker {
    pub url: Value<String>,
    pub filter: Value<Vec<Labeled<CacheRule>>>,
    pub headers: Value<Vec<Labeled<CacheRule>>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionManagement {
    pub directory: Value<String>,
    pub encode: Value<String>,
    pub header: Value<String>,
    pub timeout: Value<i64>,
}

impl Default for SessionManagement {
    fn default() -> Self {
        SessionManagement {
            directory: Value::default(),
            encode: Value::builtin("md5".to_string()),
            header: Value::builtin("HTTP:authorization".to_string()),
            timeout: Value::builtin(DEFAULT_SESSION_TIMEOUT),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HealthCheck {
    pub url: Value<String>,
}

impl PropagateDefaults for FilterType {
    fn propagate_defaults(&mut self, _source: &Source) {}
}

macro_rules! propagate_fields {
    ($($ty:ty { $($field:ident),* $(,)? })*) => {
        $(
            impl PropagateDefaults for $ty {
                fn propagate_defaults(&mut self, source: &Source) {
                    $(self.$field.propagate_defaults(source);)*
                }
            }
        )*
    };
}

propagate_fields! {
    DispatcherConfig { name, ignore_eintr, farms }
    Farm {
        client_headers, virtual_hosts, renders, filter, cache, session_management,
        sticky_connections_for, health_check, retry_delay, number_of_retries,
        unavailable_penalty, failover, auth_checker, vanity_urls, propagate_synd_post, info,
    }
    Cache {
        docroot, statfile, statfileslevel, serve_stale_on_error, allow_authorized, rules,
        invalidate, invalidate_handler, allowed_clients, ignore_url_params, headers, mode,
        grace_period, enable_ttl,
    }
    FilterRule { rule_type, url, method, path, selectors, extension, suffix, query, protocol, glob }
    CacheRule { rule_type, glob, url }
    Render { hostname, port, timeout, receive_timeout, ipv4, secure, always_resolve }
    VanityUrls { url, file, delay }
    AuthChecker { url, filter, headers }
    SessionManagement { directory, encode, header, timeout }
    HealthCheck { url }
}

impl DispatcherConfig {
    /// Farms together with their derived type.
    pub fn farms(&self) -> impl Iterator<Item = (&Labeled<Farm>, FarmType)> {
        self.farms
            .payload()
            .iter()
            .map(|farm| (farm, FarmType::from_label(farm.label())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn farm_type_follows_the_label() {
        assert_eq!(FarmType::from_label(Some("authorfarm")), FarmType::Author);
        assert_eq!(FarmType::from_label(Some("00_AUTHOR")), FarmType::Author);
        assert_eq!(FarmType::from_label(Some("publishfarm")), FarmType::Publish);
        assert_eq!(FarmType::from_label(None), FarmType::Publish);
    }

    #[test]
    fn propagation_reaches_nested_defaults() {
        let block = Source::new("farm.any", 3, None);
        let mut farm = Farm::default();
        farm.propagate_defaults(&block);

        assert_eq!(farm.retry_delay.source(), &block);
        assert_eq!(*farm.retry_delay.payload(), DEFAULT_RETRY_DELAY);
        assert_eq!(farm.cache.payload().statfileslevel.source(), &block);
        assert!(!farm.cache.payload().docroot.is_explicit());
    }

    #[test]
    fn criteria_ignore_where_each_field_was_read() {
        let first = FilterRule {
            url: Some(Value::new("/content/*".to_string(), Source::new("a.any", 4, None))),
            extension: Some(Value::new("html".to_string(), Source::new("a.any", 5, None))),
            ..FilterRule::default()
        };
        let second = FilterRule {
            url: Some(Value::builtin("/content/*".to_string())),
            extension: Some(Value::new("html".to_string(), Source::new("b.any", 9, None))),
            ..FilterRule::default()
        };

        let criteria = first.criteria();
        assert_eq!(criteria, second.criteria());
        assert_eq!(criteria[0], Some("/content/*"));
        assert_eq!(criteria[4], Some("html"));
        assert!(criteria[1].is_none());
    }
}
