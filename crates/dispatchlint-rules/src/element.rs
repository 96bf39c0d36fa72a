//! Element-path dispatch: `farm.cache.statfileslevel` style paths mapped to
//! typed accessors over the parsed trees.

use std::borrow::Cow;
use std::fmt;

use dispatchlint_parser::model::{
    AuthChecker, Cache, CacheRule, DispatcherConfig, Farm, HealthCheck, Render, SessionManagement, VanityUrls,
};
use dispatchlint_parser::{Directive, FilterRule};
use dispatchlint_syntax::{Labeled, Source, Value};

/// The payload a check runs against, unwrapped from its `Value`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Element<'a> {
    Integer(i64),
    Boolean(bool),
    Text(Cow<'a, str>),
    Strings(&'a [String]),
    Filters(&'a [Labeled<FilterRule>]),
    Rules(&'a [Labeled<CacheRule>]),
    Renders(&'a [Labeled<Render>]),
    Farms(&'a [Labeled<Farm>]),
    Directives(&'a [Directive]),
    /// A nested block addressed as a whole.
    Composite(&'static str),
    /// An optional field or block that was never written.
    Absent,
}

impl Element<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            Element::Integer(_) => "an integer",
            Element::Boolean(_) => "a boolean",
            Element::Text(_) => "a text value",
            Element::Strings(_) => "a string list",
            Element::Filters(_) => "a filter list",
            Element::Rules(_) => "a cache rule list",
            Element::Renders(_) => "a render list",
            Element::Farms(_) => "a farm list",
            Element::Directives(_) => "a directive block",
            Element::Composite(_) => "a block",
            Element::Absent => "an absent value",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target<'a> {
    pub element: Element<'a>,
    pub source: Source,
}

impl<'a> Target<'a> {
    pub fn new(element: Element<'a>, source: &Source) -> Self {
        Target {
            element,
            source: source.clone(),
        }
    }

    pub fn absent(source: &Source) -> Self {
        Target::new(Element::Absent, source)
    }
}

/// The node a rule is evaluated against.
#[derive(Clone, Copy, Debug)]
pub enum Scope<'a> {
    Dispatcher(&'a DispatcherConfig),
    Farm(&'a Labeled<Farm>),
    VirtualHost(&'a Directive),
}

impl<'a> Scope<'a> {
    /// Where violations point when the target itself has no location.
    pub fn source(&self) -> &'a Source {
        match self {
            Scope::Dispatcher(config) => config.farms.source(),
            Scope::Farm(farm) => farm.source(),
            Scope::VirtualHost(vhost) => &vhost.source,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Root {
    Dispatcher,
    Farm,
    Httpd,
}

/// A parsed `root.section[.field]` path.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ElementPath {
    root: Root,
    section: String,
    field: Option<String>,
}

impl ElementPath {
    /// `None` for unknown roots and for paths that are not two or three
    /// segments long.
    pub fn parse(path: &str) -> Option<Self> {
        let segments: Vec<&str> = path.trim().split('.').collect();
        if !(2..=3).contains(&segments.len()) || segments.iter().any(|segment| segment.is_empty()) {
            return None;
        }
        let root = match normalize(segments[0]).as_str() {
            "farm" => Root::Farm,
            "httpd" => Root::Httpd,
            "dispatcher" => Root::Dispatcher,
            _ => return None,
        };
        Some(ElementPath {
            root,
            section: normalize(segments[1]),
            field: segments.get(2).map(|field| field.to_string()),
        })
    }

    pub fn root(&self) -> Root {
        self.root
    }

    /// Resolve against `scope`; a path for another root, or a section or
    /// field the tree does not have, yields no target.
    pub fn resolve<'a>(&self, scope: Scope<'a>) -> Option<Target<'a>> {
        let field = self.field.as_deref();
        match (self.root, scope) {
            (Root::Farm, Scope::Farm(farm)) => farm_target(farm, &self.section, field.map(normalize).as_deref()),
            (Root::Dispatcher, Scope::Dispatcher(config)) if field.is_none() => {
                dispatcher_field(&self.section).map(|accessor| accessor(config))
            }
            (Root::Httpd, Scope::VirtualHost(vhost)) if self.section == "vhost" => Some(vhost_target(vhost, field)),
            _ => None,
        }
    }
}

impl fmt::Display for ElementPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let root = match self.root {
            Root::Dispatcher => "dispatcher",
            Root::Farm => "farm",
            Root::Httpd => "httpd",
        };
        write!(f, "{root}.{}", self.section)?;
        if let Some(field) = &self.field {
            write!(f, ".{field}")?;
        }
        Ok(())
    }
}

/// Lowercase and drop `_` and `-`, so `retryDelay`, `retry_delay` and
/// `retry-delay` name the same field.
fn normalize(segment: &str) -> String {
    segment
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

type Accessor<T> = for<'x> fn(&'x T) -> Target<'x>;

fn integer(value: &Value<i64>) -> Target<'_> {
    Target::new(Element::Integer(*value.payload()), value.source())
}

fn boolean(value: &Value<bool>) -> Target<'_> {
    Target::new(Element::Boolean(*value.payload()), value.source())
}

fn text(value: &Value<String>) -> Target<'_> {
    Target::new(Element::Text(Cow::Borrowed(value.payload().as_str())), value.source())
}

fn optional_text(value: &Option<Value<String>>) -> Target<'_> {
    match value {
        Some(value) => text(value),
        None => Target {
            element: Element::Absent,
            source: Source::builtin(),
        },
    }
}

fn strings(value: &Value<Vec<String>>) -> Target<'_> {
    Target::new(Element::Strings(value.payload()), value.source())
}

fn rules(value: &Value<Vec<Labeled<CacheRule>>>) -> Target<'_> {
    Target::new(Element::Rules(value.payload()), value.source())
}

fn dispatcher_field(name: &str) -> Option<Accessor<DispatcherConfig>> {
    let accessor: Accessor<DispatcherConfig> = match name {
        "name" => |config| optional_text(&config.name),
        "ignoreeintr" => |config| boolean(&config.ignore_eintr),
        "farms" => |config| Target::new(Element::Farms(config.farms.payload()), config.farms.source()),
        _ => return None,
    };
    Some(accessor)
}

fn farm_target<'a>(farm: &'a Labeled<Farm>, section: &str, field: Option<&str>) -> Option<Target<'a>> {
    let block = farm.source();
    let farm = farm.value.payload();
    match section {
        "cache" => nested(Some(&farm.cache), block, "cache", field, cache_field),
        "sessionmanagement" => nested(
            farm.session_management.as_ref(),
            block,
            "sessionmanagement",
            field,
            session_field,
        ),
        "healthcheck" => nested(farm.health_check.as_ref(), block, "healthcheck", field, health_check_field),
        "authchecker" => nested(farm.auth_checker.as_ref(), block, "authchecker", field, auth_checker_field),
        "vanityurls" => nested(farm.vanity_urls.as_ref(), block, "vanityurls", field, vanity_field),
        _ if field.is_none() => farm_field(section).map(|accessor| accessor(farm)),
        _ => None,
    }
}

/// A nested block addressed as a whole, or one of its fields. Fields of a
/// block that was never written are absent and point at the farm.
fn nested<'a, T>(
    value: Option<&'a Value<T>>,
    block: &'a Source,
    name: &'static str,
    field: Option<&str>,
    lookup: fn(&str) -> Option<Accessor<T>>,
) -> Option<Target<'a>> {
    let Some(field) = field else {
        return Some(match value {
            Some(value) => Target::new(Element::Composite(name), value.source()),
            None => Target::absent(block),
        });
    };
    let accessor = lookup(field)?;
    Some(match value {
        Some(value) => accessor(value.payload()),
        None => Target::absent(block),
    })
}

fn farm_field(name: &str) -> Option<Accessor<Farm>> {
    let accessor: Accessor<Farm> = match name {
        "clientheaders" => |farm| strings(&farm.client_headers),
        "virtualhosts" => |farm| strings(&farm.virtual_hosts),
        "renders" => |farm| Target::new(Element::Renders(farm.renders.payload()), farm.renders.source()),
        "filter" => |farm| Target::new(Element::Filters(farm.filter.payload()), farm.filter.source()),
        "stickyconnectionsfor" => |farm| strings(&farm.sticky_connections_for),
        "retrydelay" => |farm| integer(&farm.retry_delay),
        "numberofretries" => |farm| integer(&farm.number_of_retries),
        "unavailablepenalty" => |farm| integer(&farm.unavailable_penalty),
        "failover" => |farm| boolean(&farm.failover),
        "propagatesyndpost" => |farm| boolean(&farm.propagate_synd_post),
        "info" => |farm| boolean(&farm.info),
        _ => return None,
    };
    Some(accessor)
}

fn cache_field(name: &str) -> Option<Accessor<Cache>> {
    let accessor: Accessor<Cache> = match name {
        "docroot" => |cache| text(&cache.docroot),
        "statfile" => |cache| optional_text(&cache.statfile),
        "statfileslevel" => |cache| integer(&cache.statfileslevel),
        "servestaleonerror" => |cache| boolean(&cache.serve_stale_on_error),
        "allowauthorized" => |cache| boolean(&cache.allow_authorized),
        "rules" => |cache| rules(&cache.rules),
        "invalidate" => |cache| rules(&cache.invalidate),
        "invalidatehandler" => |cache| optional_text(&cache.invalidate_handler),
        "allowedclients" => |cache| rules(&cache.allowed_clients),
        "ignoreurlparams" => |cache| rules(&cache.ignore_url_params),
        "headers" => |cache| strings(&cache.headers),
        "mode" => |cache| optional_text(&cache.mode),
        "graceperiod" => |cache| integer(&cache.grace_period),
        "enablettl" => |cache| boolean(&cache.enable_ttl),
        _ => return None,
    };
    Some(accessor)
}

fn session_field(name: &str) -> Option<Accessor<SessionManagement>> {
    let accessor: Accessor<SessionManagement> = match name {
        "directory" => |session| text(&session.directory),
        "encode" => |session| text(&session.encode),
        "header" => |session| text(&session.header),
        "timeout" => |session| integer(&session.timeout),
        _ => return None,
    };
    Some(accessor)
}

fn health_check_field(name: &str) -> Option<Accessor<HealthCheck>> {
    let accessor: Accessor<HealthCheck> = match name {
        "url" => |check| text(&check.url),
        _ => return None,
    };
    Some(accessor)
}

fn auth_checker_field(name: &str) -> Option<Accessor<AuthChecker>> {
    let accessor: Accessor<AuthChecker> = match name {
        "url" => |checker| text(&checker.url),
        "filter" => |checker| rules(&checker.filter),
        "headers" => |checker| rules(&checker.headers),
        _ => return None,
    };
    Some(accessor)
}

fn vanity_field(name: &str) -> Option<Accessor<VanityUrls>> {
    let accessor: Accessor<VanityUrls> = match name {
        "url" => |vanity| text(&vanity.url),
        "file" => |vanity| text(&vanity.file),
        "delay" => |vanity| integer(&vanity.delay),
        _ => return None,
    };
    Some(accessor)
}

/// `httpd.vhost` is the section body; `httpd.vhost.Name` is the arguments of
/// the first direct child called `Name`.
fn vhost_target<'a>(vhost: &'a Directive, directive: Option<&str>) -> Target<'a> {
    match directive {
        None => Target::new(Element::Directives(vhost.children()), &vhost.source),
        Some(name) => match vhost.children_named(name).next() {
            Some(child) => Target::new(Element::Text(Cow::Owned(child.arguments())), &child.source),
            None => Target::absent(&vhost.source),
        },
    }
}
