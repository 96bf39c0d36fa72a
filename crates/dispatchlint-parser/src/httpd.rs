//! Apache httpd configuration parsing into a directive tree.

use std::collections::{BTreeSet, VecDeque};
use std::path::{Path, PathBuf};

use dispatchlint_config::Severity;
use dispatchlint_syntax::{ConfigLine, Dialect, Scanner, Source};

use crate::{ParseError, ParseSession};

/// A directive line, or a `<Section>` together with its contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Directive {
    pub name: String,
    pub args: Vec<String>,
    pub source: Source,
    pub block: Option<Vec<Directive>>,
}

impl Directive {
    pub fn new(name: impl Into<String>, args: Vec<String>, source: Source) -> Self {
        Directive {
            name: name.into(),
            args,
            source,
            block: None,
        }
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub fn is_section(&self) -> bool {
        self.block.is_some()
    }

    /// Arguments joined by single spaces.
    pub fn arguments(&self) -> String {
        self.args.join(" ")
    }

    pub fn children(&self) -> &[Directive] {
        self.block.as_deref().unwrap_or(&[])
    }

    /// Direct children called `name`.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Directive> + 'a {
        self.children().iter().filter(move |child| child.is(name))
    }
}

/// Every directive of an httpd configuration, includes spliced in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpdConfig {
    pub directives: Vec<Directive>,
}

impl HttpdConfig {
    /// Every directive named `name`, at any depth, in document order.
    pub fn find_all(&self, name: &str) -> Vec<&Directive> {
        let mut found = Vec::new();
        collect(&self.directives, name, &mut found);
        found
    }

    pub fn virtual_hosts(&self) -> Vec<&Directive> {
        self.find_all("VirtualHost")
    }
}

fn collect<'a>(directives: &'a [Directive], name: &str, found: &mut Vec<&'a Directive>) {
    for directive in directives {
        if directive.is(name) {
            found.push(directive);
        }
        collect(directive.children(), name, found);
    }
}

/// Parse the httpd configuration rooted at `entry`.
///
/// Included files are read from an explicit stack; a file's directives are
/// spliced into the includer's open section once the file is exhausted.
pub fn parse_httpd(session: &mut ParseSession, entry: &Path) -> Result<HttpdConfig, ParseError> {
    let mut directives = Vec::new();
    let mut files = vec![OpenFile::open(session, entry, None)?];

    while let Some(file) = files.last_mut() {
        if let Some(pending) = file.pending.pop_front() {
            match pending {
                Pending::Expression {
                    include,
                    optional,
                    source,
                } => {
                    let matched = resolve_include(session, &file.cwd, &include, optional, &source);
                    for found in matched.into_iter().rev() {
                        file.pending.push_front(Pending::File(found));
                    }
                }
                Pending::File(found) => {
                    session.enter_include(&found)?;
                    tracing::debug!(file = %found.display(), "following Include");
                    let includer = file.path.clone();
                    files.push(OpenFile::open(session, &found, Some(&includer))?);
                }
            }
            continue;
        }

        if let Some(line) = file.lines.next() {
            read_line(session, file, &line);
            continue;
        }

        let Some(done) = files.pop() else {
            break;
        };
        let closed = close_file(session, done.sections);
        match files.last_mut() {
            Some(includer) => current(&mut includer.sections).children.extend(closed),
            None => directives = closed,
        }
    }
    Ok(HttpdConfig { directives })
}

/// One file being read: its remaining lines, the sections it has opened
/// and the includes waiting to be spliced in before its next line.
struct OpenFile {
    path: PathBuf,
    cwd: PathBuf,
    lines: std::vec::IntoIter<ConfigLine>,
    pending: VecDeque<Pending>,
    sections: Vec<Frame>,
}

impl OpenFile {
    fn open(session: &mut ParseSession, path: &Path, included_from: Option<&Path>) -> Result<Self, ParseError> {
        let lines = session.load_file(path, included_from, Dialect::Httpd)?;
        let root = Frame::root(Source::new(path, 0, included_from.map(Path::to_path_buf)));
        Ok(OpenFile {
            path: path.to_path_buf(),
            cwd: path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf(),
            lines: lines.into_iter(),
            pending: VecDeque::new(),
            sections: vec![root],
        })
    }
}

enum Pending {
    /// An `Include` argument, resolved only when its turn comes so that
    /// earlier includes can still `Define` what it refers to.
    Expression {
        include: String,
        optional: bool,
        source: Source,
    },
    File(PathBuf),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum FrameMode {
    Section,
    Inline,
    Skipped,
}

#[derive(Debug)]
struct Frame {
    name: String,
    args: Vec<String>,
    source: Source,
    mode: FrameMode,
    children: Vec<Directive>,
}

impl Frame {
    fn root(source: Source) -> Self {
        Frame {
            name: String::new(),
            args: Vec::new(),
            source,
            mode: FrameMode::Section,
            children: Vec::new(),
        }
    }
}

fn read_line(session: &mut ParseSession, file: &mut OpenFile, line: &ConfigLine) {
    let stack = &mut file.sections;
    let skipping = stack.iter().any(|frame| frame.mode == FrameMode::Skipped);
    let text = if skipping {
        line.text.clone()
    } else {
        substitute(session, line)
    };
    let text = text.trim();

    if let Some(rest) = text.strip_prefix("</") {
        close_section(session, stack, rest, &line.source);
        return;
    }
    if let Some(rest) = text.strip_prefix('<') {
        open_section(stack, rest, &line.source, skipping);
        return;
    }
    if skipping {
        return;
    }

    let mut tokens = tokenize(text);
    if tokens.is_empty() {
        return;
    }
    let name = tokens.remove(0);
    let args = tokens;

    match name.to_ascii_lowercase().as_str() {
        "define" => match args.first() {
            Some(variable) => {
                let value = args.get(1).cloned().unwrap_or_default();
                session.environment_mut().define(variable.clone(), value);
            }
            None => session
                .diagnostics_mut()
                .record(Severity::Minor, "Define without a name", &line.source),
        },
        "undefine" => {
            if let Some(variable) = args.first() {
                session.environment_mut().undefine(variable);
            }
        }
        "include" | "includeoptional" => {
            let optional = name.eq_ignore_ascii_case("includeoptional");
            file.pending.extend(args.into_iter().map(|include| Pending::Expression {
                include,
                optional,
                source: line.source.clone(),
            }));
            return;
        }
        _ => {}
    }

    current(stack)
        .children
        .push(Directive::new(name, args, line.source.clone()));
}

/// Close whatever sections a file left open and return its directives.
fn close_file(session: &mut ParseSession, mut stack: Vec<Frame>) -> Vec<Directive> {
    while stack.len() > 1 {
        if let Some(frame) = stack.last() {
            session.diagnostics_mut().record(
                Severity::Major,
                format!("<{}> section is never closed", frame.name),
                &frame.source,
            );
        }
        close_frame(&mut stack);
    }
    stack.pop().map(|root| root.children).unwrap_or_default()
}

fn resolve_include(
    session: &mut ParseSession,
    cwd: &Path,
    include: &str,
    optional: bool,
    source: &Source,
) -> BTreeSet<PathBuf> {
    let files = session.resolve(include, cwd);
    if files.is_empty() {
        if optional {
            tracing::debug!("{source}: IncludeOptional '{include}' matches no file");
        } else {
            session.diagnostics_mut().record(
                Severity::Major,
                format!("Include '{include}' must exist but matches no file"),
                source,
            );
        }
    }
    files
}

fn substitute(session: &ParseSession, line: &ConfigLine) -> String {
    let substitution = session.environment().substitute(&line.text);
    for name in &substitution.unresolved {
        tracing::warn!("{}: variable '{name}' is not defined", line.source);
    }
    substitution.text
}

fn tokenize(text: &str) -> Vec<String> {
    let mut scanner = Scanner::new(text, Dialect::Httpd);
    std::iter::from_fn(|| scanner.next_token(false)).collect()
}

fn current(stack: &mut [Frame]) -> &mut Frame {
    let last = stack.len() - 1;
    &mut stack[last]
}

fn open_section(stack: &mut Vec<Frame>, rest: &str, source: &Source, skipping: bool) {
    let inner = rest.trim_end().trim_end_matches('>');
    let mut tokens = tokenize(inner);
    if tokens.is_empty() {
        return;
    }
    let name = tokens.remove(0);
    let lower = name.to_ascii_lowercase();
    let mode = if skipping || lower == "else" || lower == "elseif" {
        FrameMode::Skipped
    } else if lower.starts_with("if") {
        FrameMode::Inline
    } else {
        FrameMode::Section
    };
    stack.push(Frame {
        name,
        args: tokens,
        source: source.clone(),
        mode,
        children: Vec::new(),
    });
}

fn close_section(session: &mut ParseSession, stack: &mut Vec<Frame>, rest: &str, source: &Source) {
    let name = rest.trim_end().trim_end_matches('>').trim();
    let matches = stack.len() > 1
        && stack
            .last()
            .is_some_and(|frame| frame.name.eq_ignore_ascii_case(name));
    if matches {
        close_frame(stack);
    } else {
        session.diagnostics_mut().record(
            Severity::Minor,
            format!("unexpected </{name}>"),
            source,
        );
    }
}

fn close_frame(stack: &mut Vec<Frame>) {
    if stack.len() < 2 {
        return;
    }
    let Some(frame) = stack.pop() else {
        return;
    };
    let parent = current(stack);
    match frame.mode {
        FrameMode::Section => parent.children.push(Directive {
            name: frame.name,
            args: frame.args,
            source: frame.source,
            block: Some(frame.children),
        }),
        FrameMode::Inline => parent.children.extend(frame.children),
        FrameMode::Skipped => {}
    }
}
