use std::collections::{BTreeSet, VecDeque};
use std::path::{Path, PathBuf};

use dispatchlint_config::Severity;
use dispatchlint_include::has_pattern;
use dispatchlint_syntax::{is_quoted, strip_quotes, ConfigLine, Dialect, Diagnostics, Scanner, Source};

use crate::builder::build_dispatcher_config;
use crate::model::DispatcherConfig;
use crate::reader::ConfigurationReader;
use crate::{ParseError, ParseSession};

const INCLUDE_KEYWORD: &str = "$include";

/// Parse the dispatcher configuration rooted at `entry`, following every
/// `$include` on the way.
pub fn parse_dispatcher(session: &mut ParseSession, entry: &Path) -> Result<DispatcherConfig, ParseError> {
    let lines = load_dispatcher_lines(session, entry, None)?;
    tracing::debug!(
        entry = %entry.display(),
        lines = lines.len(),
        includes = session.includes_followed(),
        "flattened dispatcher configuration"
    );
    Ok(build_from_lines(lines, session.diagnostics_mut()))
}

/// Build the tree from already flattened lines.
pub fn build_from_lines(lines: Vec<ConfigLine>, diagnostics: &mut Diagnostics) -> DispatcherConfig {
    let mut reader = ConfigurationReader::new(lines, diagnostics);
    build_dispatcher_config(&mut reader)
}

/// Read `path` and splice the lines of every file its `$include`s name.
///
/// Files are expanded from an explicit stack, so the include ceiling is the
/// only bound on nesting.
pub fn load_dispatcher_lines(
    session: &mut ParseSession,
    path: &Path,
    included_from: Option<&Path>,
) -> Result<Vec<ConfigLine>, ParseError> {
    let mut flattened = Vec::new();
    let mut files = vec![OpenFile::open(session, path, included_from)?];

    while let Some(file) = files.last_mut() {
        let Some(next) = file.pending.pop_front() else {
            files.pop();
            continue;
        };
        match next {
            Pending::Line(line) if line.text.contains(INCLUDE_KEYWORD) => {
                for part in split_includes(session, &line).into_iter().rev() {
                    file.pending.push_front(part);
                }
            }
            Pending::Line(line) | Pending::Text(line) => flattened.push(line),
            Pending::Include { target, source } => {
                let cwd = file.path.parent().unwrap_or_else(|| Path::new("."));
                let matched = resolve_include(session, cwd, &target, &source)?;
                for found in matched.into_iter().rev() {
                    file.pending.push_front(Pending::File(found));
                }
            }
            Pending::File(found) => {
                session.enter_include(&found)?;
                tracing::debug!(file = %found.display(), "following $include");
                let includer = file.path.clone();
                files.push(OpenFile::open(session, &found, Some(&includer))?);
            }
        }
    }
    Ok(flattened)
}

/// A file being flattened, with whatever it still has to contribute.
struct OpenFile {
    path: PathBuf,
    pending: VecDeque<Pending>,
}

impl OpenFile {
    fn open(session: &mut ParseSession, path: &Path, included_from: Option<&Path>) -> Result<Self, ParseError> {
        let lines = session.load_file(path, included_from, Dialect::Dispatcher)?;
        Ok(OpenFile {
            path: path.to_path_buf(),
            pending: lines.into_iter().map(Pending::Line).collect(),
        })
    }
}

enum Pending {
    /// A line as read, not yet scanned for `$include`.
    Line(ConfigLine),
    /// Text around an `$include`, emitted as is.
    Text(ConfigLine),
    Include { target: String, source: Source },
    File(PathBuf),
}

/// Cut `line` at each `$include "<path>"`, keeping the text around it in
/// place.
fn split_includes(session: &mut ParseSession, line: &ConfigLine) -> Vec<Pending> {
    let text = line.text.as_str();
    let mut scanner = Scanner::new(text, Dialect::Dispatcher);
    let mut parts = Vec::new();
    let mut segment_start = 0;

    loop {
        let before = scanner.position();
        let Some(token) = scanner.next_token(true) else {
            break;
        };
        if token != INCLUDE_KEYWORD {
            continue;
        }
        push_segment(&text[segment_start..before], &line.source, &mut parts);

        let Some(target) = scanner.next_token(true) else {
            session
                .diagnostics_mut()
                .record(Severity::Major, "$include without a path", &line.source);
            segment_start = scanner.position();
            break;
        };
        let target = if is_quoted(&target) {
            strip_quotes(&target).to_string()
        } else {
            format!("{target}{}", scanner.take_word())
        };
        segment_start = scanner.position();
        parts.push(Pending::Include {
            target,
            source: line.source.clone(),
        });
    }

    push_segment(&text[segment_start..], &line.source, &mut parts);
    parts
}

fn resolve_include(
    session: &mut ParseSession,
    cwd: &Path,
    include: &str,
    source: &Source,
) -> Result<BTreeSet<PathBuf>, ParseError> {
    let files = session.resolve(include, cwd);
    if files.is_empty() && !has_pattern(include) {
        return Err(ParseError::IncludeNotFound {
            include: include.to_string(),
            location: source.clone(),
        });
    }
    if files.is_empty() {
        tracing::warn!("{source}: $include '{include}' matches no file");
    }
    Ok(files)
}

fn push_segment(segment: &str, source: &Source, out: &mut Vec<Pending>) {
    let segment = segment.trim();
    if !segment.is_empty() {
        out.push(Pending::Text(ConfigLine {
            text: segment.to_string(),
            source: source.clone(),
        }));
    }
}
