//! Per-file line clean-up ahead of tokenisation.
//!
//! Comments and blank lines are dropped, backslash-continued lines are joined,
//! `${NAME}` references are substituted when an environment is supplied, and
//! quote and brace balance is checked for the whole file.

use std::path::Path;

use dispatchlint_config::Severity;

use crate::line::LineRecord;
use crate::scanner::{is_quote, Dialect};
use crate::{Diagnostics, Environment, Source};

/// A cleaned logical line carrying the source of its first physical line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigLine {
    pub text: String,
    pub source: Source,
}

#[derive(Clone, Copy, Debug)]
pub struct NormalizeOptions<'a> {
    pub dialect: Dialect,
    pub environment: Option<&'a Environment>,
}

impl<'a> NormalizeOptions<'a> {
    pub fn new(dialect: Dialect) -> Self {
        NormalizeOptions {
            dialect,
            environment: None,
        }
    }

    pub fn with_environment(mut self, environment: &'a Environment) -> Self {
        self.environment = Some(environment);
        self
    }
}

pub fn normalize_lines(
    file: &Path,
    included_from: Option<&Path>,
    records: &[LineRecord],
    options: NormalizeOptions<'_>,
    diagnostics: &mut Diagnostics,
) -> Vec<ConfigLine> {
    let mut lines = Vec::new();
    let mut brace_depth = 0i64;
    let mut pending: Option<(String, usize)> = None;
    let mut last_source = Source::new(file, 0, included_from.map(Path::to_path_buf));

    for record in records {
        let (mut text, number) = match pending.take() {
            Some((mut joined, first)) => {
                joined.push_str(&record.text);
                (joined, first)
            }
            None => (record.text.clone(), record.number),
        };

        if let Some(stripped) = text.trim_end().strip_suffix('\\') {
            let stripped = stripped.to_string();
            pending = Some((stripped, number));
            continue;
        }

        let source = Source::new(file, number, included_from.map(Path::to_path_buf));
        last_source = source.clone();

        text = strip_comment(&text, options.dialect);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        let mut text = trimmed.to_string();

        if let Some(environment) = options.environment {
            let substitution = environment.substitute(&text);
            for name in &substitution.unresolved {
                tracing::warn!("{source}: environment variable '{name}' is not defined");
            }
            text = substitution.text;
        }

        let balance = scan_balance(&text);
        if balance.open_quote.is_some() {
            diagnostics.record(
                Severity::Major,
                format!("unbalanced quote in '{text}'"),
                &source,
            );
        }
        if options.dialect == Dialect::Dispatcher {
            brace_depth += balance.brace_delta;
            if brace_depth < 0 {
                diagnostics.record(Severity::Major, "unexpected closing brace", &source);
                brace_depth = 0;
            }
        }

        lines.push(ConfigLine { text, source });
    }

    if let Some((joined, first)) = pending {
        let source = Source::new(file, first, included_from.map(Path::to_path_buf));
        tracing::warn!("{source}: line continuation at end of file");
        let trimmed = strip_comment(&joined, options.dialect).trim().to_string();
        if !trimmed.is_empty() {
            lines.push(ConfigLine {
                text: trimmed,
                source,
            });
        }
    }

    if brace_depth > 0 {
        diagnostics.record(
            Severity::Major,
            format!("{brace_depth} unclosed brace(s) in {}", file.display()),
            &last_source,
        );
    }

    lines
}

/// Remove a trailing comment. Dispatcher files allow `#` anywhere outside
/// quotes; httpd only treats whole lines starting with `#` as comments.
fn strip_comment(text: &str, dialect: Dialect) -> String {
    match dialect {
        Dialect::Httpd => {
            if text.trim_start().starts_with('#') {
                String::new()
            } else {
                text.to_string()
            }
        }
        Dialect::Dispatcher => {
            let mut quote: Option<char> = None;
            let mut escaped = false;
            for (idx, ch) in text.char_indices() {
                if escaped {
                    escaped = false;
                    continue;
                }
                match (quote, ch) {
                    (_, '\\') => escaped = true,
                    (Some(open), _) if ch == open => quote = None,
                    (Some(_), _) => {}
                    (None, '#') => return text[..idx].to_string(),
                    (None, _) if is_quote(ch) => quote = Some(ch),
                    (None, _) => {}
                }
            }
            text.to_string()
        }
    }
}

struct Balance {
    brace_delta: i64,
    open_quote: Option<char>,
}

fn scan_balance(text: &str) -> Balance {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut brace_delta = 0i64;
    for ch in text.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, ch) {
            (_, '\\') => escaped = true,
            (Some(open), _) if ch == open => quote = None,
            (Some(_), _) => {}
            (None, '{') => brace_delta += 1,
            (None, '}') => brace_delta -= 1,
            (None, _) if is_quote(ch) => quote = Some(ch),
            (None, _) => {}
        }
    }
    Balance {
        brace_delta,
        open_quote: quote,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::lines_from_str;
    use pretty_assertions::assert_eq;

    fn normalize(contents: &str, options: NormalizeOptions<'_>) -> (Vec<ConfigLine>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let lines = normalize_lines(
            Path::new("farm.any"),
            None,
            &lines_from_str(contents),
            options,
            &mut diagnostics,
        );
        (lines, diagnostics)
    }

    fn texts(lines: &[ConfigLine]) -> Vec<&str> {
        lines.iter().map(|line| line.text.as_str()).collect()
    }

    #[test]
    fn drops_comments_and_blank_lines() {
        let (lines, diagnostics) = normalize(
            "# header\n/farm {\n\n  /glob \"#not-a-comment\" # trailing\n}\n",
            NormalizeOptions::new(Dialect::Dispatcher),
        );
        assert_eq!(texts(&lines), vec!["/farm {", "/glob \"#not-a-comment\"", "}"]);
        assert_eq!(lines[1].source.line, 4);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn joins_continued_lines_under_the_first_line_number() {
        let (lines, _) = normalize(
            "RewriteCond %{HTTP_HOST} \\\n   ^example$\nListen 80\n",
            NormalizeOptions::new(Dialect::Httpd),
        );
        assert_eq!(
            texts(&lines),
            vec!["RewriteCond %{HTTP_HOST}    ^example$", "Listen 80"]
        );
        assert_eq!(lines[0].source.line, 1);
        assert_eq!(lines[1].source.line, 3);
    }

    #[test]
    fn httpd_keeps_hash_inside_directives() {
        let (lines, _) = normalize(
            "  # comment\nHeader set X-Anchor \"#top\"\n",
            NormalizeOptions::new(Dialect::Httpd),
        );
        assert_eq!(texts(&lines), vec!["Header set X-Anchor \"#top\""]);
    }

    #[test]
    fn substitutes_variables_when_an_environment_is_given() {
        let mut env = Environment::isolated();
        env.define("DOCROOT", "/var/www");
        let (lines, _) = normalize(
            "/docroot \"${DOCROOT}\"\n/statfile \"${UNSET}\"\n",
            NormalizeOptions::new(Dialect::Dispatcher).with_environment(&env),
        );
        assert_eq!(
            texts(&lines),
            vec!["/docroot \"/var/www\"", "/statfile \"${UNSET}\""]
        );
    }

    #[test]
    fn reports_unbalanced_braces_and_quotes() {
        let (_, diagnostics) = normalize(
            "/farm {\n  /docroot \"/var/www\n",
            NormalizeOptions::new(Dialect::Dispatcher),
        );
        let messages: Vec<_> = diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].starts_with("unbalanced quote"));
        assert!(messages[1].contains("1 unclosed brace(s)"));
    }

    #[test]
    fn braces_inside_quotes_do_not_count() {
        let (_, diagnostics) = normalize(
            "/farm {\n  /url \"/content/{x}\"\n}\n",
            NormalizeOptions::new(Dialect::Dispatcher),
        );
        assert!(diagnostics.is_empty());
    }
}
