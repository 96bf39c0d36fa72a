//! Stateful token cursor over normalised dispatcher lines.

use dispatchlint_config::Severity;
use dispatchlint_syntax::{
    is_quoted, strip_quotes, ConfigLine, Dialect, Diagnostics, Scanner, Source, Value,
};

/// Position of the reader: line index and byte column within that line.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Cursor {
    pub line: usize,
    pub column: usize,
}

/// A raw token and the source of the line it was read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub source: Source,
}

impl Token {
    pub fn is(&self, literal: &str) -> bool {
        self.text == literal
    }

    /// True for an unquoted `/name` token.
    pub fn is_name(&self) -> bool {
        self.text.starts_with('/')
    }
}

/// `"1"` and `"true"` are the only true literals.
pub fn parse_boolean(literal: &str) -> bool {
    literal == "1" || literal == "true"
}

pub struct ConfigurationReader<'d> {
    lines: Vec<ConfigLine>,
    cursor: Cursor,
    diagnostics: &'d mut Diagnostics,
}

impl<'d> ConfigurationReader<'d> {
    pub fn new(lines: Vec<ConfigLine>, diagnostics: &'d mut Diagnostics) -> Self {
        ConfigurationReader {
            lines,
            cursor: Cursor::default(),
            diagnostics,
        }
    }

    pub fn mark(&self) -> Cursor {
        self.cursor
    }

    pub fn reset(&mut self, cursor: Cursor) {
        self.cursor = cursor;
    }

    pub fn diagnostics(&mut self) -> &mut Diagnostics {
        self.diagnostics
    }

    pub fn record(&mut self, severity: Severity, message: impl Into<String>, source: &Source) {
        self.diagnostics.record(severity, message, source);
    }

    /// Source of the line under the cursor, or of the last line at the end.
    pub fn current_source(&self) -> Source {
        self.lines
            .get(self.cursor.line)
            .or_else(|| self.lines.last())
            .map(|line| line.source.clone())
            .unwrap_or_else(Source::builtin)
    }

    pub fn has_next(&self) -> bool {
        let mut ahead = self.cursor;
        while let Some(line) = self.lines.get(ahead.line) {
            if Scanner::at(&line.text, ahead.column, Dialect::Dispatcher).has_next() {
                return true;
            }
            ahead = Cursor {
                line: ahead.line + 1,
                column: 0,
            };
        }
        false
    }

    /// Next raw token. A token never spans lines; an unquoted `#` ends the
    /// line it appears on.
    pub fn next(&mut self, preserve_quotes: bool) -> Option<Token> {
        loop {
            let line = self.lines.get(self.cursor.line)?;
            let mut scanner = Scanner::at(&line.text, self.cursor.column, Dialect::Dispatcher);
            let Some(raw) = scanner.next_token(true) else {
                self.next_line();
                continue;
            };

            if !is_quoted(&raw) {
                if let Some(hash) = raw.find('#') {
                    let source = line.source.clone();
                    self.next_line();
                    if hash == 0 {
                        continue;
                    }
                    return Some(Token {
                        text: raw[..hash].to_string(),
                        source,
                    });
                }
            }

            let source = line.source.clone();
            self.cursor.column = scanner.position();
            let text = if preserve_quotes {
                raw
            } else {
                strip_quotes(&raw).to_string()
            };
            return Some(Token { text, source });
        }
    }

    /// Look at the next token without consuming it.
    pub fn peek(&mut self) -> Option<Token> {
        let mark = self.mark();
        let token = self.next(true);
        self.reset(mark);
        token
    }

    pub fn next_boolean(&mut self) -> Option<Value<bool>> {
        self.next(false)
            .map(|token| Value::new(parse_boolean(&token.text), token.source))
    }

    /// Parse a base-10 integer, recording a MAJOR diagnostic and falling
    /// back to `default` when the literal is not a number.
    pub fn next_integer(&mut self, default: i64) -> Value<i64> {
        let Some(token) = self.next(false) else {
            let source = self.current_source();
            self.record(Severity::Major, "expected an integer, found end of input", &source);
            return Value::new(default, source);
        };
        match token.text.trim().parse::<i64>() {
            Ok(number) => Value::new(number, token.source),
            Err(_) => {
                self.record(
                    Severity::Major,
                    format!("expected an integer, found '{}'", token.text),
                    &token.source,
                );
                Value::new(default, token.source)
            }
        }
    }

    /// Like [`next`](Self::next) with one leading `/` removed.
    pub fn next_name(&mut self) -> Option<Value<String>> {
        self.next(false).map(|token| {
            let name = token.text.strip_prefix('/').unwrap_or(&token.text).to_string();
            Value::new(name, token.source)
        })
    }

    /// A quoted literal, or a bare word extended to the next whitespace on
    /// the same line so unquoted globs such as `/content/*.html` stay whole.
    pub fn next_string(&mut self) -> Option<Value<String>> {
        let token = self.next(true)?;
        if is_quoted(&token.text) {
            let text = strip_quotes(&token.text).to_string();
            return Some(Value::new(text, token.source));
        }

        // A token cut at `#` has already moved the cursor to the next line.
        let mut text = token.text;
        let same_line = self.cursor.column > 0;
        if same_line && !matches!(text.as_str(), "{" | "}") {
            if let Some(line) = self.lines.get(self.cursor.line) {
                let mut scanner = Scanner::at(&line.text, self.cursor.column, Dialect::Dispatcher);
                text.push_str(scanner.take_word());
                self.cursor.column = scanner.position();
            }
        }
        Some(Value::new(text, token.source))
    }

    /// Read a `{ a b c }` list.
    ///
    /// A missing `{` is tolerated: the token read instead becomes the only
    /// element and reading continues. The list ends at the balancing `}` or
    /// before a bare `/name` token.
    pub fn next_string_list(&mut self) -> Value<Vec<String>> {
        let start = self.mark();
        let Some(first) = self.next(true) else {
            let source = self.current_source();
            self.record(Severity::Minor, "expected a list, found end of input", &source);
            return Value::new(Vec::new(), source);
        };

        let source = first.source.clone();
        let mut items = Vec::new();
        let braced = first.is("{");
        if !braced {
            self.record(
                Severity::Minor,
                format!("expected '{{' to open a list, found '{}'", first.text),
                &first.source,
            );
            if first.is("}") {
                self.reset(start);
                return Value::new(items, source);
            }
            items.push(strip_quotes(&first.text).to_string());
        }

        let mut depth = 1usize;
        loop {
            let mark = self.mark();
            let Some(token) = self.next(true) else {
                if braced {
                    self.record(Severity::Major, "unterminated list", &source);
                }
                break;
            };
            if token.is("{") {
                depth += 1;
                continue;
            }
            if token.is("}") {
                if !braced && depth == 1 {
                    self.reset(mark);
                    break;
                }
                depth -= 1;
                if depth == 0 {
                    break;
                }
                continue;
            }
            if token.is_name() {
                self.reset(mark);
                break;
            }
            items.push(strip_quotes(&token.text).to_string());
        }
        Value::new(items, source)
    }

    /// Skip a balanced `{ ... }` region if one starts at the cursor.
    ///
    /// An unterminated region leaves the cursor just past its `{`.
    pub fn advance_past_this_element(&mut self) {
        match self.peek() {
            Some(token) if token.is("{") => {}
            _ => return,
        }
        let open = self.next(true);
        let after_open = self.mark();

        let mut depth = 1usize;
        while let Some(token) = self.next(true) {
            if token.is("{") {
                depth += 1;
            } else if token.is("}") {
                depth -= 1;
                if depth == 0 {
                    return;
                }
            }
        }

        let source = open.map(|token| token.source).unwrap_or_else(Source::builtin);
        tracing::error!("{source}: unterminated block, resuming after its opening brace");
        self.record(Severity::Major, "unterminated block", &source);
        self.reset(after_open);
    }

    fn next_line(&mut self) {
        self.cursor = Cursor {
            line: self.cursor.line + 1,
            column: 0,
        };
    }
}
