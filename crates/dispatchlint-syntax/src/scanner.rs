//! Character-level token scanner for a single logical line.

/// Grammar a scanner tokenises for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Dialect {
    /// Brace-delimited farm files: `/`, `{`, `}` and quotes start new tokens.
    Dispatcher,
    /// Apache-style directives: only whitespace separates tokens.
    Httpd,
}

/// Cursor over one in-memory line producing raw string tokens.
#[derive(Clone, Debug)]
pub struct Scanner<'a> {
    input: &'a str,
    position: usize,
    dialect: Dialect,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a str, dialect: Dialect) -> Self {
        Self::at(input, 0, dialect)
    }

    /// Resume scanning `input` at byte offset `position`.
    pub fn at(input: &'a str, position: usize, dialect: Dialect) -> Self {
        Scanner {
            input,
            position: position.min(input.len()),
            dialect,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// True iff a non-whitespace character remains ahead of the cursor.
    pub fn has_next(&self) -> bool {
        self.remaining().chars().any(|ch| !ch.is_whitespace())
    }

    /// Return the next token, or `None` once only whitespace is left.
    pub fn next_token(&mut self, preserve_quotes: bool) -> Option<String> {
        self.skip_whitespace();
        let first = self.remaining().chars().next()?;
        let start = self.position;

        if is_quote(first) {
            let token = self.quoted(first);
            return Some(if preserve_quotes {
                token
            } else {
                strip_quotes(&token).to_string()
            });
        }

        self.position += first.len_utf8();
        if self.dialect == Dialect::Dispatcher && matches!(first, '{' | '}') {
            return Some(first.to_string());
        }

        while let Some(ch) = self.remaining().chars().next() {
            if ch.is_whitespace() || (self.dialect == Dialect::Dispatcher && is_boundary(ch)) {
                break;
            }
            self.position += ch.len_utf8();
        }

        Some(self.input[start..self.position].to_string())
    }

    /// Consume the run of non-whitespace characters directly at the cursor.
    pub fn take_word(&mut self) -> &'a str {
        let start = self.position;
        while let Some(ch) = self.remaining().chars().next() {
            if ch.is_whitespace() {
                break;
            }
            self.position += ch.len_utf8();
        }
        &self.input[start..self.position]
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.position..]
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.remaining().chars().next() {
            if !ch.is_whitespace() {
                break;
            }
            self.position += ch.len_utf8();
        }
    }

    fn quoted(&mut self, quote: char) -> String {
        let start = self.position;
        let content_start = start + quote.len_utf8();
        let mut escaped = false;

        for (offset, ch) in self.input[content_start..].char_indices() {
            if escaped {
                escaped = false;
                continue;
            }
            if ch == '\\' {
                escaped = true;
                continue;
            }
            if ch == quote {
                self.position = content_start + offset + ch.len_utf8();
                return self.input[start..self.position].to_string();
            }
        }

        tracing::warn!(
            "unterminated {quote} quote in '{}', using the rest of the line",
            self.input.trim()
        );
        self.position = self.input.len();
        let mut token = self.input[start..].to_string();
        token.push(quote);
        token
    }
}

pub fn is_quote(ch: char) -> bool {
    ch == '"' || ch == '\''
}

fn is_boundary(ch: char) -> bool {
    matches!(ch, '/' | '{' | '}' | '"' | '\'')
}

/// Strip one leading and one trailing quote when both are present and match.
pub fn strip_quotes(token: &str) -> &str {
    let mut chars = token.chars();
    match (chars.next(), chars.next_back()) {
        (Some(first), Some(last)) if is_quote(first) && first == last => {
            &token[first.len_utf8()..token.len() - last.len_utf8()]
        }
        _ => token,
    }
}

/// True when the token is delimited by a matching pair of quotes.
pub fn is_quoted(token: &str) -> bool {
    strip_quotes(token).len() != token.len()
}
