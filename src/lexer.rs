//! Lexical normalization of candidate SQL.
//!
//! Every structural check runs on a *blinded* copy of the query in which the
//! contents of string literals are overwritten, so data values such as a
//! company called "Drop Table Inc" can never trigger keyword, table or column
//! matching. The executable copy keeps literal contents intact.
//!
//! Both copies come out of a single pass and always have the same byte
//! length: each byte of literal content becomes [`LITERAL_PLACEHOLDER`].
//! An offset found in the blinded text therefore addresses the same clause in
//! the executable text.
//!
//! Comments are removed from both copies. A comment can then neither hide a
//! denylisted keyword nor swallow clauses appended after the query. The
//! scanner follows ClickHouse quoting rules: backslash escapes and doubled
//! quotes inside strings and quoted identifiers, `--` and `#` line comments
//! and nested `/* */` block comments. Dollar-quoted heredocs are refused.
//!
//! # Example
//!
//! ```
//! use nlq_sql_gate::lexer::normalize;
//!
//! let normalized = normalize("SELECT name FROM ns.companies WHERE name = 'drop';").unwrap();
//!
//! assert_eq!(normalized.text, "SELECT name FROM ns.companies WHERE name = 'drop'");
//! assert_eq!(normalized.blinded, "SELECT name FROM ns.companies WHERE name = '????'");
//! ```

use crate::rejection::Rejection;

/// Byte written over every byte of string literal content.
pub const LITERAL_PLACEHOLDER: char = '?';

/// Executable and blinded forms of one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    /// Comments removed, terminators trimmed, literals intact
    pub text:    String,
    /// Same as `text` with literal contents replaced by placeholders
    pub blinded: String
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    Literal(char),
    QuotedIdent,
    LineComment,
    BlockComment(usize)
}

struct Scan {
    text:    String,
    blinded: String,
    state:   State,
    dollar:  bool
}

/// Normalize a raw candidate query.
///
/// # Errors
///
/// - [`Rejection::EmptyQuery`] when nothing but whitespace, comments and
///   terminators remain
/// - [`Rejection::NotSelect`] for unterminated literals or comments, for
///   `$` outside literals and for chained statements
pub fn normalize(raw: &str) -> Result<Normalized, Rejection> {
    if raw.trim().is_empty() {
        return Err(Rejection::EmptyQuery);
    }
    let scan = scan(raw);
    match scan.state {
        State::Literal(_) | State::QuotedIdent => {
            return Err(Rejection::not_select("unterminated quoted literal"));
        }
        State::BlockComment(_) => {
            return Err(Rejection::not_select("unterminated block comment"));
        }
        State::Code | State::LineComment => {}
    }
    if scan.dollar {
        return Err(Rejection::not_select("dollar-quoted strings are not allowed"));
    }
    let (start, end) = terminator_bounds(&scan.blinded);
    if start >= end {
        return Err(Rejection::EmptyQuery);
    }
    let text = scan.text[start..end].to_string();
    let blinded = scan.blinded[start..end].to_string();
    if blinded.contains(';') {
        return Err(Rejection::not_select("multiple statements are not allowed"));
    }
    Ok(Normalized {
        text,
        blinded
    })
}

/// Replace the contents of every quoted literal with placeholders.
///
/// Quote delimiters are kept and comments are dropped. An unterminated
/// literal is blinded up to the end of the input.
pub fn strip_literals(sql: &str) -> String {
    scan(sql).blinded
}

/// Remove trailing statement terminators and surrounding whitespace.
pub fn trim_terminators(sql: &str) -> &str {
    let (start, end) = terminator_bounds(sql);
    if start >= end { "" } else { &sql[start..end] }
}

fn terminator_bounds(sql: &str) -> (usize, usize) {
    let start = sql.len() - sql.trim_start().len();
    let mut rest = sql.trim_end();
    while let Some(stripped) = rest.strip_suffix(';') {
        rest = stripped.trim_end();
    }
    (start, rest.len())
}

fn scan(sql: &str) -> Scan {
    let mut out = Scan {
        text:    String::with_capacity(sql.len()),
        blinded: String::with_capacity(sql.len()),
        state:   State::Code,
        dollar:  false
    };
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        match out.state {
            State::Code => match c {
                '-' if chars.peek() == Some(&'-') => {
                    chars.next();
                    out.push_both(' ');
                    out.state = State::LineComment;
                }
                '#' => {
                    out.push_both(' ');
                    out.state = State::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    out.push_both(' ');
                    out.state = State::BlockComment(1);
                }
                '\'' | '"' => {
                    out.push_both(c);
                    out.state = State::Literal(c);
                }
                '`' => {
                    out.text.push('`');
                    out.blinded.push(' ');
                    out.state = State::QuotedIdent;
                }
                '$' => {
                    out.dollar = true;
                    out.push_both(c);
                }
                _ => out.push_both(c)
            },
            State::Literal(quote) => {
                if c == '\\' {
                    out.push_content(c);
                    if let Some(escaped) = chars.next() {
                        out.push_content(escaped);
                    }
                } else if c == quote {
                    if chars.peek() == Some(&quote) {
                        chars.next();
                        out.push_content(c);
                        out.push_content(c);
                    } else {
                        out.push_both(c);
                        out.state = State::Code;
                    }
                } else {
                    out.push_content(c);
                }
            }
            State::QuotedIdent => match c {
                '\\' => {
                    out.push_content(c);
                    if let Some(escaped) = chars.next() {
                        out.push_content(escaped);
                    }
                }
                '`' if chars.peek() == Some(&'`') => {
                    chars.next();
                    out.push_content(c);
                    out.push_content(c);
                }
                '`' => {
                    out.text.push('`');
                    out.blinded.push(' ');
                    out.state = State::Code;
                }
                _ => out.push_both(c)
            },
            State::LineComment => {
                if c == '\n' {
                    out.push_both('\n');
                    out.state = State::Code;
                }
            }
            State::BlockComment(depth) => {
                if c == '/' && chars.peek() == Some(&'*') {
                    chars.next();
                    out.state = State::BlockComment(depth + 1);
                } else if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    out.state = match depth {
                        1 => State::Code,
                        _ => State::BlockComment(depth - 1)
                    };
                }
            }
        }
    }
    out
}

impl Scan {
    fn push_both(&mut self, c: char) {
        self.text.push(c);
        self.blinded.push(c);
    }

    fn push_content(&mut self, c: char) {
        self.text.push(c);
        for _ in 0..c.len_utf8() {
            self.blinded.push(LITERAL_PLACEHOLDER);
        }
    }
}
