//! Token scanners over blinded, lowercased SQL.
//!
//! Each scanner is a small pure function returning a structured finding. The
//! input must come from [`crate::lexer`] and be ASCII-lowercased; literal
//! contents are placeholders and comments are gone, so every match here is
//! real SQL structure.

use std::sync::LazyLock;

use regex::Regex;

use super::keywords::{
    DENIED_FUNCTION_PREFIXES, DENIED_KEYWORDS, FROM_ARGUMENT_FUNCTIONS, IN_ARGUMENT_FUNCTIONS,
    is_keyword
};

static SELECT_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*select\b").expect("valid regex"));

static DENIED_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\b(?:{})\b", DENIED_KEYWORDS.join("|"))).expect("valid regex")
});

static FUNCTION_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([a-z_][a-z0-9_]*)\s*\(").expect("valid regex"));

static IN_OPERATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bin\b").expect("valid regex"));

static FROM_OR_JOIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:from|join)\b").expect("valid regex"));

/// `<left>.<right>` with optional whitespace around the dot.
static QUALIFIED_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([a-z_][a-z0-9_]*)\s*\.\s*([a-z_][a-z0-9_]*)\b").expect("valid regex")
});

static IDENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[a-z_][a-z0-9_]*\b").expect("valid regex"));

static IDENT_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_]*").expect("valid regex"));

/// What follows a `FROM`, `JOIN` or a comma inside a FROM list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// `( ... )`
    Subquery,
    /// `<namespace>.<table>`
    Qualified { namespace: String, table: String },
    /// Table function such as `file(...)` or `url(...)`
    Function { name: String },
    /// Unqualified table name
    Bare { name: String },
    /// Anything the scanner cannot classify, e.g. a double-quoted name
    Other { snippet: String }
}

/// One table source with its optional alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSource {
    pub kind:  SourceKind,
    pub alias: Option<String>
}

impl TableSource {
    /// Short, user-facing rendering used in rejection messages.
    pub fn describe(&self) -> String {
        match &self.kind {
            SourceKind::Subquery => String::from("(subquery)"),
            SourceKind::Qualified {
                namespace,
                table
            } => format!("{}.{}", namespace, table),
            SourceKind::Function {
                name
            } => format!("{}(...)", name),
            SourceKind::Bare {
                name
            } => name.clone(),
            SourceKind::Other {
                snippet
            } => snippet.clone()
        }
    }
}

/// A `<left>.<right>` token pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualifiedRef<'a> {
    pub left:  &'a str,
    pub right: &'a str
}

/// Whether the statement opens with `SELECT`.
pub fn starts_with_select(text: &str) -> bool {
    SELECT_START.is_match(text)
}

/// First denylisted keyword appearing as a whole word.
pub fn find_denied_keyword(text: &str) -> Option<&str> {
    DENIED_REGEX.find(text).map(|m| m.as_str())
}

/// First call of a function that reads a table or dictionary by name.
pub fn find_denied_function(text: &str) -> Option<&str> {
    FUNCTION_CALL
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .filter(|name| previous_non_ws(text, name.start()) != Some(b'.'))
        .map(|name| name.as_str())
        .find(|name| {
            DENIED_FUNCTION_PREFIXES
                .iter()
                .any(|prefix| name.starts_with(prefix))
        })
}

/// Right-hand operands of `IN`, parsed like table sources.
///
/// ClickHouse accepts a table name there (`x IN db.t`), so the operand is
/// subject to the same namespace rule as a `FROM` source. `IN` inside
/// `position(...)` is a substring search and is skipped.
pub fn in_operands(text: &str) -> Vec<TableSource> {
    IN_OPERATOR
        .find_iter(text)
        .filter(|m| !inside_call_of(text, m.start(), IN_ARGUMENT_FUNCTIONS))
        .map(|m| parse_source(text, m.end()).0)
        .collect()
}

/// Every table source introduced by `FROM`, `JOIN` or a FROM-list comma.
///
/// `FROM` inside argument lists of [`FROM_ARGUMENT_FUNCTIONS`] and the
/// ClickHouse `ARRAY JOIN` clause do not introduce table sources.
pub fn table_sources(text: &str) -> Vec<TableSource> {
    let mut sources = Vec::new();
    for m in FROM_OR_JOIN.find_iter(text) {
        if m.as_str() == "join" && previous_word(text, m.start()) == Some("array") {
            continue;
        }
        if m.as_str() == "from" && inside_call_of(text, m.start(), FROM_ARGUMENT_FUNCTIONS) {
            continue;
        }
        let mut pos = m.end();
        loop {
            let (source, next) = parse_source(text, pos);
            let is_other = matches!(source.kind, SourceKind::Other { .. });
            sources.push(source);
            if is_other {
                break;
            }
            let after = skip_ws(text, next);
            if text.as_bytes().get(after) == Some(&b',') {
                pos = after + 1;
            } else {
                break;
            }
        }
    }
    sources
}

/// All `<left>.<right>` pairs, overlapping, so `ns.t.col` yields both
/// `ns.t` and `t.col`.
pub fn qualified_refs(text: &str) -> Vec<QualifiedRef<'_>> {
    let mut refs = Vec::new();
    let mut pos = 0;
    while let Some(caps) = QUALIFIED_REGEX.captures_at(text, pos) {
        let (Some(left), Some(right)) = (caps.get(1), caps.get(2)) else {
            break;
        };
        refs.push(QualifiedRef {
            left:  left.as_str(),
            right: right.as_str()
        });
        pos = right.start();
    }
    refs
}

/// Identifier tokens that are not the right-hand side of a dotted pair.
pub fn bare_identifiers(text: &str) -> Vec<&str> {
    IDENT_REGEX
        .find_iter(text)
        .filter(|m| previous_non_ws(text, m.start()) != Some(b'.'))
        .map(|m| m.as_str())
        .collect()
}

fn parse_source(text: &str, pos: usize) -> (TableSource, usize) {
    let start = skip_ws(text, pos);
    let bytes = text.as_bytes();
    if bytes.get(start) == Some(&b'(') {
        let end = matching_paren(text, start);
        return with_alias(text, SourceKind::Subquery, end);
    }
    let Some(first) = ident_at(text, start) else {
        let snippet: String = text[start..]
            .chars()
            .take_while(|c| !c.is_whitespace())
            .take(32)
            .collect();
        let source = TableSource {
            kind:  SourceKind::Other {
                snippet
            },
            alias: None
        };
        return (source, start);
    };
    let after_first = start + first.len();
    let next = skip_ws(text, after_first);
    match bytes.get(next) {
        Some(b'.') => {
            let table_pos = skip_ws(text, next + 1);
            match ident_at(text, table_pos) {
                Some(table) => with_alias(
                    text,
                    SourceKind::Qualified {
                        namespace: first.to_string(),
                        table:     table.to_string()
                    },
                    table_pos + table.len()
                ),
                None => {
                    let source = TableSource {
                        kind:  SourceKind::Other {
                            snippet: format!("{}.", first)
                        },
                        alias: None
                    };
                    (source, next + 1)
                }
            }
        }
        Some(b'(') => {
            let end = matching_paren(text, next);
            with_alias(
                text,
                SourceKind::Function {
                    name: first.to_string()
                },
                end
            )
        }
        _ => with_alias(
            text,
            SourceKind::Bare {
                name: first.to_string()
            },
            after_first
        )
    }
}

fn with_alias(text: &str, kind: SourceKind, pos: usize) -> (TableSource, usize) {
    let mut end = pos;
    let mut alias = None;
    let word_pos = skip_ws(text, pos);
    if let Some(word) = ident_at(text, word_pos) {
        if word == "as" {
            let alias_pos = skip_ws(text, word_pos + word.len());
            if let Some(name) = ident_at(text, alias_pos) {
                alias = Some(name.to_string());
                end = alias_pos + name.len();
            }
        } else if !is_keyword(word) {
            alias = Some(word.to_string());
            end = word_pos + word.len();
        }
    }
    let final_pos = skip_ws(text, end);
    if ident_at(text, final_pos) == Some("final") {
        end = final_pos + "final".len();
    }
    (
        TableSource {
            kind,
            alias
        },
        end
    )
}

/// Whether the keyword at `at` sits directly inside the argument list of one
/// of `functions`, such as `extract(...)`.
fn inside_call_of(text: &str, at: usize, functions: &[&str]) -> bool {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    for idx in (0..at).rev() {
        match bytes[idx] {
            b')' => depth += 1,
            b'(' if depth == 0 => {
                return previous_word(text, idx)
                    .is_some_and(|word| functions.contains(&word));
            }
            b'(' => depth -= 1,
            _ => {}
        }
    }
    false
}

/// Index just past the parenthesis closing the one at `open`, or the end of
/// the text when it is never closed.
fn matching_paren(text: &str, open: usize) -> usize {
    let mut depth = 0usize;
    for (idx, byte) in text.bytes().enumerate().skip(open) {
        match byte {
            b'(' => depth += 1,
            b')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return idx + 1;
                }
            }
            _ => {}
        }
    }
    text.len()
}

/// Parenthesis nesting depth at byte offset `at`.
pub fn depth_at(text: &str, at: usize) -> usize {
    text.bytes().take(at).fold(0usize, |depth, byte| match byte {
        b'(' => depth + 1,
        b')' => depth.saturating_sub(1),
        _ => depth
    })
}

fn ident_at(text: &str, pos: usize) -> Option<&str> {
    text.get(pos..)
        .and_then(|rest| IDENT_PREFIX.find(rest))
        .map(|m| m.as_str())
}

fn skip_ws(text: &str, pos: usize) -> usize {
    let bytes = text.as_bytes();
    let mut idx = pos;
    while idx < bytes.len() && bytes[idx].is_ascii_whitespace() {
        idx += 1;
    }
    idx
}

fn previous_non_ws(text: &str, at: usize) -> Option<u8> {
    text.as_bytes()[..at]
        .iter()
        .rev()
        .find(|b| !b.is_ascii_whitespace())
        .copied()
}

fn previous_word(text: &str, at: usize) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut end = at;
    while end > 0 && bytes[end - 1].is_ascii_whitespace() {
        end -= 1;
    }
    let mut start = end;
    while start > 0 && (bytes[start - 1].is_ascii_alphanumeric() || bytes[start - 1] == b'_') {
        start -= 1;
    }
    (start < end).then(|| &text[start..end])
}
