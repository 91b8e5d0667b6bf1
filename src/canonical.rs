//! Row-limit and output-format canonicalization.
//!
//! Runs after validation has passed and rewrites the *executable* text, so
//! literal contents reach the backend untouched. Clauses are located in the
//! blinded twin produced by [`crate::lexer`]; `LIMIT` or `FORMAT` written
//! inside a string literal is never rewritten.
//!
//! The result always ends with `LIMIT <n> FORMAT JSONEachRow` where `n` is at
//! most the configured maximum. Canonicalizing a canonical query returns it
//! unchanged.
//!
//! A limit count is kept only when it is a plain integer (or the
//! `offset, count` pair); any other expression is replaced by the maximum.
//! ClickHouse binds `LIMIT` to a single branch of `UNION`, `EXCEPT` or
//! `INTERSECT`, so a statement with a top-level set operation is wrapped in
//! `SELECT * FROM (...)` before the result limit is applied.
//!
//! # Example
//!
//! ```
//! use nlq_sql_gate::canonical::canonicalize;
//!
//! assert_eq!(
//!     canonicalize("SELECT 1 LIMIT 500", 50).unwrap(),
//!     "SELECT 1 LIMIT 50 FORMAT JSONEachRow"
//! );
//! assert_eq!(
//!     canonicalize("SELECT 1 FORMAT TSV", 50).unwrap(),
//!     "SELECT 1 LIMIT 50 FORMAT JSONEachRow"
//! );
//! ```

use std::{fmt, sync::LazyLock};

use compact_str::CompactString;
use regex::Regex;
use serde::Serialize;

use crate::{
    lexer::{Normalized, normalize},
    rejection::Rejection,
    validator::scan::depth_at
};

/// Output format directive the backend response decoder expects.
pub const OUTPUT_FORMAT: &str = "JSONEachRow";

static LIMIT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\blimit\b").expect("valid regex"));

static SET_OPERATION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:union|except|intersect)\b").expect("valid regex"));

/// Words that end a limit expression at its own nesting level.
const LIMIT_BOUNDARIES: &[&str] = &[
    "by", "except", "format", "intersect", "limit", "offset", "settings", "union", "with"
];

/// Trailing `FORMAT <name>`.
static FORMAT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+format\s+\w+\s*$").expect("valid regex"));

/// A validated query ready to be sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalQuery {
    sql:    String,
    tables: Vec<CompactString>
}

impl CanonicalQuery {
    pub fn new(sql: String, tables: Vec<CompactString>) -> Self {
        Self {
            sql,
            tables
        }
    }

    pub fn as_str(&self) -> &str {
        &self.sql
    }

    /// Tables the query references, in order of first appearance
    pub fn tables(&self) -> &[CompactString] {
        &self.tables
    }

    pub fn into_string(self) -> String {
        self.sql
    }
}

impl fmt::Display for CanonicalQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Applies the row limit and output format rewrites.
#[derive(Debug, Clone, Copy)]
pub struct Canonicalizer {
    max_limit: u64
}

impl Canonicalizer {
    pub fn new(max_limit: u64) -> Self {
        Self {
            max_limit
        }
    }

    /// Rewrite a normalized statement.
    pub fn apply(&self, normalized: &Normalized) -> String {
        let (text, blinded) = strip_format(&normalized.text, &normalized.blinded);
        let (rewritten, rewritten_blinded, result_limit) = self.rewrite_limits(text, blinded);
        let mut sql = if has_set_operation(&rewritten_blinded) {
            format!("SELECT * FROM ({}) LIMIT {}", rewritten, self.max_limit)
        } else if result_limit {
            rewritten
        } else {
            format!("{} LIMIT {}", rewritten, self.max_limit)
        };
        sql.push_str(" FORMAT ");
        sql.push_str(OUTPUT_FORMAT);
        sql
    }

    /// Cap every `LIMIT` clause; returns the rewritten text, its blinded twin
    /// and whether a top-level result limit is present.
    fn rewrite_limits(&self, text: &str, blinded: &str) -> (String, String, bool) {
        let mut out = String::with_capacity(text.len() + 32);
        let mut out_blinded = String::with_capacity(blinded.len() + 32);
        let mut last = 0;
        let mut result_limit = false;
        for keyword in LIMIT_REGEX.find_iter(blinded) {
            if keyword.start() < last || blinded[..keyword.start()].trim_end().ends_with('.') {
                continue;
            }
            let clause = limit_clause_at(blinded, keyword.end());
            if !clause.limit_by && depth_at(blinded, keyword.start()) == 0 {
                result_limit = true;
            }
            let replacement = self.limit_clause(clause.expression);
            out.push_str(&text[last..keyword.start()]);
            out.push_str(&replacement);
            out_blinded.push_str(&blinded[last..keyword.start()]);
            out_blinded.push_str(&replacement);
            last = clause.end;
        }
        out.push_str(&text[last..]);
        out_blinded.push_str(&blinded[last..]);
        (out, out_blinded, result_limit)
    }

    fn limit_clause(&self, expression: &str) -> String {
        if let Some(count) = parse_count(expression) {
            return format!("LIMIT {}", count.min(self.max_limit));
        }
        match expression.split_once(',') {
            Some((offset, count)) => match (parse_count(offset), parse_count(count)) {
                (Some(offset), Some(count)) => {
                    format!("LIMIT {}, {}", offset, count.min(self.max_limit))
                }
                _ => format!("LIMIT {}", self.max_limit)
            },
            None => format!("LIMIT {}", self.max_limit)
        }
    }
}

/// Extent of one limit expression in blinded text.
struct LimitClause<'a> {
    /// Trimmed expression between `LIMIT` and its boundary
    expression: &'a str,
    /// Offset just past the replaced part of the clause
    end:        usize,
    limit_by:   bool
}

/// Scan the expression following a `LIMIT` keyword that ends at `start`.
///
/// The expression runs until a boundary word or a closing parenthesis at its
/// own nesting level, or the end of the text. A trailing `WITH TIES` is
/// dropped together with the clause.
fn limit_clause_at(blinded: &str, start: usize) -> LimitClause<'_> {
    let bytes = blinded.as_bytes();
    let mut depth = 0usize;
    let mut idx = start;
    let mut boundary = None;
    while idx < bytes.len() {
        match bytes[idx] {
            b'(' => depth += 1,
            b')' if depth == 0 => break,
            b')' => depth -= 1,
            byte if depth == 0 && is_word_start(bytes, idx, byte) => {
                let word = word_at(blinded, idx);
                if LIMIT_BOUNDARIES.contains(&word.to_ascii_lowercase().as_str()) {
                    boundary = Some(word);
                    break;
                }
                idx += word.len();
                continue;
            }
            _ => {}
        }
        idx += 1;
    }
    let raw = &blinded[start..idx];
    let expression = raw.trim();
    let mut end = start + raw.trim_end().len();
    let limit_by = boundary.is_some_and(|word| word.eq_ignore_ascii_case("by"));
    if boundary.is_some_and(|word| word.eq_ignore_ascii_case("with")) {
        let rest = &blinded[idx + "with".len()..];
        let ties_at = blinded.len() - rest.trim_start().len();
        if word_at(blinded, ties_at).eq_ignore_ascii_case("ties") {
            end = ties_at + "ties".len();
        }
    }
    LimitClause {
        expression,
        end,
        limit_by
    }
}

fn is_word_start(bytes: &[u8], idx: usize, byte: u8) -> bool {
    (byte.is_ascii_alphabetic() || byte == b'_')
        && (idx == 0 || !(bytes[idx - 1].is_ascii_alphanumeric() || bytes[idx - 1] == b'_'))
}

fn word_at(text: &str, idx: usize) -> &str {
    let len = text.as_bytes()[idx..]
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
        .count();
    &text[idx..idx + len]
}

fn has_set_operation(blinded: &str) -> bool {
    SET_OPERATION_REGEX
        .find_iter(blinded)
        .any(|m| depth_at(blinded, m.start()) == 0)
}

/// Normalize and canonicalize raw SQL without validating it.
pub fn canonicalize(sql: &str, max_limit: u64) -> Result<String, Rejection> {
    let normalized = normalize(sql)?;
    Ok(Canonicalizer::new(max_limit).apply(&normalized))
}

fn strip_format<'a>(text: &'a str, blinded: &'a str) -> (&'a str, &'a str) {
    match FORMAT_REGEX.find(blinded) {
        Some(m) => (&text[..m.start()], &blinded[..m.start()]),
        None => (text, blinded)
    }
}

/// Plain unsigned integer; values beyond `u64` saturate.
fn parse_count(token: &str) -> Option<u64> {
    let token = token.trim();
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(token.parse().unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canon(sql: &str) -> String {
        canonicalize(sql, 50).unwrap()
    }

    #[test]
    fn test_limit_within_max_preserved() {
        assert_eq!(canon("SELECT 1 LIMIT 5"), "SELECT 1 LIMIT 5 FORMAT JSONEachRow");
    }

    #[test]
    fn test_limit_above_max_capped() {
        assert_eq!(canon("SELECT 1 limit 500"), "SELECT 1 LIMIT 50 FORMAT JSONEachRow");
    }

    #[test]
    fn test_missing_limit_appended() {
        assert_eq!(canon("SELECT 1"), "SELECT 1 LIMIT 50 FORMAT JSONEachRow");
    }

    #[test]
    fn test_non_integer_limit_replaced() {
        assert_eq!(canon("SELECT 1 LIMIT 1e9"), "SELECT 1 LIMIT 50 FORMAT JSONEachRow");
        assert_eq!(canon("SELECT 1 LIMIT -1"), "SELECT 1 LIMIT 50 FORMAT JSONEachRow");
    }

    #[test]
    fn test_huge_limit_saturates() {
        assert_eq!(
            canon("SELECT 1 LIMIT 999999999999999999999999"),
            "SELECT 1 LIMIT 50 FORMAT JSONEachRow"
        );
    }

    #[test]
    fn test_offset_count_form() {
        assert_eq!(canon("SELECT 1 LIMIT 10, 900"), "SELECT 1 LIMIT 10, 50 FORMAT JSONEachRow");
    }

    #[test]
    fn test_limit_offset_keyword_untouched() {
        assert_eq!(
            canon("SELECT 1 LIMIT 20 OFFSET 40"),
            "SELECT 1 LIMIT 20 OFFSET 40 FORMAT JSONEachRow"
        );
    }

    #[test]
    fn test_existing_format_replaced() {
        assert_eq!(
            canon("SELECT 1 LIMIT 3\nFORMAT Pretty"),
            "SELECT 1 LIMIT 3 FORMAT JSONEachRow"
        );
    }

    #[test]
    fn test_limit_inside_literal_untouched() {
        assert_eq!(
            canon("SELECT 'LIMIT 500' AS x"),
            "SELECT 'LIMIT 500' AS x LIMIT 50 FORMAT JSONEachRow"
        );
    }

    #[test]
    fn test_subquery_limit_does_not_bound_outer_query() {
        assert_eq!(
            canon("SELECT x FROM (SELECT x FROM ns.t LIMIT 900)"),
            "SELECT x FROM (SELECT x FROM ns.t LIMIT 50) LIMIT 50 FORMAT JSONEachRow"
        );
    }

    #[test]
    fn test_limit_by_does_not_bound_result() {
        assert_eq!(
            canon("SELECT a, b FROM ns.t LIMIT 2 BY a"),
            "SELECT a, b FROM ns.t LIMIT 2 BY a LIMIT 50 FORMAT JSONEachRow"
        );
    }

    #[test]
    fn test_comment_cannot_swallow_appended_clauses() {
        assert_eq!(canon("SELECT 1 -- trailing"), "SELECT 1 LIMIT 50 FORMAT JSONEachRow");
    }

    #[test]
    fn test_idempotent() {
        let once = canon("SELECT name FROM ns.companies WHERE name = 'a' LIMIT 10");
        assert_eq!(canon(&once), once);
    }

    #[test]
    fn test_limit_expression_replaced_whole() {
        assert_eq!(
            canon("SELECT name FROM ns.companies LIMIT 1 * 100000"),
            "SELECT name FROM ns.companies LIMIT 50 FORMAT JSONEachRow"
        );
        assert_eq!(
            canon("SELECT name FROM ns.companies LIMIT (500)"),
            "SELECT name FROM ns.companies LIMIT 50 FORMAT JSONEachRow"
        );
        assert_eq!(canon("SELECT 1 LIMIT 2 + 3, 900"), "SELECT 1 LIMIT 50 FORMAT JSONEachRow");
    }

    #[test]
    fn test_subquery_limit_expression_stops_at_paren() {
        assert_eq!(
            canon("SELECT x FROM (SELECT x FROM ns.t LIMIT 10 * 10) LIMIT 3"),
            "SELECT x FROM (SELECT x FROM ns.t LIMIT 50) LIMIT 3 FORMAT JSONEachRow"
        );
    }

    #[test]
    fn test_with_ties_dropped() {
        assert_eq!(
            canon("SELECT a FROM ns.t ORDER BY a LIMIT 5 WITH TIES"),
            "SELECT a FROM ns.t ORDER BY a LIMIT 5 FORMAT JSONEachRow"
        );
    }

    #[test]
    fn test_union_wrapped_under_result_limit() {
        assert_eq!(
            canon("SELECT name FROM ns.companies LIMIT 5 UNION ALL SELECT name FROM ns.companies"),
            "SELECT * FROM (SELECT name FROM ns.companies LIMIT 5 UNION ALL SELECT name FROM \
             ns.companies) LIMIT 50 FORMAT JSONEachRow"
        );
        let wrapped = canon("SELECT a FROM ns.t EXCEPT SELECT a FROM ns.u LIMIT 900");
        assert!(wrapped.starts_with("SELECT * FROM (SELECT a FROM ns.t EXCEPT"));
        assert!(wrapped.ends_with("LIMIT 50) LIMIT 50 FORMAT JSONEachRow"));
        assert_eq!(canon(&wrapped), wrapped);
    }

    #[test]
    fn test_union_inside_subquery_not_wrapped() {
        assert_eq!(
            canon("SELECT a FROM (SELECT a FROM ns.t UNION ALL SELECT a FROM ns.u)"),
            "SELECT a FROM (SELECT a FROM ns.t UNION ALL SELECT a FROM ns.u) LIMIT 50 FORMAT \
             JSONEachRow"
        );
    }
}
