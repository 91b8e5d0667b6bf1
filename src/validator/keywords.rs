/// Mutating or administrative verbs that may never appear outside literals.
pub const DENIED_KEYWORDS: &[&str] = &[
    "insert", "update", "delete", "drop", "alter", "system", "set", "kill", "outfile", "truncate",
    "optimize", "settings"
];

/// Prefixes of functions that read tables or dictionaries by name, e.g.
/// `joinGet('db.t', ...)` or `dictGet('dict', ...)`.
pub const DENIED_FUNCTION_PREFIXES: &[&str] = &["dict", "hascolumnintable", "joinget"];

/// Functions that may appear on the right of `IN` without naming a table.
pub const IN_VALUE_FUNCTIONS: &[&str] = &["array", "tuple"];

/// Functions whose argument list may contain an `IN` that is not a set
/// membership test, e.g. `position('a' IN name)`.
pub const IN_ARGUMENT_FUNCTIONS: &[&str] = &["locate", "position"];

/// Functions whose argument list may contain a `FROM` that is not a table
/// source, e.g. `extract(YEAR FROM d)` or `trim(BOTH ' ' FROM name)`.
pub const FROM_ARGUMENT_FUNCTIONS: &[&str] = &["extract", "trim", "substring", "substr", "overlay"];

/// Words that are never treated as a table alias or a bare column reference.
const SQL_KEYWORDS: &[&str] = &[
    "all", "and", "anti", "any", "array", "as", "asc", "asof", "between", "both", "by", "case",
    "cast", "cross", "cube", "current", "day", "desc", "distinct", "else", "end", "escape",
    "except", "exists", "false", "fetch", "filter", "final", "first", "following", "for",
    "format", "from", "full", "global", "group", "having", "hour", "ilike", "in", "inner",
    "intersect", "interval", "is", "join", "last", "leading", "left", "like", "limit", "minute",
    "month", "natural", "next", "not", "null", "nulls", "offset", "on", "only", "or", "order",
    "outer", "over", "partition", "paste", "preceding", "prewhere", "qualify", "quarter",
    "range", "right", "rollup", "row", "rows", "sample", "second", "select", "semi", "settings",
    "some", "then", "ties", "to", "top", "totals", "trailing", "true", "unbounded", "union",
    "using", "week", "when", "where", "window", "with", "year"
];

/// Whether `word` (already lowercased) is an SQL keyword or clause word.
pub fn is_keyword(word: &str) -> bool {
    SQL_KEYWORDS.binary_search(&word).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_table_is_sorted() {
        let mut sorted = SQL_KEYWORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, SQL_KEYWORDS);
    }

    #[test]
    fn test_is_keyword() {
        assert!(is_keyword("where"));
        assert!(is_keyword("prewhere"));
        assert!(!is_keyword("full_name"));
        assert!(!is_keyword("extract"));
    }
}
