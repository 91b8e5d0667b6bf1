use colored::Colorize;
use serde::Serialize;

use crate::{
    backend::Row, canonical::CanonicalQuery, rejection::Rejection, schema::SchemaAllowlist
};

/// Output format for results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml
}

/// Output options
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format:  OutputFormat,
    pub colored: bool
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            format:  OutputFormat::Text,
            colored: true
        }
    }
}

/// Accepted query for serialization
#[derive(Debug, Serialize)]
struct Accepted<'a> {
    status: &'static str,
    sql:    &'a str,
    tables: Vec<&'a str>
}

/// Rejected query for serialization
#[derive(Debug, Serialize)]
struct Rejected<'a> {
    status:    &'static str,
    #[serde(flatten)]
    rejection: &'a Rejection,
    message:   String
}

fn serialize<T: Serialize>(value: &T, format: OutputFormat) -> String {
    match format {
        OutputFormat::Yaml => serde_yaml::to_string(value).unwrap_or_default(),
        _ => serde_json::to_string_pretty(value).unwrap_or_default()
    }
}

fn paint(text: &str, opts: &OutputOptions, style: fn(&str) -> colored::ColoredString) -> String {
    if opts.colored {
        style(text).to_string()
    } else {
        text.to_string()
    }
}

/// Format an accepted canonical query
pub fn format_canonical(query: &CanonicalQuery, opts: &OutputOptions) -> String {
    match opts.format {
        OutputFormat::Text => {
            let mut output = paint("ACCEPTED", opts, |s| s.green().bold());
            output.push('\n');
            output.push_str(query.as_str());
            output
        }
        format => serialize(
            &Accepted {
                status: "accepted",
                sql:    query.as_str(),
                tables: query.tables().iter().map(|t| t.as_str()).collect()
            },
            format
        )
    }
}

/// Format a rejection with its kind and message
pub fn format_rejection(rejection: &Rejection, opts: &OutputOptions) -> String {
    match opts.format {
        OutputFormat::Text => {
            let label = format!("REJECTED [{}]", rejection.kind());
            let mut output = paint(&label, opts, |s| s.red().bold());
            output.push('\n');
            output.push_str(&rejection.to_string());
            output
        }
        format => serialize(
            &Rejected {
                status: "rejected",
                rejection,
                message: rejection.to_string()
            },
            format
        )
    }
}

/// Format result rows.
///
/// Text output is one JSON object per line; JSON output is an array.
pub fn format_rows(rows: &[Row], opts: &OutputOptions) -> String {
    match opts.format {
        OutputFormat::Text => {
            let mut output = String::new();
            for row in rows {
                output.push_str(&serde_json::to_string(row).unwrap_or_default());
                output.push('\n');
            }
            let footer = format!("({} rows)", rows.len());
            output.push_str(&paint(&footer, opts, |s| s.dimmed()));
            output
        }
        format => serialize(&rows, format)
    }
}

/// Format the loaded allowlist
pub fn format_allowlist(allowlist: &SchemaAllowlist, opts: &OutputOptions) -> String {
    match opts.format {
        OutputFormat::Text => {
            if allowlist.is_empty() {
                return paint("Schema allowlist is empty; every query is rejected", opts, |s| {
                    s.yellow()
                });
            }
            let mut output = String::new();
            for table in allowlist.table_names() {
                output.push_str(&paint(table, opts, |s| s.cyan().bold()));
                output.push('\n');
                for column in allowlist.columns(table).into_iter().flatten() {
                    output.push_str(&format!("  - {}\n", column));
                }
            }
            output
        }
        format => serialize(allowlist, format)
    }
}
