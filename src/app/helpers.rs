//! Helper functions for CLI operations.
//!
//! Reading query input, building output options, loading an offline
//! allowlist and showing a spinner around backend round trips.

use std::{
    fs::read_to_string,
    io::{self, Read},
    path::Path,
    time::Duration
};

use indicatif::{ProgressBar, ProgressStyle};

use super::{convert::convert_format, types::QuerySource};
use crate::{
    cli::Format,
    config::GateConfig,
    error::{AppResult, file_read_error},
    output::OutputOptions,
    schema::SchemaAllowlist
};

/// Reads the candidate SQL.
///
/// A [`QuerySource::Path`] of `-` reads standard input.
///
/// # Errors
///
/// Returns an error if the file cannot be read or stdin fails.
///
/// # Example
///
/// ```
/// use nlq_sql_gate::app::{QuerySource, read_query_input};
///
/// let sql = read_query_input(&QuerySource::Inline("SELECT 1".into())).unwrap();
/// assert_eq!(sql, "SELECT 1");
/// ```
pub fn read_query_input(source: &QuerySource) -> AppResult<String> {
    match source {
        QuerySource::Inline(sql) => Ok(sql.clone()),
        QuerySource::Path(path) if path == "-" => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| file_read_error("stdin", e))?;
            Ok(buffer)
        }
        QuerySource::Path(path) => read_to_string(path).map_err(|e| file_read_error(path, e))
    }
}

/// Creates output options from CLI parameters.
pub fn create_output_options(format: Format, no_color: bool) -> OutputOptions {
    OutputOptions {
        format:  convert_format(format),
        colored: !no_color
    }
}

/// Reads a TOML allowlist file, keeping only the policy's designated tables.
pub fn load_allowlist_file(path: &Path, policy: &GateConfig) -> AppResult<SchemaAllowlist> {
    let display = path.display().to_string();
    let content = read_to_string(path).map_err(|e| file_read_error(&display, e))?;
    SchemaAllowlist::from_toml_str(&display, &content, &policy.tables)
}

/// Spinner shown on stderr while waiting for the backend.
///
/// Hidden automatically when stderr is not a terminal.
pub fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
