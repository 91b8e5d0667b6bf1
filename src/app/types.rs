//! Parameter and result types for the CLI commands.

use std::path::PathBuf;

use crate::cli::Format;

/// Exit code for an accepted query or a successful command
pub const EXIT_OK: i32 = 0;

/// Exit code for an operational failure (configuration, I/O, backend down)
pub const EXIT_ERROR: i32 = 1;

/// Exit code for a rejected query
pub const EXIT_REJECTED: i32 = 2;

/// Where the candidate SQL is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuerySource {
    /// SQL passed directly on the command line
    Inline(String),
    /// File path, or `-` for stdin
    Path(String)
}

/// Parameters for the check command.
///
/// # Example
///
/// ```
/// use nlq_sql_gate::{
///     app::{CheckParams, QuerySource},
///     cli::Format
/// };
///
/// let params = CheckParams {
///     source:         QuerySource::Inline("SELECT 1".to_string()),
///     allowlist_path: Some("allowlist.toml".into()),
///     output_format:  Format::Json,
///     no_color:       true
/// };
/// assert!(params.allowlist_path.is_some());
/// ```
#[derive(Debug, Clone)]
pub struct CheckParams {
    pub source:         QuerySource,
    /// Offline allowlist; when absent the backend is introspected
    pub allowlist_path: Option<PathBuf>,
    pub output_format:  Format,
    pub no_color:       bool
}

/// Parameters for the run command.
#[derive(Debug, Clone)]
pub struct RunParams {
    pub source:        QuerySource,
    pub output_format: Format,
    pub no_color:      bool
}

/// Parameters for the schema command.
#[derive(Debug, Clone)]
pub struct SchemaParams {
    pub output_format: Format,
    pub no_color:      bool
}

/// What a command printed and how the process should exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub exit_code: i32,
    pub output:    String
}

impl CommandOutcome {
    pub fn ok(output: String) -> Self {
        Self {
            exit_code: EXIT_OK,
            output
        }
    }

    pub fn rejected(output: String) -> Self {
        Self {
            exit_code: EXIT_REJECTED,
            output
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.exit_code == EXIT_REJECTED
    }
}
