//! Application layer for the `nlq-sql-gate` binary.
//!
//! Turns parsed CLI arguments into library calls and formatted output. The
//! binary only parses arguments, loads configuration, dispatches to a runner
//! here and prints the [`CommandOutcome`].
//!
//! # Commands
//!
//! | Runner | Backend access | Exit codes |
//! |--------|----------------|------------|
//! | [`run_check`] | Only without `--allowlist` | 0 accepted, 2 rejected |
//! | [`run_query`] | Introspection and execution | 0 rows, 2 rejected |
//! | [`run_schema`] | Introspection | 0 |
//!
//! Operational failures surface as errors and exit with code 1.

mod commands;
mod convert;
mod helpers;
mod types;

pub use commands::{run_check, run_query, run_schema};
pub use convert::{apply_policy_args, convert_format, query_source};
pub use helpers::{create_output_options, load_allowlist_file, read_query_input, spinner};
pub use types::{
    CheckParams, CommandOutcome, EXIT_ERROR, EXIT_OK, EXIT_REJECTED, QuerySource, RunParams,
    SchemaParams
};
