use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// NLQ SQL Gate - validate generated SQL against a schema allowlist before it
/// reaches ClickHouse
#[derive(Parser, Debug)]
#[command(name = "nlq-sql-gate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a query and print its canonical form
    Check {
        #[command(flatten)]
        input: QueryInput,

        /// TOML allowlist file; skips backend introspection
        #[arg(long)]
        allowlist: Option<PathBuf>,

        #[command(flatten)]
        policy: PolicyArgs,

        #[command(flatten)]
        display: DisplayArgs
    },
    /// Validate a query, execute it and print the rows
    Run {
        #[command(flatten)]
        input: QueryInput,

        #[command(flatten)]
        policy: PolicyArgs,

        #[command(flatten)]
        display: DisplayArgs
    },
    /// Introspect the backend and print the schema allowlist
    Schema {
        #[command(flatten)]
        policy: PolicyArgs,

        #[command(flatten)]
        display: DisplayArgs
    }
}

/// Where the candidate SQL comes from
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct QueryInput {
    /// SQL text
    #[arg(short, long)]
    pub query: Option<String>,

    /// Path to a file containing the SQL (use - for stdin)
    #[arg(short, long)]
    pub file: Option<PathBuf>
}

/// Overrides for the configured gate policy and backend
#[derive(Args, Debug, Clone, Default)]
pub struct PolicyArgs {
    /// Database namespace all tables must be qualified with
    #[arg(long)]
    pub namespace: Option<String>,

    /// Comma-separated queryable tables
    #[arg(long, value_delimiter = ',')]
    pub tables: Option<Vec<String>>,

    /// Maximum row limit
    #[arg(long)]
    pub max_limit: Option<u64>,

    /// ClickHouse HTTP base URL
    #[arg(long)]
    pub backend_url: Option<String>
}

#[derive(Args, Debug, Clone)]
pub struct DisplayArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output_format: Format,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
    Yaml
}
