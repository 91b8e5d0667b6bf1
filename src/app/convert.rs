//! Conversion from CLI arguments into library types.

use super::types::QuerySource;
use crate::{
    cli::{Format, PolicyArgs, QueryInput},
    config::Config,
    error::{AppResult, config_error},
    output::OutputFormat
};

/// Convert CLI format to internal OutputFormat
pub fn convert_format(format: Format) -> OutputFormat {
    match format {
        Format::Text => OutputFormat::Text,
        Format::Json => OutputFormat::Json,
        Format::Yaml => OutputFormat::Yaml
    }
}

/// Resolve `--query` / `--file` into a [`QuerySource`].
pub fn query_source(input: QueryInput) -> AppResult<QuerySource> {
    match (input.query, input.file) {
        (Some(sql), None) => Ok(QuerySource::Inline(sql)),
        (None, Some(path)) => Ok(QuerySource::Path(path.display().to_string())),
        (Some(_), Some(_)) => Err(config_error("Use either --query or --file, not both")),
        (None, None) => Err(config_error("A query is required: pass --query or --file"))
    }
}

/// Apply command-line overrides on top of the loaded configuration, then
/// validate the resulting gate policy.
///
/// # Example
///
/// ```
/// use nlq_sql_gate::{app::apply_policy_args, cli::PolicyArgs, config::Config};
///
/// let args = PolicyArgs {
///     namespace: Some("Analytics".to_string()),
///     max_limit: Some(10),
///     ..Default::default()
/// };
/// let config = apply_policy_args(Config::default(), &args).unwrap();
/// assert_eq!(config.gate.namespace, "analytics");
/// assert_eq!(config.gate.max_limit, 10);
/// ```
pub fn apply_policy_args(mut config: Config, args: &PolicyArgs) -> AppResult<Config> {
    if let Some(namespace) = &args.namespace {
        config.gate.namespace = namespace.clone();
    }
    if let Some(tables) = &args.tables {
        config.gate.tables = tables.clone();
    }
    if let Some(max_limit) = args.max_limit {
        config.gate.max_limit = max_limit;
    }
    if let Some(url) = &args.backend_url {
        config.backend.url = url.clone();
    }
    config.gate = config.gate.validate()?;
    Ok(config)
}
