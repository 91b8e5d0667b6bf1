//! Command execution.
//!
//! Each runner returns a [`CommandOutcome`]: a rejection is an expected
//! result with exit code 2, while configuration, I/O and introspection
//! failures propagate as [`AppError`](crate::error::AppError).

use std::sync::Arc;

use super::{
    helpers::{create_output_options, load_allowlist_file, read_query_input, spinner},
    types::{CheckParams, CommandOutcome, RunParams, SchemaParams}
};
use crate::{
    backend::BackendClient,
    config::Config,
    error::AppResult,
    gate::SqlGate,
    output::{format_allowlist, format_canonical, format_rejection, format_rows},
    schema::SchemaCache
};

/// Validate one query and report its canonical form.
///
/// With an allowlist file no network access happens.
pub async fn run_check(params: CheckParams, config: Config) -> AppResult<CommandOutcome> {
    let sql = read_query_input(&params.source)?;
    let opts = create_output_options(params.output_format, params.no_color);
    let gate = SqlGate::new(config.gate.clone(), Arc::new(SchemaCache::new()));

    match &params.allowlist_path {
        Some(path) => {
            let allowlist = load_allowlist_file(path, gate.policy())?;
            tracing::info!(
                table_count = allowlist.len(),
                path = %path.display(),
                "Schema allowlist read from file"
            );
            gate.cache().replace(allowlist);
        }
        None => {
            let client = BackendClient::new(&config.backend)?;
            let pb = spinner("Loading schema allowlist...");
            let loaded = gate.reload(&client).await;
            pb.finish_and_clear();
            loaded?;
        }
    }

    Ok(match gate.prepare(&sql) {
        Ok(query) => CommandOutcome::ok(format_canonical(&query, &opts)),
        Err(rejection) => CommandOutcome::rejected(format_rejection(&rejection, &opts))
    })
}

/// Validate, execute and print the rows.
pub async fn run_query(params: RunParams, config: Config) -> AppResult<CommandOutcome> {
    let sql = read_query_input(&params.source)?;
    let opts = create_output_options(params.output_format, params.no_color);
    let client = BackendClient::new(&config.backend)?;
    let gate = SqlGate::new(config.gate, Arc::new(SchemaCache::new()));

    let pb = spinner("Loading schema allowlist...");
    let loaded = gate.reload(&client).await;
    if loaded.is_err() {
        pb.finish_and_clear();
    }
    loaded?;

    pb.set_message("Executing query...");
    let result = gate.execute(&client, &sql).await;
    pb.finish_and_clear();

    Ok(match result {
        Ok(rows) => CommandOutcome::ok(format_rows(&rows, &opts)),
        Err(rejection) => CommandOutcome::rejected(format_rejection(&rejection, &opts))
    })
}

/// Introspect the backend and print the allowlist.
pub async fn run_schema(params: SchemaParams, config: Config) -> AppResult<CommandOutcome> {
    let opts = create_output_options(params.output_format, params.no_color);
    let client = BackendClient::new(&config.backend)?;
    let cache = SchemaCache::new();

    let pb = spinner("Loading schema allowlist...");
    let loaded = cache.reload(&client, &config.gate).await;
    pb.finish_and_clear();
    loaded?;

    Ok(CommandOutcome::ok(format_allowlist(&cache.snapshot(), &opts)))
}
