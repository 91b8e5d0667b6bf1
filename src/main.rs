use std::{io, process};

use clap::Parser;
use nlq_sql_gate::{
    app::{
        CheckParams, CommandOutcome, EXIT_ERROR, RunParams, SchemaParams, apply_policy_args,
        query_source, run_check, run_query, run_schema
    },
    cli::{Cli, Commands},
    config::Config,
    error::AppResult
};
use tokio::main;
use tracing_subscriber::EnvFilter;

#[main]
async fn main() {
    init_tracing();
    match run().await {
        Ok(outcome) => {
            println!("{}", outcome.output);
            process::exit(outcome.exit_code);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(EXIT_ERROR);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

async fn run() -> AppResult<CommandOutcome> {
    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Check {
            input,
            allowlist,
            policy,
            display
        } => {
            let config = apply_policy_args(config, &policy)?;
            let params = CheckParams {
                source:         query_source(input)?,
                allowlist_path: allowlist,
                output_format:  display.output_format,
                no_color:       display.no_color
            };
            run_check(params, config).await
        }
        Commands::Run {
            input,
            policy,
            display
        } => {
            let config = apply_policy_args(config, &policy)?;
            let params = RunParams {
                source:        query_source(input)?,
                output_format: display.output_format,
                no_color:      display.no_color
            };
            run_query(params, config).await
        }
        Commands::Schema {
            policy,
            display
        } => {
            let config = apply_policy_args(config, &policy)?;
            let params = SchemaParams {
                output_format: display.output_format,
                no_color:      display.no_color
            };
            run_schema(params, config).await
        }
    }
}
