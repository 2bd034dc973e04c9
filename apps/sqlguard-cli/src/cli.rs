#[macro_use]
pub mod display;

mod commands;
pub mod logger;
pub mod routines;
pub mod settings;

use clap::Parser;
use commands::Commands;
use std::path::PathBuf;
use tracing::info;

use crate::cli::routines::execute::{execute, ExecuteArgs};
use crate::cli::routines::validate::{validate, ValidateArgs};
use crate::cli::routines::{estimate::estimate, schema::schema, RoutineFailure, RoutineSuccess};
use settings::Settings;

#[derive(Parser)]
#[command(author, version, about, long_about = None, arg_required_else_help(true), next_display_order = None)]
pub struct Cli {
    /// Turn debugging information on
    #[arg(short, long)]
    pub debug: bool,

    /// Print backtraces for all errors (same as RUST_LIB_BACKTRACE=1)
    #[arg(long, global = true)]
    pub backtrace: bool,

    /// Settings file to read instead of ~/.sqlguard/config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

pub async fn top_command_handler(
    settings: Settings,
    commands: &Commands,
) -> Result<RoutineSuccess, RoutineFailure> {
    match commands {
        Commands::Validate {
            query,
            file,
            schema,
            max_joins,
            max_subquery_depth,
            json,
            db,
        } => {
            info!("Running validate command");
            let mut limits = settings.limits;
            if let Some(max_joins) = max_joins {
                limits.max_joins = *max_joins;
            }
            if let Some(depth) = max_subquery_depth {
                limits.max_subquery_depth = *depth;
            }
            let params = db.apply(settings.database);

            validate(
                ValidateArgs {
                    query: query.clone(),
                    file: file.clone(),
                    schema: schema.clone(),
                    json: *json,
                },
                limits,
                &params,
            )
            .await
        }
        Commands::Estimate { query, file, json } => {
            info!("Running estimate command");
            estimate(query.clone(), file.clone(), *json)
        }
        Commands::Execute {
            query,
            file,
            schema,
            format,
            chart,
            max_rows,
            timeout,
            db,
        } => {
            info!("Running execute command");
            let mut limits = settings.limits;
            if let Some(max_rows) = max_rows {
                limits.max_query_rows = *max_rows;
            }
            if let Some(timeout) = timeout {
                limits.query_timeout_seconds = *timeout;
            }
            let params = db.apply(settings.database);

            execute(
                ExecuteArgs {
                    query: query.clone(),
                    file: file.clone(),
                    schema: schema.clone(),
                    format: *format,
                    chart: *chart,
                },
                limits,
                &params,
            )
            .await
        }
        Commands::Schema { output, prompt, db } => {
            info!("Running schema command");
            let params = db.apply(settings.database);
            schema(output.clone(), *prompt, &params).await
        }
    }
}
