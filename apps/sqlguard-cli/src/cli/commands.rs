//! # CLI Commands
//! A module for all the commands that can be run from the CLI

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::framework::shaping::ChartType;
use crate::infrastructure::db::ConnectionParameters;

#[derive(Subcommand)]
pub enum Commands {
    /// Check a query against the schema and the policy rules
    Validate {
        /// SQL query to validate
        query: Option<String>,

        /// Read query from file
        #[arg(short = 'f', long = "file", conflicts_with = "query")]
        file: Option<PathBuf>,

        /// Schema descriptor JSON file. Introspects the configured database when omitted
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Override the maximum number of JOINs
        #[arg(long)]
        max_joins: Option<usize>,

        /// Override the maximum subquery nesting depth
        #[arg(long)]
        max_subquery_depth: Option<usize>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        db: DbArgs,
    },
    /// Report the complexity metrics of a query
    Estimate {
        /// SQL query to estimate
        query: Option<String>,

        /// Read query from file
        #[arg(short = 'f', long = "file", conflicts_with = "query")]
        file: Option<PathBuf>,

        /// Print the metrics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate a query, then run it under the row cap and timeout
    Execute {
        /// SQL query to execute
        query: Option<String>,

        /// Read query from file
        #[arg(short = 'f', long = "file", conflicts_with = "query")]
        file: Option<PathBuf>,

        /// Schema descriptor JSON file. Introspects the configured database when omitted
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Output format for the returned rows
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// Print chart-ready JSON (bar, line, area or pie) instead of rows
        #[arg(long)]
        chart: Option<ChartType>,

        /// Maximum number of rows to return
        #[arg(long)]
        max_rows: Option<u64>,

        /// Query timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        #[command(flatten)]
        db: DbArgs,
    },
    /// Introspect the configured database and print its schema descriptor
    Schema {
        /// Write the descriptor to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the text block handed to a SQL generator instead of JSON
        #[arg(long)]
        prompt: bool,

        #[command(flatten)]
        db: DbArgs,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Csv,
    Json,
}

/// Connection overrides. The password is only read from settings and the
/// environment (`SQLGUARD_DATABASE__PASSWORD`).
#[derive(Debug, Args, Default)]
pub struct DbArgs {
    /// Database host
    #[arg(long)]
    pub host: Option<String>,

    /// Database port
    #[arg(long)]
    pub port: Option<u16>,

    /// Database user
    #[arg(long)]
    pub user: Option<String>,

    /// Database name
    #[arg(long)]
    pub database: Option<String>,
}

impl DbArgs {
    pub fn apply(&self, mut params: ConnectionParameters) -> ConnectionParameters {
        if let Some(host) = &self.host {
            params.host = host.clone();
        }
        if let Some(port) = self.port {
            params.port = port;
        }
        if let Some(user) = &self.user {
            params.user = user.clone();
        }
        if let Some(database) = &self.database {
            params.database = database.clone();
        }
        params
    }
}
