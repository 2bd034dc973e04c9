//! Validates a query and runs it through the execution guard.
//!
//! Rows are printed to stdout in the requested shape; the status line and any
//! violations go to stderr when the query does not succeed.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::cli::commands::OutputFormat;
use crate::cli::display::{Message, MessageType};
use crate::cli::routines::{get_sql_input, load_schema, RoutineFailure, RoutineSuccess};
use crate::framework::pipeline::{PipelineOutcome, QueryLimits, QueryService};
use crate::framework::shaping::{shape_chart, to_csv, to_json, to_table, ChartType, ShapeError};
use crate::infrastructure::db::{ConnectionParameters, ExecutionResult, MySqlTransport};

pub struct ExecuteArgs {
    pub query: Option<String>,
    pub file: Option<PathBuf>,
    pub schema: Option<PathBuf>,
    pub format: OutputFormat,
    pub chart: Option<ChartType>,
}

pub async fn execute(
    args: ExecuteArgs,
    limits: QueryLimits,
    params: &ConnectionParameters,
) -> Result<RoutineSuccess, RoutineFailure> {
    let sql = get_sql_input("Execute", args.query, args.file)?;
    let schema = load_schema("Execute", args.schema.as_deref(), params).await?;

    let service = QueryService::new(Arc::new(MySqlTransport), limits);
    let outcome = service.run_sql(&sql, &schema, params).await;
    debug!("Pipeline outcome for {}: success={}", outcome.sql(), outcome.is_success());

    match outcome {
        PipelineOutcome::Rejected { violations, .. } => {
            for violation in &violations {
                show_message!(
                    MessageType::Warning,
                    Message::new("Violation".to_string(), violation.clone())
                );
            }
            Err(RoutineFailure::error(Message::new(
                "Rejected".to_string(),
                format!("{} violation(s), query not executed", violations.len()),
            )))
        }
        PipelineOutcome::Executed { result, .. } if !result.success => {
            let details = result
                .error
                .unwrap_or_else(|| "Query failed".to_string());
            Err(RoutineFailure::error(Message::new(
                "Failed".to_string(),
                details,
            )))
        }
        PipelineOutcome::Executed { result, .. } => render(&result, args.format, args.chart)
            .map_err(|e| {
                RoutineFailure::new(
                    Message::new("Execute".to_string(), "Failed to format results".to_string()),
                    e,
                )
            }),
    }
}

fn render(
    result: &ExecutionResult,
    format: OutputFormat,
    chart: Option<ChartType>,
) -> Result<RoutineSuccess, ShapeError> {
    if let Some(chart_type) = chart {
        let data = shape_chart(&result.rows, chart_type)?;
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(RoutineSuccess::silent());
    }

    match format {
        OutputFormat::Table => {
            println!("{}", to_table(&result.columns, &result.rows));
            let mut details = format!("{} rows in {}ms", result.row_count, result.execution_time_ms);
            if result.truncated {
                details.push_str(" (row cap reached, results may be truncated)");
            }
            Ok(RoutineSuccess::success(Message::new(
                "Executed".to_string(),
                details,
            )))
        }
        OutputFormat::Csv => {
            print!("{}", to_csv(&result.columns, &result.rows)?);
            Ok(RoutineSuccess::silent())
        }
        OutputFormat::Json => {
            println!("{}", to_json(&result.rows)?);
            Ok(RoutineSuccess::silent())
        }
    }
}
