use std::path::PathBuf;

use crate::cli::display::Message;
use crate::cli::routines::{get_sql_input, RoutineFailure, RoutineSuccess};
use crate::framework::core::complexity::{estimate_cost_sql, ComplexityMetrics};

pub fn estimate(
    query: Option<String>,
    file: Option<PathBuf>,
    as_json: bool,
) -> Result<RoutineSuccess, RoutineFailure> {
    let sql = get_sql_input("Estimate", query, file)?;
    let metrics = estimate_cost_sql(&sql);

    if as_json {
        let text = serde_json::to_string_pretty(&metrics).map_err(|e| {
            RoutineFailure::new(
                Message::new("Estimate".to_string(), "Failed to serialize metrics".to_string()),
                e,
            )
        })?;
        println!("{text}");
        return Ok(RoutineSuccess::silent());
    }

    print_metrics(&metrics);
    Ok(RoutineSuccess::success(Message::new(
        "Estimate".to_string(),
        format!("complexity score {}", metrics.estimated_complexity),
    )))
}

fn print_metrics(metrics: &ComplexityMetrics) {
    println!("joins:          {}", metrics.join_count);
    println!("subquery depth: {}", metrics.subquery_depth);
    println!("aggregation:    {}", metrics.has_aggregation);
    println!("order by:       {}", metrics.has_order);
    println!("distinct:       {}", metrics.has_distinct);
}
