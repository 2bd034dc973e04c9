//! Checks a query against the schema and policy rules without running it.

use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::cli::display::{Message, MessageType};
use crate::cli::routines::{get_sql_input, load_schema, RoutineFailure, RoutineSuccess};
use crate::framework::core::schema::SchemaDescriptor;
use crate::framework::pipeline::{QueryLimits, QueryService};
use crate::infrastructure::db::{ConnectionParameters, MySqlTransport};

pub struct ValidateArgs {
    pub query: Option<String>,
    pub file: Option<PathBuf>,
    pub schema: Option<PathBuf>,
    pub json: bool,
}

pub async fn validate(
    args: ValidateArgs,
    limits: QueryLimits,
    params: &ConnectionParameters,
) -> Result<RoutineSuccess, RoutineFailure> {
    let sql = get_sql_input("Validate", args.query, args.file)?;
    let schema = load_schema("Validate", args.schema.as_deref(), params).await?;
    info!("Validating against {} tables", schema.len());

    report(&sql, &schema, limits, args.json)
}

/// Prints the verdict for `sql`. Split out so it runs without a database.
pub fn report(
    sql: &str,
    schema: &SchemaDescriptor,
    limits: QueryLimits,
    as_json: bool,
) -> Result<RoutineSuccess, RoutineFailure> {
    let service = QueryService::new(Arc::new(MySqlTransport), limits);
    let (validation, metrics) = service.check(sql, schema);
    info!(
        "Policy limits: {} joins, subquery depth {}",
        limits.max_joins, limits.max_subquery_depth
    );

    if as_json {
        let body = json!({
            "valid": validation.is_valid(),
            "violations": validation.violations,
            "metrics": metrics,
        });
        let text = serde_json::to_string_pretty(&body).map_err(|e| {
            RoutineFailure::new(
                Message::new("Validate".to_string(), "Failed to serialize result".to_string()),
                e,
            )
        })?;
        println!("{text}");
    } else {
        for violation in &validation.violations {
            show_message!(
                MessageType::Warning,
                Message::new("Violation".to_string(), violation.clone())
            );
        }
    }

    if validation.is_valid() && as_json {
        Ok(RoutineSuccess::silent())
    } else if validation.is_valid() {
        Ok(RoutineSuccess::highlight(Message::new(
            "Valid".to_string(),
            format!("complexity score {}", metrics.estimated_complexity),
        )))
    } else {
        Err(RoutineFailure::error(Message::new(
            "Rejected".to_string(),
            format!("{} violation(s)", validation.violations.len()),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::core::schema::TableSchema;

    fn schema() -> SchemaDescriptor {
        SchemaDescriptor::new().with_table(
            "customers",
            TableSchema::new(["customerNumber", "customerName", "country"]),
        )
    }

    #[test]
    fn test_valid_verdict_is_highlighted() {
        let success = report(
            "SELECT customerName FROM customers",
            &schema(),
            QueryLimits::default(),
            false,
        )
        .unwrap();
        assert_eq!(success.message_type, MessageType::Highlight);
        assert_eq!(success.message.action, "Valid");
    }

    #[test]
    fn test_rejection_counts_violations() {
        let failure = report(
            "SELECT salary, bonus FROM customers",
            &schema(),
            QueryLimits::default(),
            false,
        )
        .unwrap_err();
        assert_eq!(failure.message_type, MessageType::Error);
        assert_eq!(failure.message.details, "2 violation(s)");
    }
}
