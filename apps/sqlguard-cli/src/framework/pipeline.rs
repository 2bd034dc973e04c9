//! # Query Pipeline
//!
//! Wires the stages together for one request:
//!
//! ```text
//! generate -> extract -> analyze -> validate + estimate -> execute
//! ```
//!
//! A [`QueryService`] is built once by the caller with its collaborators and
//! limits, then shared by reference. It keeps no per-request state, and a
//! rejected or failed request is reported as-is; nothing is retried or
//! regenerated here.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::framework::core::complexity::{estimate_cost, ComplexityMetrics};
use crate::framework::core::schema::SchemaDescriptor;
use crate::framework::core::validation::{validate, validate_sql, PolicyLimits, ValidationResult};
use crate::framework::generation::{
    extract_candidate_sql, GenerationError, GenerationRequest, SqlGenerator,
};
use crate::framework::sql::analyze;
use crate::infrastructure::db::{ConnectionParameters, DbTransport, ExecutionGuard, ExecutionResult};
use crate::utilities::constants::{
    DEFAULT_MAX_JOINS, DEFAULT_MAX_QUERY_ROWS, DEFAULT_MAX_SUBQUERY_DEPTH,
    DEFAULT_QUERY_TIMEOUT_SECONDS,
};

fn default_max_query_rows() -> u64 {
    DEFAULT_MAX_QUERY_ROWS
}

fn default_query_timeout_seconds() -> u64 {
    DEFAULT_QUERY_TIMEOUT_SECONDS
}

fn default_max_joins() -> usize {
    DEFAULT_MAX_JOINS
}

fn default_max_subquery_depth() -> usize {
    DEFAULT_MAX_SUBQUERY_DEPTH
}

/// Numeric limits applied to every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryLimits {
    #[serde(default = "default_max_query_rows")]
    pub max_query_rows: u64,
    #[serde(default = "default_query_timeout_seconds")]
    pub query_timeout_seconds: u64,
    #[serde(default = "default_max_joins")]
    pub max_joins: usize,
    #[serde(default = "default_max_subquery_depth")]
    pub max_subquery_depth: usize,
}

impl QueryLimits {
    pub fn policy(&self) -> PolicyLimits {
        PolicyLimits {
            max_joins: self.max_joins,
            max_subquery_depth: self.max_subquery_depth,
        }
    }
}

impl Default for QueryLimits {
    fn default() -> Self {
        QueryLimits {
            max_query_rows: default_max_query_rows(),
            query_timeout_seconds: default_query_timeout_seconds(),
            max_joins: default_max_joins(),
            max_subquery_depth: default_max_subquery_depth(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// The statement failed validation and was never sent to the database.
    Rejected {
        sql: String,
        violations: Vec<String>,
        metrics: ComplexityMetrics,
    },
    /// The statement passed validation; `result` says how execution went.
    Executed {
        sql: String,
        metrics: ComplexityMetrics,
        result: ExecutionResult,
    },
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineOutcome::Executed { result, .. } if result.success)
    }

    pub fn sql(&self) -> &str {
        match self {
            PipelineOutcome::Rejected { sql, .. } | PipelineOutcome::Executed { sql, .. } => sql,
        }
    }
}

pub struct QueryService {
    generator: Option<Arc<dyn SqlGenerator>>,
    guard: ExecutionGuard,
    limits: QueryLimits,
}

impl QueryService {
    pub fn new(transport: Arc<dyn DbTransport>, limits: QueryLimits) -> Self {
        QueryService {
            generator: None,
            guard: ExecutionGuard::new(transport),
            limits,
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn SqlGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_guard(mut self, guard: ExecutionGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn limits(&self) -> &QueryLimits {
        &self.limits
    }

    /// Validates and estimates `sql` from a single analysis pass.
    pub fn check(&self, sql: &str, schema: &SchemaDescriptor) -> (ValidationResult, ComplexityMetrics) {
        let policy = self.limits.policy();
        match analyze(sql) {
            Ok(tree) if !sql.trim().is_empty() => {
                (validate(&tree, schema, &policy), estimate_cost(&tree))
            }
            _ => (validate_sql(sql, schema, &policy), ComplexityMetrics::default()),
        }
    }

    /// Answers a natural-language question: asks the generator for SQL, then
    /// runs it through [`QueryService::run_sql`].
    pub async fn answer(
        &self,
        request: &GenerationRequest,
        schema: &SchemaDescriptor,
        params: &ConnectionParameters,
    ) -> anyhow::Result<PipelineOutcome> {
        let generator = self
            .generator
            .as_ref()
            .ok_or_else(|| GenerationError::Unavailable("no generator configured".to_string()))?;

        let raw = generator
            .generate(request)
            .await
            .with_context(|| format!("Failed to generate SQL for '{}'", request.question))?;

        let sql = extract_candidate_sql(&raw);
        if sql.is_empty() {
            return Err(GenerationError::Empty.into());
        }
        info!("Generated SQL: {}", sql);

        Ok(self.run_sql(&sql, schema, params).await)
    }

    /// Validates `sql` and executes it when every rule passes.
    pub async fn run_sql(
        &self,
        sql: &str,
        schema: &SchemaDescriptor,
        params: &ConnectionParameters,
    ) -> PipelineOutcome {
        let (validation, metrics) = self.check(sql, schema);
        info!(
            "Complexity score {} ({} joins, subquery depth {})",
            metrics.estimated_complexity, metrics.join_count, metrics.subquery_depth
        );

        if !validation.is_valid() {
            warn!("Rejected SQL: {}", validation.violations.join("; "));
            return PipelineOutcome::Rejected {
                sql: sql.to_string(),
                violations: validation.violations,
                metrics,
            };
        }

        let result = self
            .guard
            .execute(
                params,
                sql,
                self.limits.max_query_rows,
                self.limits.query_timeout_seconds,
            )
            .await;

        PipelineOutcome::Executed {
            sql: sql.to_string(),
            metrics,
            result,
        }
    }
}
