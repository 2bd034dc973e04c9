//! Rule families applied to an analyzed statement.
//!
//! Every family always runs. Violations are reported in family order
//! (statement kind, complexity, schema conformance, dangerous patterns) and,
//! within a family, in source order.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::debug;

use crate::framework::core::complexity::{join_count, subquery_depth};
use crate::framework::core::schema::SchemaDescriptor;
use crate::framework::sql::{analyze, StructuralTree};
use crate::utilities::constants::{DEFAULT_MAX_JOINS, DEFAULT_MAX_SUBQUERY_DEPTH};

pub const ONLY_SELECT_ALLOWED: &str = "Only SELECT queries are allowed";
pub const MULTIPLE_STATEMENTS: &str = "Multiple SQL statements not allowed";

static DANGEROUS_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"--", "SQL comments not allowed"),
        (r"/\*", "Multi-line comments not allowed"),
        (r"(?i)\bEXEC\b", "EXEC command not allowed"),
        (r"(?i)\bEXECUTE\b", "EXECUTE command not allowed"),
        (r"(?i)\bINTO\s+OUTFILE\b", "INTO OUTFILE not allowed"),
        (r"(?i)\bLOAD_FILE\b", "LOAD_FILE not allowed"),
    ]
    .into_iter()
    .map(|(pattern, message)| (Regex::new(pattern).unwrap(), message))
    .collect()
});

/// Structural limits enforced by the complexity rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyLimits {
    pub max_joins: usize,
    pub max_subquery_depth: usize,
}

impl Default for PolicyLimits {
    fn default() -> Self {
        PolicyLimits {
            max_joins: DEFAULT_MAX_JOINS,
            max_subquery_depth: DEFAULT_MAX_SUBQUERY_DEPTH,
        }
    }
}

/// Ordered violations. Empty means the statement may run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub violations: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    fn push(&mut self, violation: String) {
        if !self.violations.contains(&violation) {
            self.violations.push(violation);
        }
    }
}

/// An independent validation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFamily {
    StatementKind,
    Complexity,
    SchemaConformance,
    DangerousPattern,
}

impl RuleFamily {
    /// Evaluation order.
    pub const ALL: [RuleFamily; 4] = [
        RuleFamily::StatementKind,
        RuleFamily::Complexity,
        RuleFamily::SchemaConformance,
        RuleFamily::DangerousPattern,
    ];

    fn check(
        self,
        tree: &StructuralTree,
        schema: &SchemaDescriptor,
        limits: &PolicyLimits,
        result: &mut ValidationResult,
    ) {
        match self {
            RuleFamily::StatementKind => check_statement_kind(tree, result),
            RuleFamily::Complexity => check_complexity(tree, limits, result),
            RuleFamily::SchemaConformance => check_schema(tree, schema, result),
            RuleFamily::DangerousPattern => check_dangerous_patterns(tree.source(), result),
        }
    }
}

/// Runs every rule family over an analyzed statement.
pub fn validate(
    tree: &StructuralTree,
    schema: &SchemaDescriptor,
    limits: &PolicyLimits,
) -> ValidationResult {
    let mut result = ValidationResult::default();
    for family in RuleFamily::ALL {
        let before = result.violations.len();
        family.check(tree, schema, limits, &mut result);
        debug!(
            "{:?} rule produced {} violation(s)",
            family,
            result.violations.len() - before
        );
    }
    result
}

/// Analyzes and validates SQL text. Text that cannot be scanned yields a single
/// syntax violation and no rule runs.
pub fn validate_sql(sql: &str, schema: &SchemaDescriptor, limits: &PolicyLimits) -> ValidationResult {
    if sql.trim().is_empty() {
        return ValidationResult {
            violations: vec!["Invalid SQL syntax: query is empty".to_string()],
        };
    }

    match analyze(sql) {
        Ok(tree) => validate(&tree, schema, limits),
        Err(e) => ValidationResult {
            violations: vec![format!("Invalid SQL syntax: {e}")],
        },
    }
}

fn check_statement_kind(tree: &StructuralTree, result: &mut ValidationResult) {
    if tree.leading_keyword() != Some("SELECT") {
        result.push(ONLY_SELECT_ALLOWED.to_string());
    }
}

fn check_complexity(tree: &StructuralTree, limits: &PolicyLimits, result: &mut ValidationResult) {
    let joins = join_count(tree);
    if joins > limits.max_joins {
        result.push(format!(
            "Too many JOINs: {} (max allowed: {})",
            joins, limits.max_joins
        ));
    }

    let depth = subquery_depth(tree);
    if depth > limits.max_subquery_depth {
        result.push(format!(
            "Subquery nesting too deep: {} (max allowed: {})",
            depth, limits.max_subquery_depth
        ));
    }
}

fn check_schema(tree: &StructuralTree, schema: &SchemaDescriptor, result: &mut ValidationResult) {
    // table name or alias -> table name
    let mut bindings: HashMap<&str, &str> = HashMap::new();

    for table in tree.tables() {
        if !schema.contains_table(&table.name) {
            result.push(format!("Table '{}' not found in schema", table.name));
        }
        bindings.insert(&table.name, &table.name);
        if let Some(alias) = &table.alias {
            bindings.insert(alias, &table.name);
        }
    }

    for column in tree.columns() {
        match &column.qualifier {
            Some(qualifier) => {
                if let Some(table) = bindings.get(qualifier.as_str()) {
                    // missing tables were already reported above
                    let Some(table_schema) = schema.table(table) else {
                        continue;
                    };
                    if !table_schema.has_column(&column.name) {
                        result.push(format!(
                            "Column '{}' not found in table '{}'",
                            column.name, table
                        ));
                    }
                } else if !tree.derived_aliases().contains(qualifier) {
                    result.push(format!(
                        "Unknown table or alias '{}' for column '{}'",
                        qualifier, column.name
                    ));
                }
            }
            None => {
                // ambiguous names resolve to the first table that has them
                if schema.find_column(&column.name).is_none() {
                    result.push(format!("Column '{}' not found in any table", column.name));
                }
            }
        }
    }
}

fn check_dangerous_patterns(sql: &str, result: &mut ValidationResult) {
    let trimmed = sql.trim();
    // a single trailing terminator is allowed
    let body = match trimmed.char_indices().last() {
        Some((last, _)) => &trimmed[..last],
        None => "",
    };
    if body.contains(';') {
        result.push(MULTIPLE_STATEMENTS.to_string());
    }

    for (pattern, message) in DANGEROUS_PATTERNS.iter() {
        if pattern.is_match(trimmed) {
            result.push(message.to_string());
        }
    }
}
