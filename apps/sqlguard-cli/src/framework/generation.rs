//! # SQL Generation
//!
//! The text generator is an opaque collaborator: it receives a prompt built
//! from the question and the relevant schema, and returns raw text that may or
//! may not be a usable query. [`extract_candidate_sql`] turns that raw text into
//! a single MySQL statement for validation.

use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GenerationError {
    #[error("SQL generator is unavailable: {0}")]
    Unavailable(String),

    /// For generator implementations: the backend was reached but could not
    /// produce an answer.
    #[error("SQL generation failed: {0}")]
    Failed(String),

    #[error("Generator returned no SQL")]
    Empty,
}

/// Everything a generator needs to produce one candidate query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationRequest {
    pub question: String,
    /// Rendered schema fragment, see `SchemaDescriptor::render_for_prompt`.
    pub schema_context: String,
    pub business_context: Option<String>,
}

impl GenerationRequest {
    pub fn new(question: impl Into<String>, schema_context: impl Into<String>) -> Self {
        GenerationRequest {
            question: question.into(),
            schema_context: schema_context.into(),
            business_context: None,
        }
    }

    pub fn with_business_context(mut self, context: impl Into<String>) -> Self {
        self.business_context = Some(context.into());
        self
    }

    pub fn prompt(&self) -> String {
        let mut prompt = format!(
            "### Task\nGenerate a MySQL query to answer the following question: `{}`\n\n\
             ### Database Schema\nThe query will run on a MySQL database with the following schema:\n{}\n\n",
            self.question, self.schema_context
        );

        if let Some(context) = self.business_context.as_deref().filter(|c| !c.is_empty()) {
            prompt.push_str(&format!("### Business Context\n{context}\n\n"));
        }

        prompt.push_str(
            "### Instructions\n\
             - Generate ONLY a single MySQL-compatible SELECT query\n\
             - Use only tables and columns that exist in the schema above\n\
             - When joining tables, use table aliases and qualify all column names\n\
             - Use LIKE for pattern matching (not ILIKE) and no NULLS FIRST/LAST\n\n\
             ### SQL Query\n```sql\n",
        );
        prompt
    }
}

#[async_trait]
pub trait SqlGenerator: Send + Sync {
    /// Returns the generator's raw output.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

static FENCED_SQL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:sql|SQL)?[ \t]*\n?(.*?)(?:```|$)").unwrap());

static ILIKE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bILIKE\b").unwrap());

static NULLS_ORDERING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+NULLS\s+(?:LAST|FIRST)\b").unwrap());

static INTEGER_CAST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\w+)::INTEGER\b").unwrap());

static TEXT_CAST: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)(\w+)::TEXT\b").unwrap());

/// Pulls the query out of generator output and rewrites common PostgreSQL
/// idioms to MySQL. The result ends with `;` unless it is empty.
pub fn extract_candidate_sql(raw: &str) -> String {
    let text = raw.trim();
    let body = match FENCED_SQL.captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => text,
    };

    let sql = body
        .lines()
        .map(|line| match line.find("--") {
            Some(idx) => &line[..idx],
            None => line,
        })
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let mut sql = fix_mysql_syntax(sql.trim());
    if !sql.is_empty() && !sql.ends_with(';') {
        sql.push(';');
    }
    sql
}

fn fix_mysql_syntax(sql: &str) -> String {
    let sql = ILIKE.replace_all(sql, "LIKE");
    let sql = NULLS_ORDERING.replace_all(&sql, "");
    let sql = INTEGER_CAST.replace_all(&sql, "CAST($1 AS SIGNED)");
    let sql = TEXT_CAST.replace_all(&sql, "CAST($1 AS CHAR)");
    sql.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_output_gets_terminator() {
        assert_eq!(
            extract_candidate_sql("  SELECT * FROM customers  "),
            "SELECT * FROM customers;"
        );
    }

    #[test]
    fn test_fenced_block_is_extracted() {
        let raw = "Here you go:\n```sql\nSELECT customerName\nFROM customers;\n```\nEnjoy";
        assert_eq!(
            extract_candidate_sql(raw),
            "SELECT customerName\nFROM customers;"
        );
    }

    #[test]
    fn test_unclosed_fence_is_extracted() {
        assert_eq!(
            extract_candidate_sql("```\nSELECT 1"),
            "SELECT 1;"
        );
    }

    #[test]
    fn test_line_comments_are_dropped() {
        let raw = "-- all customers\nSELECT * FROM customers -- from the US\nWHERE country = 'USA'";
        assert_eq!(
            extract_candidate_sql(raw),
            "SELECT * FROM customers \nWHERE country = 'USA';"
        );
    }

    #[test]
    fn test_postgres_idioms_are_rewritten() {
        let raw = "SELECT amount::INTEGER, code::text FROM payments \
                   WHERE name ilike '%a%' ORDER BY amount DESC NULLS LAST";
        assert_eq!(
            extract_candidate_sql(raw),
            "SELECT CAST(amount AS SIGNED), CAST(code AS CHAR) FROM payments \
             WHERE name LIKE '%a%' ORDER BY amount DESC;"
        );
    }

    #[test]
    fn test_empty_output_stays_empty() {
        assert_eq!(extract_candidate_sql("```sql\n```"), "");
        assert_eq!(extract_candidate_sql("   "), "");
    }

    #[test]
    fn test_prompt_mentions_question_and_schema() {
        let prompt = GenerationRequest::new("How many customers?", "Table: customers")
            .with_business_context("Revenue means SUM(amount)")
            .prompt();
        assert!(prompt.contains("`How many customers?`"));
        assert!(prompt.contains("Table: customers"));
        assert!(prompt.contains("### Business Context\nRevenue means SUM(amount)"));
        assert!(prompt.ends_with("```sql\n"));
    }
}
