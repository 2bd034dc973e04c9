//! # Structural SQL Analyzer
//!
//! Turns raw SQL text into a [`StructuralTree`]: a flat token stream plus a
//! tree of parenthesized groups that mirrors the parenthesis nesting of the
//! source. The analyzer does not validate semantics. It fails only when the
//! text cannot be scanned at all (unterminated quotes, unbalanced parentheses).
//!
//! Derived views computed once at construction:
//! - the statement's leading keyword
//! - every [`TableReference`] introduced by `FROM` and `JOIN`
//! - every [`ColumnReference`] in projection lists and `WHERE` predicates
//!
//! ```rust
//! use sqlguard_cli::framework::sql::analyze;
//!
//! let tree = analyze("SELECT c.name FROM customers c WHERE c.country = 'USA'").unwrap();
//! assert_eq!(tree.leading_keyword(), Some("SELECT"));
//! assert_eq!(tree.tables()[0].name, "customers");
//! ```

mod references;
pub mod tokens;
mod tree;

use serde::Serialize;
use thiserror::Error;

pub use tokens::{Token, TokenKind};
pub use tree::{Group, Node, StructuralTree};

/// Errors raised when SQL text cannot be turned into a structural tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SyntaxError {
    #[error("Unterminated string literal starting at position {position}")]
    UnterminatedString { position: usize },

    #[error("Unterminated quoted identifier starting at position {position}")]
    UnterminatedIdentifier { position: usize },

    #[error("Unclosed parenthesis at position {position}")]
    UnclosedParenthesis { position: usize },

    #[error("Unexpected closing parenthesis at position {position}")]
    UnexpectedClosingParenthesis { position: usize },

    #[error("Unrecognized input at position {position}")]
    Unrecognized { position: usize },
}

/// A table named in a `FROM` or `JOIN` clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableReference {
    /// Table name without database prefix or quoting, in source casing.
    pub name: String,
    pub alias: Option<String>,
}

/// A column named in a projection list or `WHERE` predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnReference {
    /// Table name or alias for `qualifier.column` references.
    pub qualifier: Option<String>,
    pub name: String,
}

impl ColumnReference {
    pub fn is_qualified(&self) -> bool {
        self.qualifier.is_some()
    }
}

/// Scans `sql` and builds its structural tree.
pub fn analyze(sql: &str) -> Result<StructuralTree, SyntaxError> {
    let tokens = tokens::tokenize(sql)?;
    StructuralTree::build(sql, tokens)
}
