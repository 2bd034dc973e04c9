//! Row-cap rewrite applied before execution.
//!
//! Only a top-level `LIMIT` keyword counts as an existing limit, so a column
//! such as `creditLimit` or a `LIMIT` inside a derived table never suppresses
//! the cap.

use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

use crate::framework::sql::{analyze, Node, StructuralTree, Token, TokenKind};

static LIMIT_VALUE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bLIMIT\s+(?:\d+\s*,\s*)?(\d+)").unwrap());

static LIMIT_WORD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bLIMIT\b").unwrap());

/// Strips one trailing `;`, then appends `LIMIT row_cap` when the statement has
/// no limit or lowers a limit that exceeds `row_cap`. All other text is kept
/// verbatim.
pub fn enforce_row_cap(sql: &str, row_cap: u64) -> String {
    let trimmed = sql.trim();
    let statement = trimmed
        .strip_suffix(';')
        .map(str::trim_end)
        .unwrap_or(trimmed);

    match analyze(statement) {
        Ok(tree) => rewrite_with_tree(&tree, statement, row_cap),
        Err(e) => {
            warn!("Falling back to textual LIMIT rewrite: {}", e);
            rewrite_textually(statement, row_cap)
        }
    }
}

fn rewrite_with_tree(tree: &StructuralTree, statement: &str, row_cap: u64) -> String {
    // top-level nodes minus comments; groups stay as None to break adjacency
    let top_level: Vec<Option<&Token>> = tree
        .nodes()
        .iter()
        .filter_map(|node| match node {
            Node::Token(i) if tree.token(*i).is_comment() => None,
            Node::Token(i) => Some(Some(tree.token(*i))),
            Node::Group(_) => Some(None),
        })
        .collect();

    let Some(limit_pos) = top_level
        .iter()
        .rposition(|t| t.is_some_and(|t| t.is_keyword("LIMIT")))
    else {
        return append_limit(tree, statement, row_cap);
    };

    let number_at = |pos: usize| {
        top_level
            .get(pos)
            .copied()
            .flatten()
            .filter(|t| t.kind == TokenKind::NumberLiteral)
    };
    let comma_at = |pos: usize| {
        top_level
            .get(pos)
            .copied()
            .flatten()
            .is_some_and(|t| t.kind == TokenKind::Comma)
    };

    let count = match number_at(limit_pos + 1) {
        // LIMIT offset, count
        Some(_) if comma_at(limit_pos + 2) => number_at(limit_pos + 3),
        other => other,
    };

    let Some(count) = count else {
        warn!("LIMIT without a literal row count left unchanged");
        return statement.to_string();
    };

    if exceeds(&count.text, row_cap) {
        replace_span(statement, count.span.clone(), row_cap)
    } else {
        statement.to_string()
    }
}

fn append_limit(tree: &StructuralTree, statement: &str, row_cap: u64) -> String {
    // a trailing line comment would swallow the appended clause
    let ends_in_comment = tree.tokens().last().is_some_and(|t| t.is_comment());
    if ends_in_comment {
        format!("{statement}\nLIMIT {row_cap}")
    } else {
        format!("{statement} LIMIT {row_cap}")
    }
}

fn rewrite_textually(statement: &str, row_cap: u64) -> String {
    match LIMIT_VALUE_PATTERN.captures_iter(statement).last() {
        Some(captures) => match captures.get(1) {
            Some(count) if exceeds(count.as_str(), row_cap) => {
                replace_span(statement, count.range(), row_cap)
            }
            _ => statement.to_string(),
        },
        None if LIMIT_WORD_PATTERN.is_match(statement) => statement.to_string(),
        None => format!("{statement} LIMIT {row_cap}"),
    }
}

// Values too large for u64 are over any cap.
fn exceeds(count: &str, row_cap: u64) -> bool {
    count.parse::<u64>().map_or(true, |n| n > row_cap)
}

fn replace_span(statement: &str, span: std::ops::Range<usize>, row_cap: u64) -> String {
    format!(
        "{}{}{}",
        &statement[..span.start],
        row_cap,
        &statement[span.end..]
    )
}
