//! Structural cost heuristics.
//!
//! The score is for observability only; nothing gates on it.

use serde::Serialize;
use tracing::warn;

use crate::framework::sql::{analyze, Node, StructuralTree, Token};

/// Join qualifiers counted a second time when they directly precede `JOIN`.
const JOIN_QUALIFIERS: [&str; 5] = ["INNER", "LEFT", "RIGHT", "FULL", "CROSS"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ComplexityMetrics {
    pub join_count: usize,
    pub subquery_depth: usize,
    pub has_aggregation: bool,
    pub has_order: bool,
    pub has_distinct: bool,
    pub estimated_complexity: u64,
}

/// Computes metrics for an analyzed statement.
pub fn estimate_cost(tree: &StructuralTree) -> ComplexityMetrics {
    let join_count = join_count(tree);
    let subquery_depth = subquery_depth(tree);
    let tokens = tree.tokens();
    let has_aggregation = has_keyword_pair(tokens, "GROUP", "BY");
    let has_order = has_keyword_pair(tokens, "ORDER", "BY");
    let has_distinct = tokens.iter().any(|t| t.is_keyword("DISTINCT"));

    let estimated_complexity = 1
        + 2 * join_count as u64
        + 3 * subquery_depth as u64
        + 2 * u64::from(has_aggregation)
        + u64::from(has_order)
        + u64::from(has_distinct);

    ComplexityMetrics {
        join_count,
        subquery_depth,
        has_aggregation,
        has_order,
        has_distinct,
        estimated_complexity,
    }
}

/// Text entry point. Unscannable SQL yields zeroed metrics.
pub fn estimate_cost_sql(sql: &str) -> ComplexityMetrics {
    match analyze(sql) {
        Ok(tree) => estimate_cost(&tree),
        Err(e) => {
            warn!("Could not estimate cost of unscannable SQL: {}", e);
            ComplexityMetrics::default()
        }
    }
}

/// Counts `JOIN` keywords. A `JOIN` directly preceded by one of
/// INNER/LEFT/RIGHT/FULL/CROSS counts twice, once for the bare keyword and
/// once for the qualified form.
pub fn join_count(tree: &StructuralTree) -> usize {
    let tokens = tree.tokens();
    tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| t.is_keyword("JOIN"))
        .map(|(i, _)| {
            let qualified = i > 0 && JOIN_QUALIFIERS.iter().any(|q| tokens[i - 1].is_keyword(q));
            if qualified {
                2
            } else {
                1
            }
        })
        .sum()
}

/// Deepest chain of nested subquery groups. A group counts as a subquery when
/// its first non-comment token is `SELECT`.
pub fn subquery_depth(tree: &StructuralTree) -> usize {
    let mut deepest = 0;
    let mut pending: Vec<(&[Node], usize)> = vec![(tree.nodes(), 0)];

    while let Some((nodes, depth)) = pending.pop() {
        for node in nodes {
            if let Node::Group(group) = node {
                let depth = if tree.is_subquery(group) {
                    depth + 1
                } else {
                    depth
                };
                deepest = deepest.max(depth);
                pending.push((group.children.as_slice(), depth));
            }
        }
    }

    deepest
}

fn has_keyword_pair(tokens: &[Token], first: &str, second: &str) -> bool {
    let mut significant = tokens.iter().filter(|t| !t.is_comment()).peekable();
    while let Some(token) = significant.next() {
        if token.is_keyword(first) && significant.peek().is_some_and(|t| t.is_keyword(second)) {
            return true;
        }
    }
    false
}
