//! Extraction of table and column references from a nested token tree.
//!
//! The walk keeps an explicit stack of cursors, one per group being visited,
//! so references come out in source order without recursion. Each subquery
//! group starts a fresh statement scope; other groups inherit the clause of
//! the group that contains them.

use super::tokens::{Token, TokenKind};
use super::tree::{is_subquery, Node};
use super::{ColumnReference, TableReference};

#[derive(Debug, Default)]
pub(super) struct References {
    pub tables: Vec<TableReference>,
    pub columns: Vec<ColumnReference>,
    pub derived_aliases: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clause {
    Leading,
    Projection,
    From,
    Where,
    Other,
}

impl Clause {
    fn collects_columns(self) -> bool {
        matches!(self, Clause::Projection | Clause::Where)
    }
}

struct Cursor<'a> {
    nodes: &'a [Node],
    pos: usize,
    // keywords only switch clauses in statement scopes, never inside
    // expression groups such as `EXTRACT(YEAR FROM d)`
    statement: bool,
    clause: Clause,
    expect_table: bool,
    // first name is a temporal unit, as in `TIMESTAMPDIFF(DAY, a, b)`
    unit_argument: bool,
}

/// Functions whose first argument is a unit such as `YEAR` or `DAY`.
const UNIT_FUNCTIONS: &[&str] = &["EXTRACT", "TIMESTAMPADD", "TIMESTAMPDIFF"];

impl<'a> Cursor<'a> {
    fn statement(nodes: &'a [Node]) -> Self {
        Cursor {
            nodes,
            pos: 0,
            statement: true,
            clause: Clause::Leading,
            expect_table: false,
            unit_argument: false,
        }
    }

    fn expression(nodes: &'a [Node], clause: Clause) -> Self {
        Cursor {
            nodes,
            pos: 0,
            statement: false,
            clause,
            expect_table: false,
            unit_argument: false,
        }
    }
}

pub(super) fn collect(tokens: &[Token], root: &[Node]) -> References {
    let mut refs = References::default();
    let mut cursors = vec![Cursor::statement(root)];

    while let Some(cursor) = cursors.last_mut() {
        if cursor.pos >= cursor.nodes.len() {
            cursors.pop();
            continue;
        }
        if let Some(child) = step(cursor, tokens, &mut refs) {
            cursors.push(child);
        }
    }

    refs
}

/// Consumes one node (or a run of nodes forming a dotted name) and returns a
/// cursor for a group that must be visited next.
fn step<'a>(cursor: &mut Cursor<'a>, tokens: &[Token], refs: &mut References) -> Option<Cursor<'a>> {
    let nodes = cursor.nodes;
    let start = cursor.pos;

    let index = match &nodes[start] {
        Node::Group(group) => {
            cursor.pos += 1;
            let subquery = is_subquery(tokens, group);

            if cursor.statement && cursor.clause == Clause::From && cursor.expect_table {
                cursor.expect_table = false;
                if !subquery {
                    // parenthesized join list
                    let mut inner = Cursor::statement(&group.children);
                    inner.clause = Clause::From;
                    inner.expect_table = true;
                    return Some(inner);
                }
                let (alias, next) = read_alias(tokens, nodes, cursor.pos);
                cursor.pos = next;
                if let Some(alias) = alias {
                    refs.derived_aliases.push(alias);
                }
            }

            if subquery {
                return Some(Cursor::statement(&group.children));
            }
            let mut inner = Cursor::expression(&group.children, cursor.clause);
            inner.unit_argument = matches!(
                previous_significant(tokens, nodes, start),
                Some(Node::Token(i)) if tokens[*i].kind == TokenKind::Identifier
                    && UNIT_FUNCTIONS.iter().any(|f| tokens[*i].text.eq_ignore_ascii_case(f))
            );
            return Some(inner);
        }
        Node::Token(index) => *index,
    };

    let token = &tokens[index];
    match token.kind {
        TokenKind::Keyword => {
            cursor.pos += 1;
            if cursor.statement {
                enter_clause(cursor, &token.text);
            } else if matches!(token.text.as_str(), "ROWS" | "RANGE") {
                // window frame bounds such as `UNBOUNDED PRECEDING` are not columns
                cursor.clause = Clause::Other;
            }
        }
        TokenKind::Comma => {
            cursor.pos += 1;
            if cursor.statement && cursor.clause == Clause::From {
                cursor.expect_table = true;
            }
        }
        TokenKind::Identifier | TokenKind::QuotedIdentifier => {
            let name = read_name(tokens, nodes, start);
            cursor.pos = name.end;

            if cursor.statement && cursor.clause == Clause::From && cursor.expect_table {
                cursor.expect_table = false;
                let (alias, next) = read_alias(tokens, nodes, name.end);
                cursor.pos = next;
                if let Some(table) = name.parts.last() {
                    refs.tables.push(TableReference {
                        name: table.clone(),
                        alias,
                    });
                }
            } else if cursor.clause.collects_columns()
                && !(cursor.unit_argument && previous_significant(tokens, nodes, start).is_none())
                && is_column(tokens, nodes, start, &name)
            {
                let mut parts = name.parts;
                if let Some(column) = parts.pop() {
                    refs.columns.push(ColumnReference {
                        qualifier: parts.pop(),
                        name: column,
                    });
                }
            }
        }
        _ => cursor.pos += 1,
    }

    None
}

fn enter_clause(cursor: &mut Cursor<'_>, keyword: &str) {
    match keyword {
        "SELECT" => cursor.clause = Clause::Projection,
        "FROM" | "JOIN" | "STRAIGHT_JOIN" => {
            cursor.clause = Clause::From;
            cursor.expect_table = true;
        }
        "WHERE" => cursor.clause = Clause::Where,
        "GROUP" | "ORDER" | "HAVING" | "LIMIT" | "OFFSET" | "ON" | "USING" | "UNION"
        | "INTERSECT" | "EXCEPT" | "INTO" | "WINDOW" | "FOR" | "LOCK" => {
            cursor.clause = Clause::Other;
            cursor.expect_table = false;
        }
        _ => {}
    }
}

struct DottedName {
    parts: Vec<String>,
    end: usize,
    wildcard: bool,
}

fn token_at<'t>(tokens: &'t [Token], nodes: &[Node], pos: usize) -> Option<&'t Token> {
    match nodes.get(pos) {
        Some(Node::Token(i)) => Some(&tokens[*i]),
        _ => None,
    }
}

// Reads `a`, `a.b`, `a.b.c` or `a.*` starting at `start`.
fn read_name(tokens: &[Token], nodes: &[Node], start: usize) -> DottedName {
    let mut parts = Vec::new();
    if let Some(first) = token_at(tokens, nodes, start) {
        parts.push(first.unquoted());
    }
    let mut pos = start + 1;
    let mut wildcard = false;

    while token_at(tokens, nodes, pos).is_some_and(|t| t.kind == TokenKind::Dot) {
        match token_at(tokens, nodes, pos + 1) {
            Some(next) if next.is_name() => {
                parts.push(next.unquoted());
                pos += 2;
            }
            Some(next) if next.kind == TokenKind::Star => {
                wildcard = true;
                pos += 2;
                break;
            }
            _ => break,
        }
    }

    DottedName {
        parts,
        end: pos,
        wildcard,
    }
}

// Reads `AS alias` or a bare `alias` at `pos`.
fn read_alias(tokens: &[Token], nodes: &[Node], pos: usize) -> (Option<String>, usize) {
    match token_at(tokens, nodes, pos) {
        Some(t) if t.is_keyword("AS") => match token_at(tokens, nodes, pos + 1) {
            Some(alias) if alias.is_name() || alias.kind == TokenKind::StringLiteral => {
                (Some(strip_quotes(alias)), pos + 2)
            }
            _ => (None, pos + 1),
        },
        Some(t) if t.is_name() => (Some(t.unquoted()), pos + 1),
        _ => (None, pos),
    }
}

fn strip_quotes(token: &Token) -> String {
    match token.kind {
        TokenKind::StringLiteral if token.text.len() >= 2 => {
            token.text[1..token.text.len() - 1].to_string()
        }
        _ => token.unquoted(),
    }
}

fn previous_significant<'n>(tokens: &[Token], nodes: &'n [Node], start: usize) -> Option<&'n Node> {
    nodes[..start]
        .iter()
        .rev()
        .find(|node| !matches!(node, Node::Token(i) if tokens[*i].is_comment()))
}

fn ends_value(token: &Token) -> bool {
    match token.kind {
        TokenKind::Identifier
        | TokenKind::QuotedIdentifier
        | TokenKind::StringLiteral
        | TokenKind::NumberLiteral => true,
        TokenKind::Keyword => matches!(
            token.text.as_str(),
            "END" | "NULL" | "TRUE" | "FALSE" | "CURRENT_DATE" | "CURRENT_TIME" | "CURRENT_TIMESTAMP"
        ),
        _ => false,
    }
}

// Decides whether the dotted name at `start` names a column rather than a
// function, an alias, a typed literal or a session variable.
fn is_column(tokens: &[Token], nodes: &[Node], start: usize, name: &DottedName) -> bool {
    if name.wildcard {
        return false;
    }

    match nodes.get(name.end) {
        Some(Node::Group(_)) => return false,
        Some(Node::Token(i))
            if name.parts.len() == 1 && tokens[*i].kind == TokenKind::StringLiteral =>
        {
            return false
        }
        _ => {}
    }

    match previous_significant(tokens, nodes, start) {
        None => true,
        Some(Node::Group(_)) => false,
        Some(Node::Token(i)) => {
            let prev = &tokens[*i];
            if prev.is_keyword("AS") || ends_value(prev) || follows_is(tokens, nodes, start) {
                return false;
            }
            !(prev.kind == TokenKind::Operator && (prev.text.ends_with('@') || prev.text.ends_with(':')))
        }
    }
}

// `x IS UNKNOWN` and `x IS NOT UNKNOWN` test a truth value, not a column.
fn follows_is(tokens: &[Token], nodes: &[Node], start: usize) -> bool {
    let keyword_at = |pos: usize| match nodes.get(pos) {
        Some(Node::Token(i)) => Some(&tokens[*i]).filter(|t| t.kind == TokenKind::Keyword),
        _ => None,
    };
    let before = |pos: usize| {
        nodes[..pos]
            .iter()
            .rposition(|node| !matches!(node, Node::Token(i) if tokens[*i].is_comment()))
    };

    match before(start).and_then(|p| keyword_at(p).map(|t| (p, t))) {
        Some((_, t)) if t.is_keyword("IS") => true,
        Some((p, t)) if t.is_keyword("NOT") => before(p)
            .and_then(keyword_at)
            .is_some_and(|t| t.is_keyword("IS")),
        _ => false,
    }
}
