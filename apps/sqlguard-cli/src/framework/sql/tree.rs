use std::fmt;

use super::references::{self, References};
use super::tokens::{Token, TokenKind};
use super::{ColumnReference, SyntaxError, TableReference};

/// A node of the structural tree. Leaf tokens are stored as indexes into the
/// tree's flat token stream.
#[derive(Debug)]
pub enum Node {
    Token(usize),
    Group(Group),
}

/// A parenthesized span. `open` and `close` index the parenthesis tokens.
#[derive(Debug)]
pub struct Group {
    pub open: usize,
    pub close: usize,
    pub children: Vec<Node>,
}

/// Lightweight parse of a single SQL statement.
///
/// All traversals over the tree (including `Drop`) use explicit stacks so
/// adversarially deep nesting cannot exhaust the call stack.
pub struct StructuralTree {
    source: String,
    tokens: Vec<Token>,
    root: Vec<Node>,
    references: References,
}

impl StructuralTree {
    pub(super) fn build(source: &str, tokens: Vec<Token>) -> Result<Self, SyntaxError> {
        let root = nest(&tokens)?;
        let references = references::collect(&tokens, &root);
        Ok(StructuralTree {
            source: source.to_string(),
            tokens,
            root,
            references,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Every scanned token in source order, parentheses and comments included.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Top-level nodes of the statement.
    pub fn nodes(&self) -> &[Node] {
        &self.root
    }

    pub fn token(&self, index: usize) -> &Token {
        &self.tokens[index]
    }

    /// The first non-comment top-level token when it is a keyword.
    pub fn leading_keyword(&self) -> Option<&str> {
        self.root
            .iter()
            .find_map(|node| match node {
                Node::Token(i) if self.tokens[*i].is_comment() => None,
                Node::Token(i) => Some(Some(&self.tokens[*i])),
                Node::Group(_) => Some(None),
            })
            .flatten()
            .filter(|token| token.kind == TokenKind::Keyword)
            .map(|token| token.text.as_str())
    }

    /// True when the group's first non-comment child is the `SELECT` keyword.
    pub fn is_subquery(&self, group: &Group) -> bool {
        is_subquery(&self.tokens, group)
    }

    pub fn tables(&self) -> &[TableReference] {
        &self.references.tables
    }

    pub fn columns(&self) -> &[ColumnReference] {
        &self.references.columns
    }

    /// Aliases bound to parenthesized derived tables in `FROM`/`JOIN`.
    pub fn derived_aliases(&self) -> &[String] {
        &self.references.derived_aliases
    }
}

impl fmt::Debug for StructuralTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructuralTree")
            .field("leading_keyword", &self.leading_keyword())
            .field("tokens", &self.tokens.len())
            .field("tables", &self.references.tables)
            .field("columns", &self.references.columns)
            .finish()
    }
}

impl Drop for StructuralTree {
    fn drop(&mut self) {
        dismantle(std::mem::take(&mut self.root));
    }
}

pub(super) fn is_subquery(tokens: &[Token], group: &Group) -> bool {
    group
        .children
        .iter()
        .find_map(|node| match node {
            Node::Token(i) if tokens[*i].is_comment() => None,
            Node::Token(i) => Some(tokens[*i].is_keyword("SELECT")),
            Node::Group(_) => Some(false),
        })
        .unwrap_or(false)
}

// Drops nested groups without recursion.
fn dismantle(nodes: Vec<Node>) {
    let mut pending = nodes;
    while let Some(node) = pending.pop() {
        if let Node::Group(mut group) = node {
            pending.append(&mut group.children);
        }
    }
}

fn nest(tokens: &[Token]) -> Result<Vec<Node>, SyntaxError> {
    let mut open_groups: Vec<(usize, Vec<Node>)> = Vec::new();
    let mut current: Vec<Node> = Vec::new();

    for (index, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::LeftParen => {
                open_groups.push((index, std::mem::take(&mut current)));
            }
            TokenKind::RightParen => {
                let Some((open, parent)) = open_groups.pop() else {
                    dismantle(current);
                    return Err(SyntaxError::UnexpectedClosingParenthesis {
                        position: token.span.start,
                    });
                };
                let children = std::mem::replace(&mut current, parent);
                current.push(Node::Group(Group {
                    open,
                    close: index,
                    children,
                }));
            }
            _ => current.push(Node::Token(index)),
        }
    }

    if let Some(position) = open_groups
        .first()
        .map(|(open, _)| tokens[*open].span.start)
    {
        dismantle(current);
        for (_, nodes) in open_groups {
            dismantle(nodes);
        }
        return Err(SyntaxError::UnclosedParenthesis { position });
    }

    Ok(current)
}
