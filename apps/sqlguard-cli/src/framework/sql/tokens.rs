//! Lexical layer of the structural analyzer.
//!
//! The lexer is deliberately forgiving: anything that is not a recognised
//! token becomes [`TokenKind::Other`] so that only genuinely unscannable text
//! (an unterminated quote) is reported as a [`SyntaxError`]. Parenthesis
//! balance is checked by the tree builder, not here.

use logos::Logos;
use std::ops::Range;

use super::SyntaxError;

// =========================================================
// Keywords
// =========================================================

/// Words classified as keywords. Anything else made of word characters is an
/// identifier. Matching is case-insensitive; lookups use the upper-cased text.
///
/// Only words that steer statement or clause handling belong here. Words that
/// MySQL accepts as bare column names (`year`, `day`, `mode`, `current`)
/// stay identifiers and are told apart from syntax by position.
const KEYWORDS: &[&str] = &[
    // statement kinds
    "SELECT",
    "INSERT",
    "UPDATE",
    "DELETE",
    "REPLACE",
    "MERGE",
    "DROP",
    "CREATE",
    "ALTER",
    "TRUNCATE",
    "RENAME",
    "GRANT",
    "REVOKE",
    "CALL",
    "EXEC",
    "EXECUTE",
    "DO",
    "HANDLER",
    "LOAD",
    "SET",
    "SHOW",
    "DESCRIBE",
    "EXPLAIN",
    "USE",
    "WITH",
    "LOCK",
    "UNLOCK",
    // clauses
    "FROM",
    "WHERE",
    "JOIN",
    "INNER",
    "LEFT",
    "RIGHT",
    "FULL",
    "CROSS",
    "OUTER",
    "NATURAL",
    "STRAIGHT_JOIN",
    "ON",
    "USING",
    "GROUP",
    "ORDER",
    "BY",
    "HAVING",
    "LIMIT",
    "OFFSET",
    "UNION",
    "INTERSECT",
    "EXCEPT",
    "ALL",
    "DISTINCT",
    "DISTINCTROW",
    "AS",
    "INTO",
    "OUTFILE",
    "VALUES",
    "WINDOW",
    "OVER",
    "PARTITION",
    "ROWS",
    "RANGE",
    "ROW",
    "ROLLUP",
    "FOR",
    // predicates and operators
    "AND",
    "OR",
    "NOT",
    "XOR",
    "IN",
    "IS",
    "NULL",
    "LIKE",
    "RLIKE",
    "REGEXP",
    "ESCAPE",
    "BETWEEN",
    "EXISTS",
    "ANY",
    "SOME",
    "DIV",
    "MOD",
    "COLLATE",
    "BINARY",
    "TRUE",
    "FALSE",
    "ASC",
    "DESC",
    // expressions
    "CASE",
    "WHEN",
    "THEN",
    "ELSE",
    "END",
    "INTERVAL",
    "SEPARATOR",
    "LEADING",
    "TRAILING",
    "BOTH",
    "SIGNED",
    "UNSIGNED",
    "CURRENT_DATE",
    "CURRENT_TIME",
    "CURRENT_TIMESTAMP",
];

/// Returns the canonical upper-case spelling if `word` is a keyword.
pub fn keyword(word: &str) -> Option<&'static str> {
    let upper = word.to_ascii_uppercase();
    KEYWORDS.iter().copied().find(|k| *k == upper)
}

// =========================================================
// Raw lexer
// =========================================================

fn skip_block_comment(lex: &mut logos::Lexer<RawToken>) -> bool {
    match lex.remainder().find("*/") {
        Some(end) => lex.bump(end + 2),
        None => lex.bump(lex.remainder().len()),
    }
    true
}

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum RawToken {
    #[regex(r"[\p{L}_][\p{L}\p{N}_$]*")]
    Word,

    #[regex(r"`([^`]|``)*`")]
    QuotedIdentifier,

    #[regex(r#"'([^'\\]|\\.|'')*'"#)]
    #[regex(r#""([^"\\]|\\.|"")*""#)]
    String,

    #[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?")]
    #[regex(r"\.[0-9]+")]
    Number,

    #[token("(")]
    LeftParen,

    #[token(")")]
    RightParen,

    #[token(",")]
    Comma,

    #[token(".")]
    Dot,

    #[token(";")]
    Semicolon,

    #[token("*")]
    Star,

    #[regex(r"[<>=!+%|&^~:@?]+")]
    #[token("-")]
    #[token("/")]
    Operator,

    #[regex(r"--[^\n]*")]
    #[regex(r"#[^\n]*")]
    LineComment,

    #[token("/*", skip_block_comment)]
    BlockComment,

    #[regex(r"[ \t\r\n\f]+", logos::skip)]
    #[regex(".", priority = 0)]
    Other,
}

// =========================================================
// Public token model
// =========================================================

/// Classification of a scanned token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Keyword,
    Identifier,
    QuotedIdentifier,
    StringLiteral,
    NumberLiteral,
    LeftParen,
    RightParen,
    Comma,
    Dot,
    Semicolon,
    Star,
    Operator,
    Comment,
    Other,
}

/// A single scanned token with its byte span in the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Range<usize>,
}

impl Token {
    /// True when this is the keyword `kw` (which must be upper case).
    pub fn is_keyword(&self, kw: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text == kw
    }

    pub fn is_comment(&self) -> bool {
        self.kind == TokenKind::Comment
    }

    pub fn is_name(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Identifier | TokenKind::QuotedIdentifier
        )
    }

    /// Name with surrounding backticks removed and doubled backticks collapsed.
    pub fn unquoted(&self) -> String {
        match self.kind {
            TokenKind::QuotedIdentifier if self.text.len() >= 2 => {
                self.text[1..self.text.len() - 1].replace("``", "`")
            }
            _ => self.text.clone(),
        }
    }
}

// A quote char that no literal rule could close
fn unclosed_quote(slice: &str, position: usize) -> Result<(), SyntaxError> {
    match slice.chars().next() {
        Some('\'') | Some('"') => Err(SyntaxError::UnterminatedString { position }),
        Some('`') => Err(SyntaxError::UnterminatedIdentifier { position }),
        _ => Ok(()),
    }
}

/// Scans `input` into tokens. Keywords are stored upper-cased; every other
/// token keeps its source spelling.
pub fn tokenize(input: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut lexer = RawToken::lexer(input);
    let mut tokens = Vec::new();

    while let Some(raw) = lexer.next() {
        let span = lexer.span();
        let slice = lexer.slice();
        let kind = match raw {
            // a qualified name part is always an identifier, even `t.order`
            Ok(RawToken::Word) if tokens.last().is_some_and(|t: &Token| t.kind == TokenKind::Dot) => {
                TokenKind::Identifier
            }
            Ok(RawToken::Word) => match keyword(slice) {
                Some(_) => TokenKind::Keyword,
                None => TokenKind::Identifier,
            },
            Ok(RawToken::QuotedIdentifier) => TokenKind::QuotedIdentifier,
            Ok(RawToken::String) => TokenKind::StringLiteral,
            Ok(RawToken::Number) => TokenKind::NumberLiteral,
            Ok(RawToken::LeftParen) => TokenKind::LeftParen,
            Ok(RawToken::RightParen) => TokenKind::RightParen,
            Ok(RawToken::Comma) => TokenKind::Comma,
            Ok(RawToken::Dot) => TokenKind::Dot,
            Ok(RawToken::Semicolon) => TokenKind::Semicolon,
            Ok(RawToken::Star) => TokenKind::Star,
            Ok(RawToken::Operator) => TokenKind::Operator,
            Ok(RawToken::LineComment) | Ok(RawToken::BlockComment) => TokenKind::Comment,
            Ok(RawToken::Other) => {
                unclosed_quote(slice, span.start)?;
                TokenKind::Other
            }
            Err(()) => {
                unclosed_quote(slice, span.start)?;
                return Err(SyntaxError::Unrecognized {
                    position: span.start,
                });
            }
        };

        let text = match kind {
            TokenKind::Keyword => slice.to_ascii_uppercase(),
            _ => slice.to_string(),
        };
        tokens.push(Token { kind, text, span });
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(sql: &str) -> Vec<TokenKind> {
        tokenize(sql).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        let tokens = tokenize("select Name from Customers").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Keyword);
        assert_eq!(tokens[0].text, "SELECT");
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert_eq!(tokens[1].text, "Name");
        assert!(tokens[2].is_keyword("FROM"));
        assert_eq!(tokens[3].text, "Customers");
    }

    #[test]
    fn test_qualified_identifier_splits_on_dot() {
        assert_eq!(
            kinds("c.customerName"),
            vec![TokenKind::Identifier, TokenKind::Dot, TokenKind::Identifier]
        );
    }

    #[test]
    fn test_word_after_dot_keeps_its_spelling() {
        let tokens = tokenize("s.Order, s.year").unwrap();
        assert_eq!(tokens[2].kind, TokenKind::Identifier);
        assert_eq!(tokens[2].text, "Order");
        assert_eq!(tokens[6].kind, TokenKind::Identifier);
        assert_eq!(tokens[6].text, "year");
    }

    #[test]
    fn test_non_reserved_words_are_identifiers() {
        assert_eq!(
            kinds("day hour mode current"),
            vec![TokenKind::Identifier; 4]
        );
        assert_eq!(kinds("ORDER ROWS"), vec![TokenKind::Keyword; 2]);
    }

    #[test]
    fn test_string_literals_hide_keywords() {
        let tokens = tokenize("SELECT 'a JOIN b' FROM t").unwrap();
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[1].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[1].text, "'a JOIN b'");
    }

    #[test]
    fn test_doubled_quote_inside_string() {
        let tokens = tokenize("SELECT 'it''s' AS x").unwrap();
        assert_eq!(tokens[1].text, "'it''s'");
        assert_eq!(tokens.len(), 4);
    }

    #[test]
    fn test_double_quoted_text_is_a_string() {
        let tokens = tokenize(r#"WHERE country = "USA""#).unwrap();
        assert_eq!(tokens[3].kind, TokenKind::StringLiteral);
    }

    #[test]
    fn test_backtick_identifier_unquoted() {
        let tokens = tokenize("SELECT `order date` FROM `orders`").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::QuotedIdentifier);
        assert_eq!(tokens[1].unquoted(), "order date");
        assert_eq!(tokens[3].unquoted(), "orders");
    }

    #[test]
    fn test_unterminated_string_reports_position() {
        let err = tokenize("SELECT * FROM t WHERE a = 'abc").unwrap_err();
        assert_eq!(err, SyntaxError::UnterminatedString { position: 26 });
    }

    #[test]
    fn test_unterminated_backtick() {
        let err = tokenize("SELECT `abc FROM t").unwrap_err();
        assert_eq!(err, SyntaxError::UnterminatedIdentifier { position: 7 });
    }

    #[test]
    fn test_comments_are_tokens() {
        let tokens = tokenize("SELECT 1 -- trailing\n/* block */ FROM t").unwrap();
        let comments: Vec<_> = tokens.iter().filter(|t| t.is_comment()).collect();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].text, "-- trailing");
        assert_eq!(comments[1].text, "/* block */");
    }

    #[test]
    fn test_unterminated_block_comment_runs_to_end() {
        let tokens = tokenize("SELECT 1 /* never closed").unwrap();
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Comment);
    }

    #[test]
    fn test_numbers_and_operators() {
        assert_eq!(
            kinds("a >= 1.5 AND b <> -2"),
            vec![
                TokenKind::Identifier,
                TokenKind::Operator,
                TokenKind::NumberLiteral,
                TokenKind::Keyword,
                TokenKind::Identifier,
                TokenKind::Operator,
                TokenKind::Operator,
                TokenKind::NumberLiteral,
            ]
        );
    }

    #[test]
    fn test_spans_cover_source_text() {
        let sql = "SELECT x FROM t LIMIT 50";
        let tokens = tokenize(sql).unwrap();
        let limit_value = tokens.last().unwrap();
        assert_eq!(&sql[limit_value.span.clone()], "50");
    }

    #[test]
    fn test_unknown_characters_do_not_fail() {
        let tokens = tokenize("SELECT a \u{00a7} b").unwrap();
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Other));
    }
}
