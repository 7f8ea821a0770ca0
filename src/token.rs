//! The token definition for the KQL filter language.

use std::fmt;

/// A token is a single unit of the language, with a specific kind and location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Span,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind<'a>, start: usize, end: usize) -> Self {
        Self {
            kind,
            span: Span::new(start, end),
        }
    }

    /// The text of a word token, quoted or not.
    pub fn word(&self) -> Option<&'a str> {
        match self.kind {
            TokenKind::Word(s) | TokenKind::Quoted(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this is a bare word equal to `keyword`, ignoring case.
    /// Quoted words are never keywords.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self.kind, TokenKind::Word(s) if s.eq_ignore_ascii_case(keyword))
    }
}

/// The kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind<'a> {
    // Literals
    Word(&'a str),
    Quoted(&'a str), // The content between the quotes

    // Punctuation
    Colon,  // :
    LParen, // (
    RParen, // )

    // Operators
    Gt,  // >
    Gte, // >=
    Lt,  // <
    Lte, // <=

    // Special
    Eof, // End of input
}

impl fmt::Display for TokenKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Word(s) => write!(f, "'{}'", s),
            TokenKind::Quoted(s) => write!(f, "\"{}\"", s),
            TokenKind::Colon => f.write_str("':'"),
            TokenKind::LParen => f.write_str("'('"),
            TokenKind::RParen => f.write_str("')'"),
            TokenKind::Gt => f.write_str("'>'"),
            TokenKind::Gte => f.write_str("'>='"),
            TokenKind::Lt => f.write_str("'<'"),
            TokenKind::Lte => f.write_str("'<='"),
            TokenKind::Eof => f.write_str("end of input"),
        }
    }
}

/// Represents a span in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// The starting byte offset.
    pub start: usize,
    /// The ending byte offset.
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}
