//! Errors that reject a query as a whole.

use crate::lexer::LexError;
use crate::parser::ParseError;
use thiserror::Error;

/// A query either lexes and parses completely or is rejected; there is no
/// partial result to salvage.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("invalid query: {0}")]
    Lex(#[from] LexError),
    #[error("invalid query: {0}")]
    Parse(#[from] ParseError),
}

impl QueryError {
    /// Byte offset in the query string the error points at.
    pub fn position(&self) -> usize {
        match self {
            QueryError::Lex(e) => e.position(),
            QueryError::Parse(e) => e.position(),
        }
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;
