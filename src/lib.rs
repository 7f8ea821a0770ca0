//! KQL: a small filter language for parsed log records.
//!
//! A query string is lexed and parsed into a [`QueryNode`] tree, which can
//! then be compiled into a parameterized SQL predicate for the columnar store
//! ([`SqlCompiler`]) and/or a query object for the full-text index
//! ([`IndexCompiler`]).
//!
//! ```
//! use kql::{parse, SqlCompiler};
//!
//! let tree = parse("user:alice duration:>500").unwrap();
//! let predicate = SqlCompiler::new().compile(tree.as_ref());
//! assert_eq!(predicate.sql, "(username = ? AND duration_ms > ?)");
//! assert_eq!(predicate.values, vec!["alice", "500"]);
//! ```

pub mod ast;
pub mod config;
pub mod error;
pub mod index_compiler;
pub mod lexer;
pub mod parser;
pub mod schema;
pub mod sql_compiler;
pub mod token;

pub use ast::{BoolOp, FieldFilter, FilterOp, QueryNode};
pub use error::QueryError;
pub use index_compiler::{IndexCompiler, IndexQuery};
pub use lexer::{tokenize, LexError};
pub use parser::{parse, ParseError};
pub use schema::FieldSchema;
pub use sql_compiler::{Predicate, SqlCompiler};

/// Both compilers over one shared schema, for callers that take a query
/// string straight from a request.
#[derive(Debug, Clone, Default)]
pub struct Kql {
    sql: SqlCompiler,
    index: IndexCompiler,
}

impl Kql {
    pub fn new(schema: FieldSchema) -> Self {
        Self {
            sql: SqlCompiler::with_schema(schema.clone()),
            index: IndexCompiler::with_schema(schema),
        }
    }

    pub fn schema(&self) -> &FieldSchema {
        self.sql.schema()
    }

    pub fn to_predicate(&self, query: &str) -> error::Result<Predicate> {
        let tree = parse(query)?;
        Ok(self.sql.compile(tree.as_ref()))
    }

    pub fn to_index_query(&self, query: &str) -> error::Result<IndexQuery> {
        let tree = parse(query)?;
        Ok(self.index.compile(tree.as_ref()))
    }

    pub fn sql_compiler(&self) -> &SqlCompiler {
        &self.sql
    }

    pub fn index_compiler(&self) -> &IndexCompiler {
        &self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_empty_query_matches_everything() {
        let kql = Kql::default();
        for query in ["", "   ", "\t\n"] {
            assert_eq!(parse(query).unwrap(), None);
            assert!(kql.to_predicate(query).unwrap().is_match_all());
            assert_eq!(kql.to_index_query(query).unwrap(), IndexQuery::MatchAll);
        }
    }

    #[test]
    fn test_field_filter_end_to_end() {
        let kql = Kql::default();
        let tree = parse("user:alice").unwrap().unwrap();
        assert_eq!(tree, QueryNode::filter("user", FilterOp::Equals, "alice"));

        let predicate = kql.to_predicate("user:alice").unwrap();
        assert_eq!(predicate.sql, "username = ?");
        assert_eq!(predicate.values, vec!["alice"]);
    }

    #[test]
    fn test_duration_range_end_to_end() {
        let kql = Kql::default();
        assert_eq!(
            parse("duration:>500").unwrap(),
            Some(QueryNode::filter("duration", FilterOp::GreaterThan, "500"))
        );

        let predicate = kql.to_predicate("duration:>500").unwrap();
        assert_eq!(predicate.sql, "duration_ms > ?");
        assert_eq!(predicate.values, vec!["500"]);

        assert_eq!(
            kql.to_index_query("duration:>500").unwrap(),
            IndexQuery::NumericRange {
                field: "duration_ms".to_string(),
                min: Some(500.0),
                max: None,
                inclusive_min: false,
                inclusive_max: false,
            }
        );
    }

    #[test]
    fn test_not_end_to_end() {
        let kql = Kql::default();
        assert_eq!(kql.to_predicate("NOT status:fail").unwrap().sql, "NOT (success = ?)");
        assert!(matches!(
            kql.to_index_query("NOT status:fail").unwrap(),
            IndexQuery::Boolean { .. }
        ));
    }

    #[test]
    fn test_errors_reject_the_whole_query() {
        let kql = Kql::default();
        assert!(matches!(kql.to_predicate("field:"), Err(QueryError::Parse(_))));
        assert!(matches!(kql.to_index_query("\"unterminated"), Err(QueryError::Lex(_))));
        let err = kql.to_predicate("user:alice (a OR b").unwrap_err();
        assert_eq!(err.position(), 11);
        assert!(err.to_string().starts_with("invalid query"));
    }

    #[test]
    fn test_compilers_do_not_mutate_the_tree() {
        let kql = Kql::default();
        let tree = parse("(type:sql OR name:ab*) AND NOT duration:>=10 timeout").unwrap();
        let snapshot = tree.clone();

        let predicate = kql.sql_compiler().compile(tree.as_ref());
        let index = kql.index_compiler().compile(tree.as_ref());
        assert_eq!(tree, snapshot);

        assert_eq!(kql.index_compiler().compile(tree.as_ref()), index);
        assert_eq!(kql.sql_compiler().compile(tree.as_ref()), predicate);
    }

    #[test]
    fn test_shared_across_threads() {
        let kql = Arc::new(Kql::default());
        let tree = Arc::new(parse("user:alice OR duration:<5").unwrap());
        let expected = kql.sql_compiler().compile((*tree).as_ref());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let kql = Arc::clone(&kql);
                let tree = Arc::clone(&tree);
                thread::spawn(move || {
                    (
                        kql.sql_compiler().compile((*tree).as_ref()),
                        kql.index_compiler().compile((*tree).as_ref()),
                    )
                })
            })
            .collect();

        for handle in handles {
            let (predicate, _) = handle.join().unwrap();
            assert_eq!(predicate, expected);
        }
    }

    #[test]
    fn test_custom_schema_reaches_both_compilers() {
        let schema = FieldSchema::new(
            [("lat".to_string(), "latency".to_string())],
            ["latency".to_string()],
            "line",
        );
        let kql = Kql::new(schema);
        assert_eq!(kql.to_predicate("lat:3").unwrap().sql, "latency = ?");
        assert_eq!(
            kql.to_index_query("lat:3").unwrap(),
            IndexQuery::Term {
                field: "latency".to_string(),
                term: "3".to_string(),
            }
        );
        assert!(matches!(
            kql.to_index_query("lat:>3").unwrap(),
            IndexQuery::NumericRange { .. }
        ));
        assert_eq!(kql.schema().raw_text_column(), "line");
    }
}
