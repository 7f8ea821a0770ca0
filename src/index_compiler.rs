//! Full-text index compiler: turns a query tree into a composable query object
//! for the inverted-index search engine.

use crate::ast::{BoolOp, FieldFilter, FilterOp, QueryNode};
use crate::schema::FieldSchema;
use serde::Serialize;

/// A query object the full-text index can execute directly.
///
/// Serializes as externally tagged snake_case JSON, e.g.
/// `{"term":{"field":"username","term":"alice"}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexQuery {
    /// Matches every document.
    MatchAll,
    /// All sub-queries must match.
    Conjunction(Vec<IndexQuery>),
    /// At least one sub-query must match.
    Disjunction(Vec<IndexQuery>),
    /// The index needs at least one positive clause, so negation is always
    /// expressed as `must: [match_all], must_not: [..]`.
    Boolean {
        must: Vec<IndexQuery>,
        must_not: Vec<IndexQuery>,
    },
    /// Exact, unanalyzed term on a field.
    Term { field: String, term: String },
    /// Index-native wildcard pattern (`*`), used as typed.
    Wildcard { field: String, pattern: String },
    NumericRange {
        field: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
        inclusive_min: bool,
        inclusive_max: bool,
    },
    /// Relevance-ranked match; without a field it searches all text.
    Match {
        #[serde(skip_serializing_if = "Option::is_none")]
        field: Option<String>,
        text: String,
    },
}

impl IndexQuery {
    /// `must: [match_all], must_not: [inner]`
    pub fn negate(inner: IndexQuery) -> Self {
        IndexQuery::Boolean {
            must: vec![IndexQuery::MatchAll],
            must_not: vec![inner],
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        // Infallible: string keys only, non-finite floats serialize as null.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Compiler from query trees to index query objects
#[derive(Debug, Clone, Default)]
pub struct IndexCompiler {
    schema: FieldSchema,
}

impl IndexCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(schema: FieldSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    /// Compile a query tree; `None` (empty query) matches everything.
    pub fn compile(&self, tree: Option<&QueryNode>) -> IndexQuery {
        let query = match tree {
            Some(node) => self.compile_node(node),
            None => IndexQuery::MatchAll,
        };
        tracing::debug!(query = ?query, "compiled index query");
        query
    }

    fn compile_node(&self, node: &QueryNode) -> IndexQuery {
        match node {
            QueryNode::Filter(filter) => self.compile_filter(filter),
            QueryNode::Bool { op, children } => {
                let mut compiled = children.iter().map(|child| self.compile_node(child));
                match op {
                    BoolOp::And => IndexQuery::Conjunction(compiled.collect()),
                    BoolOp::Or => IndexQuery::Disjunction(compiled.collect()),
                    BoolOp::Not => match compiled.next() {
                        Some(inner) => IndexQuery::negate(inner),
                        None => IndexQuery::negate(IndexQuery::MatchAll),
                    },
                }
            }
        }
    }

    fn compile_filter(&self, filter: &FieldFilter) -> IndexQuery {
        let column = match &filter.field {
            Some(field) => self.schema.resolve(field),
            None if filter.op == FilterOp::FullText => {
                return IndexQuery::Match {
                    field: None,
                    text: filter.value.clone(),
                };
            }
            None => self.schema.raw_text_column(),
        };

        match filter.op {
            FilterOp::FullText => IndexQuery::Match {
                field: Some(column.to_string()),
                text: filter.value.clone(),
            },
            FilterOp::Equals => self.equality(column, &filter.value),
            FilterOp::NotEquals => IndexQuery::negate(self.equality(column, &filter.value)),
            FilterOp::Wildcard => IndexQuery::Wildcard {
                field: column.to_string(),
                pattern: filter.value.clone(),
            },
            op => self.range(column, op, &filter.value),
        }
    }

    /// Equality is always an exact term, numeric column or not.
    fn equality(&self, column: &str, value: &str) -> IndexQuery {
        IndexQuery::Term {
            field: column.to_string(),
            term: value.to_string(),
        }
    }

    fn range(&self, column: &str, op: FilterOp, value: &str) -> IndexQuery {
        debug_assert!(op.is_range(), "{:?} is not a range operator", op);
        let Some(bound) = parse_number(value) else {
            tracing::debug!(
                column,
                value,
                numeric = self.schema.is_numeric(column),
                "non-numeric range value, falling back to match"
            );
            return IndexQuery::Match {
                field: Some(column.to_string()),
                text: value.to_string(),
            };
        };

        let (min, max, inclusive_min, inclusive_max) = match op {
            FilterOp::GreaterThan => (Some(bound), None, false, false),
            FilterOp::GreaterOrEqual => (Some(bound), None, true, false),
            FilterOp::LessThan => (None, Some(bound), false, false),
            _ => (None, Some(bound), false, true),
        };
        IndexQuery::NumericRange {
            field: column.to_string(),
            min,
            max,
            inclusive_min,
            inclusive_max,
        }
    }
}

/// Finite floating-point value, or `None`.
fn parse_number(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|n| n.is_finite())
}
