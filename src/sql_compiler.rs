//! SQL compiler that turns a query tree into a parameterized predicate for the
//! columnar log store.
//!
//! The output is a `WHERE`-clause fragment with `?` placeholders and the
//! values to bind, in placeholder order. Values only ever travel as bound
//! parameters; column names that are not plain identifiers are quoted.

use crate::ast::{BoolOp, FieldFilter, FilterOp, QueryNode};
use crate::schema::FieldSchema;
use sea_query::{Expr, SimpleExpr, Value, Values};
use std::borrow::Cow;

/// Fragment that matches every row.
pub const MATCH_ALL: &str = "1 = 1";
/// Fragment that matches no row.
pub const MATCH_NONE: &str = "1 = 0";

/// A compiled predicate: SQL text plus positional bound values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub sql: String,
    pub values: Vec<String>,
}

impl Predicate {
    pub fn match_all() -> Self {
        Self {
            sql: MATCH_ALL.to_string(),
            values: Vec::new(),
        }
    }

    pub fn is_match_all(&self) -> bool {
        self.sql == MATCH_ALL && self.values.is_empty()
    }

    /// Wrap the predicate as a sea-query expression so it can be and-ed into
    /// a larger statement (tenant scoping, time window) by the caller.
    pub fn to_expr(&self) -> SimpleExpr {
        Expr::cust_with_values(self.sql.as_str(), self.values.iter().map(String::as_str))
    }

    /// The bound values as sea-query values, for positional binding.
    pub fn bind_values(&self) -> Values {
        Values(self.values.iter().map(|v| Value::from(v.as_str())).collect())
    }
}

/// SQL Compiler that converts a query tree to a predicate
#[derive(Debug, Clone, Default)]
pub struct SqlCompiler {
    schema: FieldSchema,
}

impl SqlCompiler {
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
    pub fn compile(&self, tree: Option<&QueryNode>) -> Predicate {
        let Some(node) = tree else {
            return Predicate::match_all();
        };

        let mut predicate = Predicate {
            sql: String::new(),
            values: Vec::new(),
        };
        self.compile_node(node, &mut predicate);
        tracing::debug!(sql = %predicate.sql, bound = predicate.values.len(), "compiled predicate");
        predicate
    }

    fn compile_node(&self, node: &QueryNode, out: &mut Predicate) {
        match node {
            QueryNode::Filter(filter) => self.compile_filter(filter, out),
            QueryNode::Bool { op: BoolOp::Not, children } => {
                out.sql.push_str("NOT (");
                match children.first() {
                    Some(child) => self.compile_node(child, out),
                    None => out.sql.push_str(MATCH_ALL),
                }
                out.sql.push(')');
            }
            QueryNode::Bool { op, children } => {
                if children.is_empty() {
                    let empty = if *op == BoolOp::And { MATCH_ALL } else { MATCH_NONE };
                    out.sql.push_str(empty);
                    return;
                }
                let keyword = if *op == BoolOp::And { " AND " } else { " OR " };
                out.sql.push('(');
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        out.sql.push_str(keyword);
                    }
                    self.compile_node(child, out);
                }
                out.sql.push(')');
            }
        }
    }

    /// Compile a single leaf as `column OP ?`
    fn compile_filter(&self, filter: &FieldFilter, out: &mut Predicate) {
        let column = match &filter.field {
            Some(field) => self.schema.resolve(field),
            None => self.schema.raw_text_column(),
        };

        let (op, value) = match filter.op {
            FilterOp::FullText => ("ILIKE", format!("%{}%", escape_like(&filter.value))),
            FilterOp::Wildcard => ("LIKE", escape_like(&filter.value).replace('*', "%")),
            FilterOp::Equals => ("=", filter.value.clone()),
            FilterOp::NotEquals => ("!=", filter.value.clone()),
            FilterOp::GreaterThan => (">", filter.value.clone()),
            FilterOp::GreaterOrEqual => (">=", filter.value.clone()),
            FilterOp::LessThan => ("<", filter.value.clone()),
            FilterOp::LessOrEqual => ("<=", filter.value.clone()),
        };

        out.sql.push_str(&quote_column(column));
        out.sql.push(' ');
        out.sql.push_str(op);
        out.sql.push_str(" ?");
        out.values.push(value);
    }
}

/// Plain identifiers (`[A-Za-z_][A-Za-z0-9_.]*`) pass through; anything else
/// becomes a double-quoted identifier with `"` doubled.
///
/// `?` is the placeholder marker, so it never survives inside a quoted name.
pub fn quote_column(column: &str) -> Cow<'_, str> {
    let mut chars = column.chars();
    let plain = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if plain {
        return Cow::Borrowed(column);
    }

    let mut quoted = String::with_capacity(column.len() + 2);
    quoted.push('"');
    for c in column.chars() {
        match c {
            '"' => quoted.push_str("\"\""),
            '?' => quoted.push('_'),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    Cow::Owned(quoted)
}

/// Escape the LIKE metacharacters `\`, `%` and `_` with a backslash.
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
