//! 查询树：解析器的输出，也是两个编译器唯一的输入
//!
//! 树自底向上构建，构建完成后不再修改，可以在多个编译器之间共享。

use crate::lexer::is_word_char;
use crate::parser::is_value_continuation;
use std::fmt;

/// 查询树节点。叶子是字段过滤条件，分支是布尔组合
#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    /// 叶子节点, 例如：`user:alice`、`duration:>500`、`timeout`
    Filter(FieldFilter),
    /// 分支节点。解析器产生的 NOT 只有一个子节点, AND/OR 恰好两个
    Bool { op: BoolOp, children: Vec<QueryNode> },
}

/// 单个字段上的比较，或不带字段的全文检索词
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    /// 用户输入的原始字段别名，全文检索叶子没有字段
    pub field: Option<String>,
    pub op: FilterOp,
    pub value: String,
}

/// 叶子比较运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOp {
    Equals,         // field:value
    NotEquals,      // 只能通过 API 构造
    GreaterThan,    // field:>value
    GreaterOrEqual, // field:>=value
    LessThan,       // field:<value
    LessOrEqual,    // field:<=value
    Wildcard,       // field:ab*cd
    FullText,       // value
}

/// 布尔组合运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoolOp {
    And,
    Or,
    Not,
}

impl FilterOp {
    /// 范围运算符 (`>`, `>=`, `<`, `<=`)
    pub fn is_range(self) -> bool {
        matches!(
            self,
            FilterOp::GreaterThan | FilterOp::GreaterOrEqual | FilterOp::LessThan | FilterOp::LessOrEqual
        )
    }
}

impl FieldFilter {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            op,
            value: value.into(),
        }
    }

    pub fn full_text(value: impl Into<String>) -> Self {
        Self {
            field: None,
            op: FilterOp::FullText,
            value: value.into(),
        }
    }
}

impl QueryNode {
    pub fn and(left: QueryNode, right: QueryNode) -> Self {
        QueryNode::Bool {
            op: BoolOp::And,
            children: vec![left, right],
        }
    }

    pub fn or(left: QueryNode, right: QueryNode) -> Self {
        QueryNode::Bool {
            op: BoolOp::Or,
            children: vec![left, right],
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: QueryNode) -> Self {
        QueryNode::Bool {
            op: BoolOp::Not,
            children: vec![inner],
        }
    }

    pub fn filter(field: impl Into<String>, op: FilterOp, value: impl Into<String>) -> Self {
        QueryNode::Filter(FieldFilter::new(field, op, value))
    }

    pub fn full_text(value: impl Into<String>) -> Self {
        QueryNode::Filter(FieldFilter::full_text(value))
    }
}

/// 以规范的 KQL 形式输出，分支总是加括号
impl fmt::Display for QueryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryNode::Filter(filter) => write!(f, "{}", filter),
            QueryNode::Bool { op: BoolOp::Not, children } => {
                f.write_str("NOT ")?;
                match children.first() {
                    Some(child) => write!(f, "{}", child),
                    None => f.write_str("()"),
                }
            }
            QueryNode::Bool { op, children } => {
                let keyword = if *op == BoolOp::And { " AND " } else { " OR " };
                f.write_str("(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(keyword)?;
                    }
                    write!(f, "{}", child)?;
                }
                f.write_str(")")
            }
        }
    }
}

impl fmt::Display for FieldFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(field) = &self.field else {
            return write_term(f, &self.value);
        };
        let prefix = match self.op {
            FilterOp::GreaterThan => ">",
            FilterOp::GreaterOrEqual => ">=",
            FilterOp::LessThan => "<",
            FilterOp::LessOrEqual => "<=",
            _ => "",
        };
        if self.op == FilterOp::NotEquals {
            f.write_str("NOT ")?;
        }
        write!(f, "{}:{}", field, prefix)?;
        write_value(f, &self.value)
    }
}

/// 全文检索词：关键字或含非单词字符时加引号
fn write_term(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    let is_keyword = ["and", "or", "not"].iter().any(|k| value.eq_ignore_ascii_case(k));
    if !is_keyword && is_bare_word(value) {
        f.write_str(value)
    } else {
        write!(f, "\"{}\"", value)
    }
}

/// 字段值：只有能被续接规则原样还原的冒号才保持不加引号
fn write_value(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    let mut segments = value.split(':');
    let bare = segments.next().is_some_and(is_bare_word) && segments.all(is_value_continuation);
    if bare {
        f.write_str(value)
    } else {
        write!(f, "\"{}\"", value)
    }
}

fn is_bare_word(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_word_char)
}
