//! KQL 的语法分析器
//!
//! ## 解析流程图
//!
//! ```text
//! parse()
//!   ├─ tokenize() 词法分析，空输入直接返回 None
//!   └─ parse_or_expression()
//!        ├─ parse_and_expression()
//!        │    ├─ parse_not_expression()
//!        │    │    └─ parse_primary_expression()
//!        │    │         ├─ "(" → 分组表达式 (递归调用parse_or_expression)
//!        │    │         ├─ 单词 ":" → parse_field_value()
//!        │    │         └─ 单词 → 全文检索叶子
//!        │    │
//!        │    └─ 遇到AND或相邻的项时，继续解析右侧NOT表达式
//!        │
//!        └─ 遇到OR时，继续解析右侧AND表达式
//! ```
//!
//! ## 语法优先级（从高到低）
//!
//! 1. **括号分组** `(expression)`
//! 2. **NOT操作** `NOT expression`
//! 3. **字段比较** `field:value`, `field:>value`, `field:ab*`
//! 4. **AND操作** `expr1 AND expr2` 或 `expr1 expr2`
//! 5. **OR操作** `expr1 OR expr2`
//!
//! 关键字不区分大小写，只对不带引号、后面不跟 `:` 的单词生效。
//!
//! ## 解析示例
//!
//! ```text
//! user:alice                      → user = alice
//! duration:>500 error             → duration > 500 AND 全文 "error"
//! a OR b AND c                    → a OR (b AND c)
//! timestamp:2026-02-10T10:00:00   → 一个叶子，值为完整的时间戳
//! ```

use crate::ast::{FieldFilter, FilterOp, QueryNode};
use crate::error::QueryError;
use crate::lexer::tokenize;
use crate::token::{Token, TokenKind};
use thiserror::Error;

/// 查询树的最大深度：括号、NOT 以及 AND/OR 链的每一步各算一层
pub const MAX_DEPTH: usize = 256;

/// 语法错误，任何一个都会使整个查询失效
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing value after '{field}:' at position {position}")]
    MissingValue { field: String, position: usize },

    #[error("unclosed parenthesis opened at position {position}")]
    UnclosedParen { position: usize },

    #[error("unexpected {found} at position {position}")]
    TrailingInput { found: String, position: usize },

    #[error("expected a search term, found {found} at position {position}")]
    EmptyAtom { found: String, position: usize },

    #[error("query nested deeper than {max} levels at position {position}")]
    TooDeep { max: usize, position: usize },
}

impl ParseError {
    pub fn position(&self) -> usize {
        match self {
            ParseError::MissingValue { position, .. }
            | ParseError::UnclosedParen { position }
            | ParseError::TrailingInput { position, .. }
            | ParseError::EmptyAtom { position, .. }
            | ParseError::TooDeep { position, .. } => *position,
        }
    }
}

/// 冒号之后的片段是否属于同一个值：只含数字和 `. - +`，且至少有一个数字
///
/// 这让 `10:00:00` 这样的时间和 `+05:00` 这样的时区偏移作为一个值通过。
pub fn is_value_continuation(segment: &str) -> bool {
    segment.chars().any(|c| c.is_ascii_digit())
        && segment.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+'))
}

/// 解析查询字符串。空白输入返回 `None`，表示不过滤
pub fn parse(query: &str) -> Result<Option<QueryNode>, QueryError> {
    let tokens = tokenize(query)?;
    let tree = Parser::new(&tokens).parse()?;
    tracing::debug!(query, tree = ?tree, "parsed query");
    Ok(tree)
}

pub struct Parser<'a> {
    tokens: &'a [Token<'a>],
    position: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    /// `tokens` 应以 `Eof` 结尾（`tokenize` 的输出）
    pub fn new(tokens: &'a [Token<'a>]) -> Self {
        Self {
            tokens,
            position: 0,
            depth: 0,
        }
    }

    /// 返回当前 token，不推进位置
    fn peek(&self) -> &Token<'a> {
        self.peek_nth(0)
    }

    /// 返回当前位置之后第 n 个 token；越界时视为 `Eof`
    fn peek_nth(&self, n: usize) -> &Token<'a> {
        const EOF: &Token<'static> = &Token {
            kind: TokenKind::Eof,
            span: crate::token::Span { start: 0, end: 0 },
        };
        self.tokens
            .get(self.position + n)
            .or_else(|| self.tokens.last())
            .unwrap_or(EOF)
    }

    /// 返回当前 token 并推进位置（`Eof` 不被消费）
    fn advance(&mut self) -> &Token<'a> {
        if self.position < self.tokens.len() && self.tokens[self.position].kind != TokenKind::Eof {
            self.position += 1;
            &self.tokens[self.position - 1]
        } else {
            self.peek()
        }
    }

    /// 当前 token 为 `kind` 时消费它
    fn expect(&mut self, kind: TokenKind<'_>) -> bool {
        if self.peek().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    /// 当前 token 是否为关键字（后面跟 `:` 时是字段名）
    fn at_keyword(&self, keyword: &str) -> bool {
        self.peek().is_keyword(keyword) && self.peek_nth(1).kind != TokenKind::Colon
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError::TooDeep {
                max: MAX_DEPTH,
                position: self.peek().span.start,
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    pub fn parse(&mut self) -> Result<Option<QueryNode>, ParseError> {
        if self.peek().kind == TokenKind::Eof {
            return Ok(None);
        }

        let tree = self.parse_or_expression()?;

        let token = self.peek();
        if token.kind != TokenKind::Eof {
            return Err(ParseError::TrailingInput {
                found: token.kind.to_string(),
                position: token.span.start,
            });
        }
        Ok(Some(tree))
    }

    /// 解析OR表达式 (最低优先级)
    ///
    /// 语法: `and_expr (OR and_expr)*`
    fn parse_or_expression(&mut self) -> Result<QueryNode, ParseError> {
        let depth = self.depth;
        let mut left = self.parse_and_expression()?;

        while self.at_keyword("OR") {
            self.advance(); // 消费 OR
            // 左折叠的每一步都让树加深一层
            self.enter()?;
            let right = self.parse_and_expression()?;
            left = QueryNode::or(left, right);
        }

        self.depth = depth;
        Ok(left)
    }

    /// 解析AND表达式 (中等优先级)
    ///
    /// 语法: `not_expr ((AND)? not_expr)*`
    /// 示例: `type:sql AND error`, `type:sql error`
    fn parse_and_expression(&mut self) -> Result<QueryNode, ParseError> {
        let depth = self.depth;
        let mut left = self.parse_not_expression()?;

        loop {
            if self.at_keyword("AND") {
                self.advance(); // 消费 AND
            } else if !self.starts_implicit_and() {
                break;
            }
            self.enter()?;
            let right = self.parse_not_expression()?;
            left = QueryNode::and(left, right);
        }

        self.depth = depth;
        Ok(left)
    }

    /// 相邻的项构成隐式 AND：下一个 token 是非 OR 的单词，或 `(`
    fn starts_implicit_and(&self) -> bool {
        match self.peek().kind {
            TokenKind::Word(_) => !self.at_keyword("OR"),
            TokenKind::Quoted(_) | TokenKind::LParen => true,
            _ => false,
        }
    }

    /// 解析NOT表达式 (较高优先级)
    ///
    /// 语法: `NOT not_expr | primary_expr`
    /// 示例: `NOT status:fail`, `NOT NOT error`
    fn parse_not_expression(&mut self) -> Result<QueryNode, ParseError> {
        if self.at_keyword("NOT") {
            self.advance(); // 消费 NOT
            self.enter()?;
            let expr = self.parse_not_expression()?; // 允许 NOT 链式调用
            self.leave();
            Ok(QueryNode::not(expr))
        } else {
            self.parse_primary_expression()
        }
    }

    /// 解析基础表达式 (最高优先级)
    ///
    /// 支持的表达式类型:
    /// - `(expr)` - 分组表达式
    /// - `field:value` - 字段比较
    /// - `value` - 全文检索
    fn parse_primary_expression(&mut self) -> Result<QueryNode, ParseError> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::LParen => {
                self.advance(); // 消费 (
                self.enter()?;
                let expr = self.parse_or_expression()?;
                self.leave();
                if !self.expect(TokenKind::RParen) {
                    return Err(ParseError::UnclosedParen {
                        position: token.span.start,
                    });
                }
                Ok(expr)
            }
            TokenKind::Word(_) | TokenKind::Quoted(_)
                if self.peek_nth(1).kind == TokenKind::Colon =>
            {
                self.parse_field_value()
            }
            TokenKind::Word(word) if !self.at_keyword("AND") && !self.at_keyword("OR") => {
                self.advance();
                Ok(QueryNode::full_text(word))
            }
            TokenKind::Quoted(phrase) => {
                self.advance();
                Ok(QueryNode::full_text(phrase))
            }
            kind => Err(ParseError::EmptyAtom {
                found: kind.to_string(),
                position: token.span.start,
            }),
        }
    }

    /// 解析 `field:[op]value[:continuation]*`
    fn parse_field_value(&mut self) -> Result<QueryNode, ParseError> {
        let field = self.advance().word().unwrap_or_default();
        let colon = self.advance().span;

        let op = match self.peek().kind {
            TokenKind::Gt => FilterOp::GreaterThan,
            TokenKind::Gte => FilterOp::GreaterOrEqual,
            TokenKind::Lt => FilterOp::LessThan,
            TokenKind::Lte => FilterOp::LessOrEqual,
            _ => FilterOp::Equals,
        };
        if op != FilterOp::Equals {
            self.advance();
        }

        let Some(first) = self.peek().word() else {
            return Err(ParseError::MissingValue {
                field: field.to_string(),
                position: colon.end,
            });
        };
        self.advance();

        let mut value = first.to_string();
        // 贪婪地吸收形如数字的 `:segment`，例如时间戳中的 `:00:00`
        while self.peek().kind == TokenKind::Colon {
            match self.peek_nth(1).kind {
                TokenKind::Word(segment) if is_value_continuation(segment) => {
                    self.advance(); // 消费 ':'
                    self.advance();
                    value.push(':');
                    value.push_str(segment);
                }
                _ => break,
            }
        }

        let op = if op == FilterOp::Equals && value.contains('*') {
            FilterOp::Wildcard
        } else {
            op
        };

        Ok(QueryNode::Filter(FieldFilter {
            field: Some(field.to_string()),
            op,
            value,
        }))
    }
}
