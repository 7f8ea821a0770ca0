//! KQL 的词法分析器

use crate::token::{Token, TokenKind};
use thiserror::Error;

/// 词法错误，任何一个都会使整个查询失效
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("unterminated quoted value starting at position {position}")]
    UnterminatedQuote { position: usize },

    #[error("unexpected character '{ch}' at position {position}")]
    UnexpectedChar { ch: char, position: usize },
}

impl LexError {
    pub fn position(&self) -> usize {
        match self {
            LexError::UnterminatedQuote { position } | LexError::UnexpectedChar { position, .. } => {
                *position
            }
        }
    }
}

pub struct Lexer<'a> {
    input: &'a str,
    /// 输入字符串中的当前位置（字节索引）
    position: usize,
}

/// 单词字符：字母、数字以及 `_ - . * / +`
///
/// `*` 是通配符标记，其余符号用于日期、时区偏移和路径
pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '*' | '/' | '+')
}

/// 将整个输入切分为 token 序列，末尾总是 `Eof`
pub fn tokenize(input: &str) -> Result<Vec<Token<'_>>, LexError> {
    let mut tokens = Lexer::new(input).collect::<Result<Vec<_>, _>>()?;
    tokens.push(Token::new(TokenKind::Eof, input.len(), input.len()));
    Ok(tokens)
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, position: 0 }
    }

    /// 返回当前位置的字符，不推进位置
    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    /// 推进位置一个字符并返回该字符
    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if let Some(c) = c {
            self.position += c.len_utf8();
        }
        c
    }

    /// 跳过空白字符
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    /// 读取双引号包围的值，引号不可转义
    /// 注意：开始的引号已经被调用者消费
    fn read_quoted(&mut self, start: usize) -> Result<Token<'a>, LexError> {
        let content_start = self.position;
        let Some(len) = self.input[content_start..].find('"') else {
            self.position = self.input.len();
            return Err(LexError::UnterminatedQuote { position: start });
        };
        let content = &self.input[content_start..content_start + len];
        self.position = content_start + len + 1; // 消费结束引号
        Ok(Token::new(TokenKind::Quoted(content), start, self.position))
    }

    /// 读取由单词字符组成的最长序列
    fn read_word(&mut self, start: usize) -> Token<'a> {
        while let Some(c) = self.peek() {
            if is_word_char(c) {
                self.bump();
            } else {
                break;
            }
        }
        let literal = &self.input[start..self.position];
        Token::new(TokenKind::Word(literal), start, self.position)
    }

    /// `>`/`<` 之后可选的 `=`
    fn read_comparison(&mut self, start: usize, strict: TokenKind<'a>, inclusive: TokenKind<'a>) -> Token<'a> {
        if self.peek() == Some('=') {
            self.bump();
            Token::new(inclusive, start, self.position)
        } else {
            Token::new(strict, start, self.position)
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token<'a>, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_whitespace();
        let start = self.position;

        let c = self.bump()?; // 到达输入末尾

        let token = match c {
            ':' => Token::new(TokenKind::Colon, start, self.position),
            '(' => Token::new(TokenKind::LParen, start, self.position),
            ')' => Token::new(TokenKind::RParen, start, self.position),
            '>' => self.read_comparison(start, TokenKind::Gt, TokenKind::Gte),
            '<' => self.read_comparison(start, TokenKind::Lt, TokenKind::Lte),
            '"' => return Some(self.read_quoted(start)),
            c if is_word_char(c) => self.read_word(start),
            ch => {
                // 出错后停止产出，避免调用者继续消费
                self.position = self.input.len();
                return Some(Err(LexError::UnexpectedChar { ch, position: start }));
            }
        };
        Some(Ok(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind<'_>> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_simple_field_filter() {
        assert_eq!(
            kinds("user:alice"),
            vec![
                TokenKind::Word("user"),
                TokenKind::Colon,
                TokenKind::Word("alice"),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_all_operators_and_punctuation() {
        assert_eq!(
            kinds("> >= < <= ( ) :"),
            vec![
                TokenKind::Gt, TokenKind::Gte, TokenKind::Lt, TokenKind::Lte,
                TokenKind::LParen, TokenKind::RParen, TokenKind::Colon, TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comparison_without_spaces() {
        assert_eq!(
            kinds("duration:>=500"),
            vec![
                TokenKind::Word("duration"),
                TokenKind::Colon,
                TokenKind::Gte,
                TokenKind::Word("500"),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_word_characters() {
        assert_eq!(
            kinds("/var/log/app.log ab*cd +05 2026-02-10T10 snake_case"),
            vec![
                TokenKind::Word("/var/log/app.log"),
                TokenKind::Word("ab*cd"),
                TokenKind::Word("+05"),
                TokenKind::Word("2026-02-10T10"),
                TokenKind::Word("snake_case"),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_quoted_value() {
        let tokens = tokenize(r#"msg:"connection refused" x"#).unwrap();
        assert_eq!(tokens[2].kind, TokenKind::Quoted("connection refused"));
        assert_eq!(tokens[2].span.start, 4);
        assert_eq!(tokens[2].span.end, 24);
        assert_eq!(tokens[3].kind, TokenKind::Word("x"));
    }

    #[test]
    fn test_quoted_value_keeps_special_characters() {
        assert_eq!(
            kinds(r#""a (b) : c!""#),
            vec![TokenKind::Quoted("a (b) : c!"), TokenKind::Eof]
        );
    }

    #[test]
    fn test_empty_input_is_only_eof() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
        assert_eq!(kinds("   \t\n"), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_unterminated_quote() {
        let err = tokenize(r#"msg:"unterminated"#).unwrap_err();
        assert_eq!(err, LexError::UnterminatedQuote { position: 4 });
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("user:alice & bob").unwrap_err();
        assert_eq!(err, LexError::UnexpectedChar { ch: '&', position: 11 });
        assert_eq!(err.position(), 11);
    }

    #[test]
    fn test_iterator_stops_after_error() {
        let items: Vec<_> = Lexer::new("a ! b").collect();
        assert_eq!(items.len(), 2);
        assert!(items[1].is_err());
    }

    #[test]
    fn test_unicode_letters_are_words() {
        assert_eq!(kinds("héllo"), vec![TokenKind::Word("héllo"), TokenKind::Eof]);
    }
}
