//! The Crema lexer: converts source text into tokens.
//!
//! `#` starts a line comment. Statements carry no separators; token
//! boundaries alone delimit them.

use crate::source::{SourceId, Span};
use crate::syntax::token::{Token, TokenKind};
use thiserror::Error;

/// A lexical error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("unexpected character `{ch}`")]
    UnexpectedChar { ch: char, span: Span },
    #[error("unterminated string literal")]
    UnterminatedString { span: Span },
    #[error("unterminated character literal")]
    UnterminatedChar { span: Span },
    #[error("invalid number literal `{text}`")]
    InvalidNumber { text: String, span: Span },
}

impl LexError {
    pub fn span(&self) -> Span {
        match self {
            LexError::UnexpectedChar { span, .. }
            | LexError::UnterminatedString { span }
            | LexError::UnterminatedChar { span }
            | LexError::InvalidNumber { span, .. } => *span,
        }
    }
}

/// Streaming character scanner that produces tokens with spans.
pub struct Lexer<'src> {
    src: &'src str,
    chars: Vec<(usize, char)>,
    pos: usize,
    source_id: SourceId,
}

impl<'src> Lexer<'src> {
    pub fn new(src: &'src str, source_id: SourceId) -> Self {
        Self {
            src,
            chars: src.char_indices().collect(),
            pos: 0,
            source_id,
        }
    }

    /// Lex the whole input. The final token is always `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                return Ok(tokens);
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.pos + 1).map(|&(_, c)| c)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    /// Byte offset of the current position.
    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map(|&(i, _)| i)
            .unwrap_or(self.src.len())
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(self.source_id, start, self.offset())
    }

    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else if c == '#' {
                while let Some(c2) = self.advance() {
                    if c2 == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_trivia();

        let start = self.offset();
        let ch = match self.peek() {
            Some(c) => c,
            None => {
                return Ok(Token {
                    kind: TokenKind::Eof,
                    span: self.span_from(start),
                })
            }
        };

        if ch.is_ascii_digit() {
            return self.read_number();
        }
        if ch.is_ascii_alphabetic() || ch == '_' {
            return Ok(self.read_ident_or_keyword());
        }
        if ch == '"' {
            return self.read_string();
        }
        if ch == '\'' {
            return self.read_char();
        }

        self.advance();
        let kind = match ch {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '^' => TokenKind::Caret,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            '&' => {
                if self.peek() == Some('&') {
                    self.advance();
                    TokenKind::AmpAmp
                } else {
                    TokenKind::Amp
                }
            }
            '|' => {
                if self.peek() == Some('|') {
                    self.advance();
                    TokenKind::PipePipe
                } else {
                    TokenKind::Pipe
                }
            }
            '!' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::NotEq
                } else {
                    TokenKind::Bang
                }
            }
            '=' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::EqEq
                } else {
                    TokenKind::Assign
                }
            }
            '<' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            other => {
                return Err(LexError::UnexpectedChar {
                    ch: other,
                    span: self.span_from(start),
                })
            }
        };

        Ok(Token {
            kind,
            span: self.span_from(start),
        })
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let start = self.offset();
        let mut text = String::new();

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }

        // A fractional part makes it a double; a `u` suffix makes it a uint.
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            text.push('.');
            self.advance();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    text.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
            let value: f64 = text.parse().map_err(|_| LexError::InvalidNumber {
                text: text.clone(),
                span: self.span_from(start),
            })?;
            return Ok(Token {
                kind: TokenKind::Double(value),
                span: self.span_from(start),
            });
        }

        if self.peek() == Some('u') {
            self.advance();
            let value: u64 = text.parse().map_err(|_| LexError::InvalidNumber {
                text: text.clone(),
                span: self.span_from(start),
            })?;
            return Ok(Token {
                kind: TokenKind::UInt(value),
                span: self.span_from(start),
            });
        }

        let value: i64 = text.parse().map_err(|_| LexError::InvalidNumber {
            text: text.clone(),
            span: self.span_from(start),
        })?;
        Ok(Token {
            kind: TokenKind::Int(value),
            span: self.span_from(start),
        })
    }

    fn read_ident_or_keyword(&mut self) -> Token {
        let start = self.offset();
        let mut text = String::new();

        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }

        let kind = match text.as_str() {
            "def" => TokenKind::Def,
            "return" => TokenKind::Return,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "foreach" => TokenKind::Foreach,
            "as" => TokenKind::As,
            "struct" => TokenKind::Struct,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "void" => TokenKind::TyVoid,
            "int" => TokenKind::TyInt,
            "uint" => TokenKind::TyUInt,
            "double" => TokenKind::TyDouble,
            "char" => TokenKind::TyChar,
            "bool" => TokenKind::TyBool,
            "str" => TokenKind::TyStr,
            _ => TokenKind::Ident(text),
        };

        Token {
            kind,
            span: self.span_from(start),
        }
    }

    fn read_string(&mut self) -> Result<Token, LexError> {
        let start = self.offset();
        self.advance(); // opening quote

        let mut text = String::new();
        loop {
            match self.advance() {
                Some('"') => {
                    return Ok(Token {
                        kind: TokenKind::Str(text),
                        span: self.span_from(start),
                    });
                }
                Some('\\') => match self.advance() {
                    Some(esc) => text.push(unescape(esc)),
                    None => {
                        return Err(LexError::UnterminatedString {
                            span: self.span_from(start),
                        })
                    }
                },
                Some(other) => text.push(other),
                None => {
                    return Err(LexError::UnterminatedString {
                        span: self.span_from(start),
                    })
                }
            }
        }
    }

    fn read_char(&mut self) -> Result<Token, LexError> {
        let start = self.offset();
        self.advance(); // opening quote

        let value = match self.advance() {
            Some('\\') => match self.advance() {
                Some(esc) => unescape(esc),
                None => {
                    return Err(LexError::UnterminatedChar {
                        span: self.span_from(start),
                    })
                }
            },
            Some(c) if c != '\'' => c,
            _ => {
                return Err(LexError::UnterminatedChar {
                    span: self.span_from(start),
                })
            }
        };

        if self.advance() != Some('\'') {
            return Err(LexError::UnterminatedChar {
                span: self.span_from(start),
            });
        }

        Ok(Token {
            kind: TokenKind::Char(value),
            span: self.span_from(start),
        })
    }
}

fn unescape(esc: char) -> char {
    match esc {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<TokenKind> {
        Lexer::new(src, SourceId(0))
            .tokenize()
            .expect("lexing should succeed")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_keywords_and_idents() {
        assert_eq!(
            lex("def foo struct int"),
            vec![
                TokenKind::Def,
                TokenKind::Ident("foo".to_string()),
                TokenKind::Struct,
                TokenKind::TyInt,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            lex("42 42u 2.5"),
            vec![
                TokenKind::Int(42),
                TokenKind::UInt(42),
                TokenKind::Double(2.5),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_member_access_is_not_a_double() {
        // `p.x` must lex as ident-dot-ident, not a malformed number.
        assert_eq!(
            lex("p.x"),
            vec![
                TokenKind::Ident("p".to_string()),
                TokenKind::Dot,
                TokenKind::Ident("x".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            lex("== != <= >= < > = && || & | ^ !"),
            vec![
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::Assign,
                TokenKind::AmpAmp,
                TokenKind::PipePipe,
                TokenKind::Amp,
                TokenKind::Pipe,
                TokenKind::Caret,
                TokenKind::Bang,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_and_char() {
        assert_eq!(
            lex(r#""hi\n" 'a' '\t'"#),
            vec![
                TokenKind::Str("hi\n".to_string()),
                TokenKind::Char('a'),
                TokenKind::Char('\t'),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            lex("int a # trailing comment\nint b"),
            vec![
                TokenKind::TyInt,
                TokenKind::Ident("a".to_string()),
                TokenKind::TyInt,
                TokenKind::Ident("b".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unterminated_string() {
        let err = Lexer::new("\"abc", SourceId(0)).tokenize().unwrap_err();
        assert!(matches!(err, LexError::UnterminatedString { .. }));
    }

    #[test]
    fn test_spans() {
        let tokens = Lexer::new("int a", SourceId(0)).tokenize().unwrap();
        assert_eq!(tokens[0].span.start, 0);
        assert_eq!(tokens[0].span.end, 3);
        assert_eq!(tokens[1].span.start, 4);
        assert_eq!(tokens[1].span.end, 5);
    }
}
