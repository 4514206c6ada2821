//! Token definitions for the Crema lexer.

use crate::source::Span;
use std::fmt;

/// A single lexed token with its source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// The kind of a token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Ident(String),
    Int(i64),
    UInt(u64),
    Double(f64),
    Str(String),
    Char(char),

    // Keywords
    Def,
    Return,
    If,
    Else,
    Foreach,
    As,
    Struct,
    True,
    False,

    // Type names
    TyVoid,
    TyInt,
    TyUInt,
    TyDouble,
    TyChar,
    TyBool,
    TyStr,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Caret,
    Pipe,
    AmpAmp,
    PipePipe,
    Bang,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Assign,

    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Dot,

    Eof,
}

impl TokenKind {
    /// True for tokens that may begin a type annotation.
    pub fn starts_type(&self) -> bool {
        matches!(
            self,
            TokenKind::TyVoid
                | TokenKind::TyInt
                | TokenKind::TyUInt
                | TokenKind::TyDouble
                | TokenKind::TyChar
                | TokenKind::TyBool
                | TokenKind::TyStr
        )
    }

    /// True for tokens that may begin an expression.
    pub fn starts_expr(&self) -> bool {
        matches!(
            self,
            TokenKind::Ident(_)
                | TokenKind::Int(_)
                | TokenKind::UInt(_)
                | TokenKind::Double(_)
                | TokenKind::Str(_)
                | TokenKind::Char(_)
                | TokenKind::True
                | TokenKind::False
                | TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::Bang
                | TokenKind::Minus
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(s) => write!(f, "identifier `{}`", s),
            TokenKind::Int(v) => write!(f, "integer `{}`", v),
            TokenKind::UInt(v) => write!(f, "integer `{}u`", v),
            TokenKind::Double(v) => write!(f, "double `{}`", v),
            TokenKind::Str(s) => write!(f, "string \"{}\"", s),
            TokenKind::Char(c) => write!(f, "char '{}'", c),
            TokenKind::Def => write!(f, "`def`"),
            TokenKind::Return => write!(f, "`return`"),
            TokenKind::If => write!(f, "`if`"),
            TokenKind::Else => write!(f, "`else`"),
            TokenKind::Foreach => write!(f, "`foreach`"),
            TokenKind::As => write!(f, "`as`"),
            TokenKind::Struct => write!(f, "`struct`"),
            TokenKind::True => write!(f, "`true`"),
            TokenKind::False => write!(f, "`false`"),
            TokenKind::TyVoid => write!(f, "`void`"),
            TokenKind::TyInt => write!(f, "`int`"),
            TokenKind::TyUInt => write!(f, "`uint`"),
            TokenKind::TyDouble => write!(f, "`double`"),
            TokenKind::TyChar => write!(f, "`char`"),
            TokenKind::TyBool => write!(f, "`bool`"),
            TokenKind::TyStr => write!(f, "`str`"),
            TokenKind::Plus => write!(f, "`+`"),
            TokenKind::Minus => write!(f, "`-`"),
            TokenKind::Star => write!(f, "`*`"),
            TokenKind::Slash => write!(f, "`/`"),
            TokenKind::Percent => write!(f, "`%`"),
            TokenKind::Amp => write!(f, "`&`"),
            TokenKind::Caret => write!(f, "`^`"),
            TokenKind::Pipe => write!(f, "`|`"),
            TokenKind::AmpAmp => write!(f, "`&&`"),
            TokenKind::PipePipe => write!(f, "`||`"),
            TokenKind::Bang => write!(f, "`!`"),
            TokenKind::EqEq => write!(f, "`==`"),
            TokenKind::NotEq => write!(f, "`!=`"),
            TokenKind::Lt => write!(f, "`<`"),
            TokenKind::Le => write!(f, "`<=`"),
            TokenKind::Gt => write!(f, "`>`"),
            TokenKind::Ge => write!(f, "`>=`"),
            TokenKind::Assign => write!(f, "`=`"),
            TokenKind::LParen => write!(f, "`(`"),
            TokenKind::RParen => write!(f, "`)`"),
            TokenKind::LBrace => write!(f, "`{{`"),
            TokenKind::RBrace => write!(f, "`}}`"),
            TokenKind::LBracket => write!(f, "`[`"),
            TokenKind::RBracket => write!(f, "`]`"),
            TokenKind::Comma => write!(f, "`,`"),
            TokenKind::Dot => write!(f, "`.`"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}
