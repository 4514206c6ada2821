//! Recursive descent parser for Crema.
//!
//! Statements carry no separators; the grammar is LL(3) — the widest
//! lookahead is needed to tell a record-list declaration (`Pt[] ps`)
//! from a list-element assignment (`xs[i] = e`).

use crate::source::{SourceId, Span};
use crate::syntax::ast::*;
use crate::syntax::lexer::{LexError, Lexer};
use crate::syntax::token::{Token, TokenKind};
use thiserror::Error;

/// A syntax error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("unexpected {found}, expected {expected}")]
    Unexpected {
        expected: String,
        found: String,
        span: Span,
    },
    #[error("nested list types are not supported")]
    NestedList { span: Span },
    #[error("`void` is not a value type")]
    VoidValue { span: Span },
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::Lex(e) => e.span(),
            ParseError::Unexpected { span, .. }
            | ParseError::NestedList { span }
            | ParseError::VoidValue { span } => *span,
        }
    }
}

/// Parse a source string into a [`Program`].
pub fn parse(source: &str, source_id: SourceId) -> Result<Program, ParseError> {
    let tokens = Lexer::new(source, source_id).tokenize()?;
    Parser::new(tokens).parse_program()
}

/// Token-cursor parser state.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn nth(&self, n: usize) -> &Token {
        &self.tokens[(self.pos + n).min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&kind.to_string()))
        }
    }

    fn expect_ident(&mut self) -> Result<(String, Span), ParseError> {
        match self.peek().kind.clone() {
            TokenKind::Ident(name) => {
                let span = self.peek().span;
                self.advance();
                Ok((name, span))
            }
            _ => Err(self.unexpected("an identifier")),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::Unexpected {
            expected: expected.to_string(),
            found: self.peek().kind.to_string(),
            span: self.peek().span,
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::Eof) {
            stmts.push(self.parse_stmt()?);
        }
        Ok(Program { stmts })
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        match &self.peek().kind {
            TokenKind::Struct => self.parse_record_decl(),
            TokenKind::Def => self.parse_func_decl(),
            TokenKind::If => self.parse_if(),
            TokenKind::Foreach => self.parse_foreach(),
            TokenKind::Return => self.parse_return(),
            kind if kind.starts_type() => self.parse_var_decl(),
            TokenKind::Ident(_) => self.parse_ident_stmt(),
            _ => Err(self.unexpected("a statement")),
        }
    }

    /// A statement starting with an identifier: an assignment, a call, or
    /// a declaration with a record type.
    fn parse_ident_stmt(&mut self) -> Result<Stmt, ParseError> {
        match (&self.nth(1).kind, &self.nth(2).kind) {
            // `Pt p` or `Pt[] ps`
            (TokenKind::Ident(_), _) | (TokenKind::LBracket, TokenKind::RBracket) => {
                self.parse_var_decl()
            }
            (TokenKind::LParen, _) => {
                let start = self.peek().span;
                let expr = self.parse_primary()?;
                let span = start.merge(expr.span);
                Ok(Stmt {
                    kind: StmtKind::Call(expr),
                    span,
                })
            }
            _ => self.parse_assign(),
        }
    }

    fn parse_type(&mut self) -> Result<TyExpr, ParseError> {
        let token = self.advance();
        let span = token.span;
        let kind = match token.kind {
            TokenKind::TyVoid => TyExprKind::Void,
            TokenKind::TyInt => TyExprKind::Int,
            TokenKind::TyUInt => TyExprKind::UInt,
            TokenKind::TyDouble => TyExprKind::Double,
            TokenKind::TyChar => TyExprKind::Char,
            TokenKind::TyBool => TyExprKind::Bool,
            TokenKind::TyStr => TyExprKind::Str,
            TokenKind::Ident(name) => TyExprKind::Named(name),
            _ => {
                return Err(ParseError::Unexpected {
                    expected: "a type".to_string(),
                    found: token.kind.to_string(),
                    span,
                })
            }
        };

        if self.check(&TokenKind::LBracket) && self.nth(1).kind == TokenKind::RBracket {
            self.advance();
            let close = self.advance();
            let full = span.merge(close.span);
            // `str` is already a list; `void` has no values to collect.
            match kind {
                TyExprKind::Str | TyExprKind::List(_) => {
                    return Err(ParseError::NestedList { span: full })
                }
                TyExprKind::Void => return Err(ParseError::VoidValue { span: full }),
                _ => {}
            }
            return Ok(TyExpr {
                kind: TyExprKind::List(Box::new(TyExpr { kind, span })),
                span: full,
            });
        }

        Ok(TyExpr { kind, span })
    }

    fn parse_var_decl(&mut self) -> Result<Stmt, ParseError> {
        let ty = self.parse_type()?;
        if matches!(ty.kind, TyExprKind::Void) {
            return Err(ParseError::VoidValue { span: ty.span });
        }
        let (name, name_span) = self.expect_ident()?;

        let init = if self.eat(&TokenKind::Assign) {
            Some(self.parse_expr()?)
        } else {
            None
        };

        let end = init.as_ref().map(|e| e.span).unwrap_or(name_span);
        let span = ty.span.merge(end);
        Ok(Stmt {
            kind: StmtKind::VarDecl(VarDecl {
                name,
                name_span,
                ty,
                init,
            }),
            span,
        })
    }

    fn parse_record_decl(&mut self) -> Result<Stmt, ParseError> {
        let start = self.expect(TokenKind::Struct)?.span;
        let (name, name_span) = self.expect_ident()?;
        self.expect(TokenKind::LBrace)?;

        let mut fields = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            let ty = self.parse_type()?;
            if matches!(ty.kind, TyExprKind::Void) {
                return Err(ParseError::VoidValue { span: ty.span });
            }
            let (field_name, field_span) = self.expect_ident()?;
            fields.push(FieldDecl {
                name: field_name,
                name_span: field_span,
                ty,
            });
        }
        let end = self.expect(TokenKind::RBrace)?.span;

        Ok(Stmt {
            kind: StmtKind::RecordDecl(RecordDecl {
                name,
                name_span,
                fields,
            }),
            span: start.merge(end),
        })
    }

    fn parse_func_decl(&mut self) -> Result<Stmt, ParseError> {
        let start = self.expect(TokenKind::Def)?.span;
        let ret = self.parse_type()?;
        let (name, name_span) = self.expect_ident()?;

        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let ty = self.parse_type()?;
                if matches!(ty.kind, TyExprKind::Void) {
                    return Err(ParseError::VoidValue { span: ty.span });
                }
                let (param_name, param_span) = self.expect_ident()?;
                params.push(FieldDecl {
                    name: param_name,
                    name_span: param_span,
                    ty,
                });
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;

        let body = self.parse_block()?;
        let span = start.merge(body.span);
        Ok(Stmt {
            kind: StmtKind::FuncDecl(FuncDecl {
                name,
                name_span,
                ret,
                params,
                body,
            }),
            span,
        })
    }

    fn parse_block(&mut self) -> Result<Block, ParseError> {
        let start = self.expect(TokenKind::LBrace)?.span;
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.check(&TokenKind::Eof) {
            stmts.push(self.parse_stmt()?);
        }
        let end = self.expect(TokenKind::RBrace)?.span;
        Ok(Block {
            stmts,
            span: start.merge(end),
        })
    }

    fn parse_assign(&mut self) -> Result<Stmt, ParseError> {
        let (name, span) = self.expect_ident()?;

        let target = if self.eat(&TokenKind::LBracket) {
            let index = self.parse_expr()?;
            self.expect(TokenKind::RBracket)?;
            AssignTarget::ListElem {
                name,
                span,
                index: Box::new(index),
            }
        } else if self.eat(&TokenKind::Dot) {
            let (field, field_span) = self.expect_ident()?;
            AssignTarget::Field {
                name,
                span,
                field,
                field_span,
            }
        } else {
            AssignTarget::Var { name, span }
        };

        self.expect(TokenKind::Assign)?;
        let value = self.parse_expr()?;
        let full = span.merge(value.span);
        Ok(Stmt {
            kind: StmtKind::Assign(Assign { target, value }),
            span: full,
        })
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        let start = self.expect(TokenKind::If)?.span;
        self.expect(TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        let then_block = self.parse_block()?;

        let mut end = then_block.span;
        let else_branch = if self.eat(&TokenKind::Else) {
            if self.check(&TokenKind::If) {
                let nested = self.parse_if()?;
                end = nested.span;
                Some(ElseBranch::ElseIf(Box::new(nested)))
            } else {
                let block = self.parse_block()?;
                end = block.span;
                Some(ElseBranch::Else(block))
            }
        } else {
            None
        };

        Ok(Stmt {
            kind: StmtKind::If(IfStmt {
                cond,
                then_block,
                else_branch,
            }),
            span: start.merge(end),
        })
    }

    fn parse_foreach(&mut self) -> Result<Stmt, ParseError> {
        let start = self.expect(TokenKind::Foreach)?.span;
        self.expect(TokenKind::LParen)?;
        let (list, list_span) = self.expect_ident()?;
        self.expect(TokenKind::As)?;
        let (var, var_span) = self.expect_ident()?;
        self.expect(TokenKind::RParen)?;
        let body = self.parse_block()?;
        let span = start.merge(body.span);
        Ok(Stmt {
            kind: StmtKind::Foreach(Foreach {
                list,
                list_span,
                var,
                var_span,
                body,
            }),
            span,
        })
    }

    fn parse_return(&mut self) -> Result<Stmt, ParseError> {
        let start = self.expect(TokenKind::Return)?.span;
        if self.peek().kind.starts_expr() {
            let expr = self.parse_expr()?;
            let span = start.merge(expr.span);
            Ok(Stmt {
                kind: StmtKind::Return(Some(expr)),
                span,
            })
        } else {
            Ok(Stmt {
                kind: StmtKind::Return(None),
                span: start,
            })
        }
    }

    // ========================================================================
    // Expressions (precedence climbing)
    // ========================================================================

    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_or()
    }

    fn binary(&mut self, op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
        let span = lhs.span.merge(rhs.span);
        Expr::new(
            ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            span,
        )
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_and()?;
        while self.eat(&TokenKind::PipePipe) {
            let rhs = self.parse_and()?;
            lhs = self.binary(BinOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_bitor()?;
        while self.eat(&TokenKind::AmpAmp) {
            let rhs = self.parse_bitor()?;
            lhs = self.binary(BinOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_bitor(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_bitxor()?;
        while self.eat(&TokenKind::Pipe) {
            let rhs = self.parse_bitxor()?;
            lhs = self.binary(BinOp::BitOr, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_bitxor(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_bitand()?;
        while self.eat(&TokenKind::Caret) {
            let rhs = self.parse_bitand()?;
            lhs = self.binary(BinOp::BitXor, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_bitand(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_equality()?;
        while self.eat(&TokenKind::Amp) {
            let rhs = self.parse_equality()?;
            lhs = self.binary(BinOp::BitAnd, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = if self.eat(&TokenKind::EqEq) {
                BinOp::Eq
            } else if self.eat(&TokenKind::NotEq) {
                BinOp::Ne
            } else {
                return Ok(lhs);
            };
            let rhs = self.parse_relational()?;
            lhs = self.binary(op, lhs, rhs);
        }
    }

    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = if self.eat(&TokenKind::Lt) {
                BinOp::Lt
            } else if self.eat(&TokenKind::Le) {
                BinOp::Le
            } else if self.eat(&TokenKind::Gt) {
                BinOp::Gt
            } else if self.eat(&TokenKind::Ge) {
                BinOp::Ge
            } else {
                return Ok(lhs);
            };
            let rhs = self.parse_additive()?;
            lhs = self.binary(op, lhs, rhs);
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = if self.eat(&TokenKind::Plus) {
                BinOp::Add
            } else if self.eat(&TokenKind::Minus) {
                BinOp::Sub
            } else {
                return Ok(lhs);
            };
            let rhs = self.parse_multiplicative()?;
            lhs = self.binary(op, lhs, rhs);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = if self.eat(&TokenKind::Star) {
                BinOp::Mul
            } else if self.eat(&TokenKind::Slash) {
                BinOp::Div
            } else if self.eat(&TokenKind::Percent) {
                BinOp::Mod
            } else {
                return Ok(lhs);
            };
            let rhs = self.parse_unary()?;
            lhs = self.binary(op, lhs, rhs);
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.check(&TokenKind::Bang) {
            let start = self.advance().span;
            let operand = self.parse_unary()?;
            let span = start.merge(operand.span);
            return Ok(Expr::new(
                ExprKind::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
                span,
            ));
        }

        if self.check(&TokenKind::Minus) {
            let start = self.advance().span;
            // Fold negated numeric literals directly.
            match self.peek().kind.clone() {
                TokenKind::Int(v) => {
                    let span = start.merge(self.advance().span);
                    return Ok(Expr::new(ExprKind::Literal(Literal::Int(-v)), span));
                }
                TokenKind::Double(v) => {
                    let span = start.merge(self.advance().span);
                    return Ok(Expr::new(ExprKind::Literal(Literal::Double(-v)), span));
                }
                _ => {}
            }
            let operand = self.parse_unary()?;
            let span = start.merge(operand.span);
            return Ok(Expr::new(
                ExprKind::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(operand),
                },
                span,
            ));
        }

        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Int(v) => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Literal::Int(v)), token.span))
            }
            TokenKind::UInt(v) => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Literal::UInt(v)), token.span))
            }
            TokenKind::Double(v) => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Literal::Double(v)), token.span))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Literal::Str(s)), token.span))
            }
            TokenKind::Char(c) => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Literal::Char(c)), token.span))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Literal::Bool(true)), token.span))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::new(
                    ExprKind::Literal(Literal::Bool(false)),
                    token.span,
                ))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::LBracket => self.parse_list_literal(),
            TokenKind::Ident(name) => {
                let base_span = token.span;
                self.advance();
                self.parse_postfix(name, base_span)
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    /// Call, index and field access — all anchored on an identifier base.
    fn parse_postfix(&mut self, name: String, base_span: Span) -> Result<Expr, ParseError> {
        if self.eat(&TokenKind::LParen) {
            let mut args = Vec::new();
            if !self.check(&TokenKind::RParen) {
                loop {
                    args.push(self.parse_expr()?);
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
            }
            let end = self.expect(TokenKind::RParen)?.span;
            return Ok(Expr::new(
                ExprKind::Call {
                    callee: name,
                    callee_span: base_span,
                    args,
                },
                base_span.merge(end),
            ));
        }

        if self.eat(&TokenKind::LBracket) {
            let index = self.parse_expr()?;
            let end = self.expect(TokenKind::RBracket)?.span;
            return Ok(Expr::new(
                ExprKind::ListAccess {
                    base: name,
                    base_span,
                    index: Box::new(index),
                },
                base_span.merge(end),
            ));
        }

        if self.eat(&TokenKind::Dot) {
            let (field, field_span) = self.expect_ident()?;
            return Ok(Expr::new(
                ExprKind::FieldAccess {
                    base: name,
                    base_span,
                    field,
                    field_span,
                },
                base_span.merge(field_span),
            ));
        }

        Ok(Expr::new(ExprKind::Variable(name), base_span))
    }

    fn parse_list_literal(&mut self) -> Result<Expr, ParseError> {
        let start = self.expect(TokenKind::LBracket)?.span;
        let mut elems = Vec::new();
        if !self.check(&TokenKind::RBracket) {
            loop {
                elems.push(self.parse_expr()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        let end = self.expect(TokenKind::RBracket)?.span;
        Ok(Expr::new(
            ExprKind::Literal(Literal::List(elems)),
            start.merge(end),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> Program {
        parse(src, SourceId(0)).expect("parsing should succeed")
    }

    fn parse_expr_str(src: &str) -> Expr {
        let tokens = Lexer::new(src, SourceId(0)).tokenize().unwrap();
        Parser::new(tokens).parse_expr().unwrap()
    }

    #[test]
    fn test_var_decls() {
        let prog = parse_ok("int a = 3  int b = a + 4  return b");
        assert_eq!(prog.stmts.len(), 3);
        assert!(matches!(&prog.stmts[0].kind, StmtKind::VarDecl(d) if d.name == "a"));
        assert!(matches!(&prog.stmts[2].kind, StmtKind::Return(Some(_))));
    }

    #[test]
    fn test_list_decl_and_literal() {
        let prog = parse_ok("int[] xs = [1, 2, 3]");
        match &prog.stmts[0].kind {
            StmtKind::VarDecl(decl) => {
                assert!(matches!(decl.ty.kind, TyExprKind::List(_)));
                match &decl.init.as_ref().unwrap().kind {
                    ExprKind::Literal(Literal::List(elems)) => assert_eq!(elems.len(), 3),
                    other => panic!("expected list literal, got {:?}", other),
                }
            }
            other => panic!("expected var decl, got {:?}", other),
        }
    }

    #[test]
    fn test_record_decl_and_access() {
        let prog = parse_ok("struct Pt { int x  int y }  Pt p  p.x = 5  return p.x");
        assert_eq!(prog.stmts.len(), 4);
        match &prog.stmts[0].kind {
            StmtKind::RecordDecl(decl) => {
                assert_eq!(decl.name, "Pt");
                assert_eq!(decl.fields.len(), 2);
            }
            other => panic!("expected record decl, got {:?}", other),
        }
        assert!(matches!(&prog.stmts[1].kind, StmtKind::VarDecl(d) if d.name == "p"));
        assert!(matches!(
            &prog.stmts[2].kind,
            StmtKind::Assign(Assign {
                target: AssignTarget::Field { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_record_list_decl_vs_elem_assign() {
        // `Pt[] ps` declares; `xs[0] = 1` assigns.
        let prog = parse_ok("Pt[] ps");
        assert!(matches!(&prog.stmts[0].kind, StmtKind::VarDecl(_)));

        let prog = parse_ok("xs[0] = 1");
        assert!(matches!(
            &prog.stmts[0].kind,
            StmtKind::Assign(Assign {
                target: AssignTarget::ListElem { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_func_decl() {
        let prog = parse_ok("def int add(int x, int y) { return x + y }");
        match &prog.stmts[0].kind {
            StmtKind::FuncDecl(decl) => {
                assert_eq!(decl.name, "add");
                assert_eq!(decl.params.len(), 2);
                assert_eq!(decl.body.stmts.len(), 1);
            }
            other => panic!("expected func decl, got {:?}", other),
        }
    }

    #[test]
    fn test_if_else_chain() {
        let prog = parse_ok("if (a) { return 1 } else if (b) { return 2 } else { return 3 }");
        match &prog.stmts[0].kind {
            StmtKind::If(stmt) => match &stmt.else_branch {
                Some(ElseBranch::ElseIf(nested)) => match &nested.kind {
                    StmtKind::If(inner) => {
                        assert!(matches!(inner.else_branch, Some(ElseBranch::Else(_))))
                    }
                    other => panic!("expected nested if, got {:?}", other),
                },
                other => panic!("expected else-if, got {:?}", other),
            },
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn test_foreach() {
        let prog = parse_ok("foreach (xs as v) { int_println(v) }");
        match &prog.stmts[0].kind {
            StmtKind::Foreach(stmt) => {
                assert_eq!(stmt.list, "xs");
                assert_eq!(stmt.var, "v");
                assert!(matches!(&stmt.body.stmts[0].kind, StmtKind::Call(_)));
            }
            other => panic!("expected foreach, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        match parse_expr_str("1 + 2 * 3").kind {
            ExprKind::Binary { op: BinOp::Add, rhs, .. } => {
                assert!(matches!(rhs.kind, ExprKind::Binary { op: BinOp::Mul, .. }));
            }
            other => panic!("expected add at the top, got {:?}", other),
        }

        // comparisons bind tighter than &&
        match parse_expr_str("a < b && c > d").kind {
            ExprKind::Binary { op: BinOp::And, .. } => {}
            other => panic!("expected && at the top, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_literal_folding() {
        assert!(matches!(
            parse_expr_str("-3").kind,
            ExprKind::Literal(Literal::Int(-3))
        ));
        assert!(matches!(
            parse_expr_str("-x").kind,
            ExprKind::Unary { op: UnaryOp::Neg, .. }
        ));
    }

    #[test]
    fn test_string_condition_parses() {
        // Semantically invalid, but syntactically fine.
        let prog = parse_ok("if (\"hi\") { }");
        assert!(matches!(&prog.stmts[0].kind, StmtKind::If(_)));
    }

    #[test]
    fn test_nested_list_type_rejected() {
        assert!(matches!(
            parse("str[] s", SourceId(0)),
            Err(ParseError::NestedList { .. })
        ));
    }

    #[test]
    fn test_void_variable_rejected() {
        assert!(matches!(
            parse("void v", SourceId(0)),
            Err(ParseError::VoidValue { .. })
        ));
    }

    #[test]
    fn test_unexpected_token() {
        let err = parse("int = 5", SourceId(0)).unwrap_err();
        assert!(matches!(err, ParseError::Unexpected { .. }));
    }
}
