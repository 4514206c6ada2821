//! The semantic analyzer.
//!
//! A single traversal over the AST that builds and tears down scopes,
//! resolves identifiers through the symbol tables, checks types against
//! the promotion lattice, enforces the no-recursion rule, and annotates
//! every expression node with its resolved type. Diagnostics are pushed
//! in source order; a failing statement does not stop the enclosing
//! block, so one run reports multiple errors.

use std::collections::HashMap;

use crate::context::CompilerContext;
use crate::definitions::{DefKind, FunctionDef, Namespace, ParameterDef, RecordDef, FieldDef};
use crate::ids::{DefId, FieldIdx};
use crate::interner::Name;
use crate::sema::recursion;
use crate::sema::scope::{ScopeStack, VarBinding};
use crate::source::Span;
use crate::stdlib;
use crate::syntax::ast::*;
use crate::types::{Type, TypeKind};

/// Analyze a program, filling in expression types and reporting
/// diagnostics. Returns `true` iff this run emitted no errors.
pub fn analyze(program: &mut Program, ctx: &mut CompilerContext) -> bool {
    stdlib::register_runtime(ctx);
    let errors_before = ctx.error_count();

    let mut analyzer = Analyzer::new(ctx);
    analyzer.run(program);

    ctx.error_count() == errors_before
}

/// Analyzer state for one traversal.
struct Analyzer<'ctx> {
    ctx: &'ctx mut CompilerContext,
    scopes: ScopeStack,
    /// Call graph over function names, built syntactically before any
    /// body is analyzed so cycles through forward references are seen.
    call_graph: HashMap<Name, Vec<Name>>,
}

impl<'ctx> Analyzer<'ctx> {
    fn new(ctx: &'ctx mut CompilerContext) -> Self {
        Self {
            ctx,
            scopes: ScopeStack::new(),
            call_graph: HashMap::new(),
        }
    }

    fn run(&mut self, program: &mut Program) {
        self.scopes.push(None);

        // Pre-register every top-level function signature so forward
        // references and self-references resolve, and collect the call
        // graph for the recursion check.
        for stmt in &program.stmts {
            if let StmtKind::FuncDecl(decl) = &stmt.kind {
                self.pre_register_function(decl);
                let name = self.ctx.intern(&decl.name);
                let mut callees = Vec::new();
                collect_calls_block(&decl.body, self.ctx, &mut callees);
                self.call_graph.entry(name).or_default().extend(callees);
            }
        }

        for stmt in &mut program.stmts {
            self.analyze_stmt(stmt);
        }

        self.scopes.pop();
        debug_assert_eq!(self.scopes.depth(), 0, "unbalanced scope stack");
    }

    // ========================================================================
    // Type resolution
    // ========================================================================

    /// Resolve a parsed type annotation, reporting unresolved records.
    fn resolve_ty(&mut self, ty: &TyExpr) -> Type {
        match &ty.kind {
            TyExprKind::Void => Type::VOID,
            TyExprKind::Int => Type::INT,
            TyExprKind::UInt => Type::UINT,
            TyExprKind::Double => Type::DOUBLE,
            TyExprKind::Char => Type::CHAR,
            TyExprKind::Bool => Type::BOOL,
            TyExprKind::Str => Type::STRING,
            TyExprKind::Named(name) => {
                let interned = self.ctx.intern(name);
                if self.ctx.defs.lookup(interned, Namespace::Type).is_some() {
                    Type::record(interned)
                } else {
                    self.ctx
                        .diagnostics
                        .error(ty.span, format!("undefined struct `{}`", name));
                    Type::INVALID
                }
            }
            TyExprKind::List(inner) => {
                if let TyExprKind::Named(name) = &inner.kind {
                    self.ctx.diagnostics.error(
                        ty.span,
                        format!("lists of structs are not supported (`{}[]`)", name),
                    );
                    return Type::INVALID;
                }
                let elem = self.resolve_ty(inner);
                if elem.is_invalid() {
                    Type::INVALID
                } else {
                    Type::list_of(elem.kind)
                }
            }
        }
    }

    /// Resolve a type without diagnostics (used by pre-registration;
    /// the declaration's own analysis reports problems in source order).
    fn resolve_ty_quiet(&self, ty: &TyExpr) -> Type {
        match &ty.kind {
            TyExprKind::Void => Type::VOID,
            TyExprKind::Int => Type::INT,
            TyExprKind::UInt => Type::UINT,
            TyExprKind::Double => Type::DOUBLE,
            TyExprKind::Char => Type::CHAR,
            TyExprKind::Bool => Type::BOOL,
            TyExprKind::Str => Type::STRING,
            TyExprKind::Named(name) => {
                let interned = self.ctx.intern(name);
                if self.ctx.defs.lookup(interned, Namespace::Type).is_some() {
                    Type::record(interned)
                } else {
                    Type::INVALID
                }
            }
            TyExprKind::List(inner) => {
                let elem = self.resolve_ty_quiet(inner);
                if elem.is_invalid() || matches!(inner.kind, TyExprKind::Named(_)) {
                    Type::INVALID
                } else {
                    Type::list_of(elem.kind)
                }
            }
        }
    }

    // ========================================================================
    // Registration
    // ========================================================================

    fn pre_register_function(&mut self, decl: &FuncDecl) {
        let name = self.ctx.intern(&decl.name);
        if self.ctx.defs.lookup(name, Namespace::Value).is_some() {
            // Either a duplicate (reported when the statement itself is
            // analyzed) or re-analysis of the same tree.
            return;
        }

        let ret = self.resolve_ty_quiet(&decl.ret);
        let func_id = self.ctx.defs.alloc(
            name,
            DefKind::Function(FunctionDef {
                def_id: DefId::INVALID,
                name,
                params: Vec::new(),
                ret,
                is_external: false,
            }),
            decl.name_span,
        );

        let mut param_ids = Vec::with_capacity(decl.params.len());
        for (idx, param) in decl.params.iter().enumerate() {
            let param_name = self.ctx.intern(&param.name);
            let ty = self.resolve_ty_quiet(&param.ty);
            let param_id = self.ctx.defs.alloc(
                param_name,
                DefKind::Parameter(ParameterDef {
                    owner: func_id,
                    name: param_name,
                    ty,
                    idx: idx as u32,
                }),
                param.name_span,
            );
            param_ids.push(param_id);
        }

        if let Some(func) = self.ctx.defs.as_function_mut(func_id) {
            func.def_id = func_id;
            func.params = param_ids;
        }
        self.ctx.defs.register_name(name, Namespace::Value, func_id);
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn analyze_stmt(&mut self, stmt: &mut Stmt) -> bool {
        match &mut stmt.kind {
            StmtKind::VarDecl(decl) => self.analyze_var_decl(decl),
            StmtKind::RecordDecl(decl) => self.analyze_record_decl(decl),
            StmtKind::FuncDecl(decl) => self.analyze_func_decl(decl),
            StmtKind::Assign(assign) => self.analyze_assign(assign),
            StmtKind::If(if_stmt) => self.analyze_if(if_stmt),
            StmtKind::Foreach(foreach) => self.analyze_foreach(foreach),
            StmtKind::Return(expr) => self.analyze_return(expr.as_mut(), stmt.span),
            StmtKind::Call(expr) => {
                if !matches!(expr.kind, ExprKind::Call { .. }) {
                    self.ctx
                        .diagnostics
                        .error(expr.span, "only calls may stand as statements");
                    return false;
                }
                self.analyze_expr(expr, None)
            }
        }
    }

    /// A block introduces a fresh scope inheriting the enclosing expected
    /// return type. Every statement is analyzed even after a failure, so
    /// one run reports as much as possible; the scope is always popped.
    fn analyze_block(&mut self, block: &mut Block) -> bool {
        self.scopes.push_inherit();
        let mut ok = true;
        for stmt in &mut block.stmts {
            ok &= self.analyze_stmt(stmt);
        }
        self.scopes.pop();
        ok
    }

    fn analyze_var_decl(&mut self, decl: &mut VarDecl) -> bool {
        let declared = self.resolve_ty(&decl.ty);
        if declared.is_invalid() {
            return false;
        }

        let name = self.ctx.intern(&decl.name);

        // Variables and functions share a reservation check.
        if self.ctx.defs.lookup(name, Namespace::Value).is_some() {
            self.ctx.diagnostics.error(
                decl.name_span,
                format!("`{}` is already declared as a function", decl.name),
            );
            return false;
        }

        if !self.scopes.declare(VarBinding {
            name,
            ty: declared,
            span: decl.name_span,
        }) {
            self.ctx.diagnostics.error(
                decl.name_span,
                format!("duplicate declaration of variable `{}`", decl.name),
            );
            return false;
        }

        if let Some(init) = &mut decl.init {
            if !self.analyze_expr(init, Some(declared)) {
                return false;
            }
            return self.check_assignable(init.ty, declared, init.span, &format!("`{}`", decl.name));
        }
        true
    }

    fn analyze_record_decl(&mut self, decl: &mut RecordDecl) -> bool {
        let name = self.ctx.intern(&decl.name);

        if let Some(existing) = self.ctx.defs.lookup(name, Namespace::Type) {
            if self.ctx.defs.span(existing) == decl.name_span {
                // Re-analysis of the same tree.
                return true;
            }
            self.ctx.diagnostics.error(
                decl.name_span,
                format!("duplicate declaration of struct `{}`", decl.name),
            );
            return false;
        }

        // A temporary member scope catches duplicate field names.
        self.scopes.push_inherit();
        let mut ok = true;
        let mut fields = Vec::with_capacity(decl.fields.len());
        for field in &decl.fields {
            let field_ty = self.resolve_ty(&field.ty);
            if field_ty.is_invalid() {
                ok = false;
                continue;
            }
            let field_name = self.ctx.intern(&field.name);
            if !self.scopes.declare(VarBinding {
                name: field_name,
                ty: field_ty,
                span: field.name_span,
            }) {
                self.ctx.diagnostics.error(
                    field.name_span,
                    format!(
                        "duplicate field `{}` in struct `{}`",
                        field.name, decl.name
                    ),
                );
                ok = false;
                continue;
            }
            fields.push((field_name, field_ty, field.name_span));
        }
        self.scopes.pop();

        if !ok {
            return false;
        }

        let record_id = self.ctx.defs.alloc(
            name,
            DefKind::Record(RecordDef {
                def_id: DefId::INVALID,
                name,
                fields: Vec::new(),
            }),
            decl.name_span,
        );
        let mut field_ids = Vec::with_capacity(fields.len());
        for (idx, (field_name, field_ty, field_span)) in fields.into_iter().enumerate() {
            let field_id = self.ctx.defs.alloc(
                field_name,
                DefKind::Field(FieldDef {
                    owner: record_id,
                    name: field_name,
                    ty: field_ty,
                    idx: FieldIdx::new(idx as u32),
                }),
                field_span,
            );
            field_ids.push(field_id);
        }
        if let Some(record) = self.ctx.defs.as_record_mut(record_id) {
            record.def_id = record_id;
            record.fields = field_ids;
        }
        self.ctx.defs.register_name(name, Namespace::Type, record_id);
        true
    }

    fn analyze_func_decl(&mut self, decl: &mut FuncDecl) -> bool {
        let name = self.ctx.intern(&decl.name);

        if self.scopes.lookup(name).is_some() {
            self.ctx.diagnostics.error(
                decl.name_span,
                format!("`{}` is already declared as a variable", decl.name),
            );
            return false;
        }

        let func_id = match self.ctx.defs.lookup(name, Namespace::Value) {
            Some(id) if self.ctx.defs.span(id) == decl.name_span => id,
            Some(_) => {
                self.ctx.diagnostics.error(
                    decl.name_span,
                    format!("duplicate declaration of function `{}`", decl.name),
                );
                return false;
            }
            None => {
                // Pre-registration only skips names that are already
                // taken, and those report just above.
                unreachable!("function `{}` was not pre-registered", decl.name)
            }
        };

        // Re-resolve the signature with diagnostics and refresh the
        // pre-registered (leniently resolved) types.
        let ret = self.resolve_ty(&decl.ret);
        let mut ok = !ret.is_invalid();
        let param_ids = self
            .ctx
            .defs
            .as_function(func_id)
            .map(|f| f.params.clone())
            .unwrap_or_default();
        let mut param_tys = Vec::with_capacity(decl.params.len());
        for (param, &param_id) in decl.params.iter().zip(&param_ids) {
            let ty = self.resolve_ty(&param.ty);
            if ty.is_invalid() {
                ok = false;
            }
            if let Some(p) = self.ctx.defs.as_parameter_mut(param_id) {
                p.ty = ty;
            }
            param_tys.push((param, ty));
        }
        if let Some(func) = self.ctx.defs.as_function_mut(func_id) {
            func.ret = ret;
        }
        if !ok {
            return false;
        }

        // Function scope: expected return type, then parameters; the
        // body block nests its own scope inside.
        self.scopes.push(Some(ret));
        for (param, ty) in param_tys {
            let param_name = self.ctx.intern(&param.name);
            if !self.scopes.declare(VarBinding {
                name: param_name,
                ty,
                span: param.name_span,
            }) {
                self.ctx.diagnostics.error(
                    param.name_span,
                    format!("duplicate declaration of variable `{}`", param.name),
                );
                ok = false;
            }
        }

        ok &= self.analyze_block(&mut decl.body);
        self.scopes.pop();

        // The no-recursion rule is a whole-call-graph property.
        if recursion::reaches_itself(&self.call_graph, name) {
            self.ctx.diagnostics.error(
                decl.name_span,
                format!("recursive function call in {}", decl.name),
            );
            return false;
        }

        ok
    }

    fn analyze_assign(&mut self, assign: &mut Assign) -> bool {
        let base_name = self.ctx.intern(assign.target.base_name());
        let base_span = assign.target.base_span();

        let base = match self.scopes.lookup(base_name) {
            Some(binding) => binding.clone(),
            None => {
                self.ctx.diagnostics.error(
                    base_span,
                    format!(
                        "assignment to undefined variable `{}`",
                        assign.target.base_name()
                    ),
                );
                return false;
            }
        };

        match &mut assign.target {
            AssignTarget::Var { name, .. } => {
                let name = name.clone();
                if !self.analyze_expr(&mut assign.value, Some(base.ty)) {
                    return false;
                }
                self.check_assignable(
                    assign.value.ty,
                    base.ty,
                    assign.value.span,
                    &format!("assignment to {}", name),
                )
            }
            AssignTarget::ListElem { name, index, .. } => {
                let name = name.clone();
                if !base.ty.is_list {
                    self.ctx
                        .diagnostics
                        .error(base_span, format!("`{}` is not a list", name));
                    return false;
                }
                if !self.analyze_expr(index, None) {
                    return false;
                }
                if !matches!(index.ty.kind, TypeKind::Int | TypeKind::UInt) || index.ty.is_list {
                    self.ctx
                        .diagnostics
                        .error(index.span, "list index must be an integer");
                    return false;
                }
                let elem = base.ty.element();
                if !self.analyze_expr(&mut assign.value, Some(elem)) {
                    return false;
                }
                self.check_assignable(
                    assign.value.ty,
                    elem,
                    assign.value.span,
                    &format!("assignment to {}", name),
                )
            }
            AssignTarget::Field {
                name,
                field,
                field_span,
                ..
            } => {
                let name = name.clone();
                let field = field.clone();
                let field_span = *field_span;
                let field_ty = match self.record_field_ty(base.ty, &name, &field, base_span, field_span)
                {
                    Some(ty) => ty,
                    None => return false,
                };
                if !self.analyze_expr(&mut assign.value, Some(field_ty)) {
                    return false;
                }
                self.check_assignable(
                    assign.value.ty,
                    field_ty,
                    assign.value.span,
                    &format!("assignment to {}", name),
                )
            }
        }
    }

    fn analyze_if(&mut self, if_stmt: &mut IfStmt) -> bool {
        let mut ok = self.analyze_expr(&mut if_stmt.cond, None);
        if ok && !if_stmt.cond.ty.is_condition() {
            self.ctx.diagnostics.error(
                if_stmt.cond.span,
                "condition cannot evaluate to a boolean",
            );
            ok = false;
        }

        ok &= self.analyze_block(&mut if_stmt.then_block);
        match &mut if_stmt.else_branch {
            Some(ElseBranch::ElseIf(stmt)) => ok &= self.analyze_stmt(stmt),
            Some(ElseBranch::Else(block)) => ok &= self.analyze_block(block),
            None => {}
        }
        ok
    }

    fn analyze_foreach(&mut self, foreach: &mut Foreach) -> bool {
        let list_name = self.ctx.intern(&foreach.list);
        let list_ty = match self.scopes.lookup(list_name) {
            Some(binding) => binding.ty,
            None => {
                self.ctx.diagnostics.error(
                    foreach.list_span,
                    format!("undefined variable `{}`", foreach.list),
                );
                return false;
            }
        };
        if !list_ty.is_list {
            self.ctx
                .diagnostics
                .error(foreach.list_span, format!("`{}` is not a list", foreach.list));
            return false;
        }

        // Fresh scope binding a scalar of the element type under the
        // iteration-variable name; the body block nests inside it.
        self.scopes.push_inherit();
        let var_name = self.ctx.intern(&foreach.var);
        let mut ok = true;
        if self.ctx.defs.lookup(var_name, Namespace::Value).is_some() {
            self.ctx.diagnostics.error(
                foreach.var_span,
                format!("`{}` is already declared as a function", foreach.var),
            );
            ok = false;
        } else if !self.scopes.declare(VarBinding {
            name: var_name,
            ty: list_ty.element(),
            span: foreach.var_span,
        }) {
            self.ctx.diagnostics.error(
                foreach.var_span,
                format!("duplicate declaration of variable `{}`", foreach.var),
            );
            ok = false;
        }

        ok &= self.analyze_block(&mut foreach.body);
        self.scopes.pop();
        ok
    }

    fn analyze_return(&mut self, expr: Option<&mut Expr>, span: Span) -> bool {
        let expected = self.scopes.expected_return();

        let expr = match expr {
            Some(expr) => expr,
            None => {
                return match expected {
                    // A bare top-level return exits with code 0.
                    None => true,
                    Some(Type::VOID) => true,
                    Some(other) => {
                        self.ctx.diagnostics.error(
                            span,
                            format!(
                                "returning void when {} was expected",
                                self.ctx.type_str(other)
                            ),
                        );
                        false
                    }
                };
            }
        };

        if !self.analyze_expr(expr, expected) {
            return false;
        }

        // A top-level return overrides the program exit code; any scalar
        // is accepted and coerced by the emitter.
        let expected = match expected {
            None => {
                if expr.ty.is_list || expr.ty.is_record() || expr.ty == Type::VOID {
                    self.ctx.diagnostics.error(
                        expr.span,
                        format!(
                            "cannot return {} from the top level",
                            self.ctx.type_str(expr.ty)
                        ),
                    );
                    return false;
                }
                return true;
            }
            Some(expected) => expected,
        };

        if expr.ty == expected {
            return true;
        }
        if expr.ty.promotes_to(expected) {
            self.warn_upcast(expr.ty, expected, expr.span, "in return");
            return true;
        }
        self.ctx.diagnostics.error(
            expr.span,
            format!(
                "returning {} when {} was expected",
                self.ctx.type_str(expr.ty),
                self.ctx.type_str(expected)
            ),
        );
        false
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// Analyze an expression, annotating its `ty` slot. `expected` is
    /// only consulted where the expression cannot determine its own type
    /// (the empty list literal).
    fn analyze_expr(&mut self, expr: &mut Expr, expected: Option<Type>) -> bool {
        match expr.kind {
            ExprKind::Literal(_) => return self.analyze_literal(expr, expected),
            ExprKind::Call { .. } => return self.analyze_call(expr),
            ExprKind::Binary { .. } => return self.analyze_binary(expr),
            ExprKind::Unary { .. } => return self.analyze_unary(expr),
            _ => {}
        }

        let ok = match &mut expr.kind {
            ExprKind::Variable(name) => {
                let name = name.clone();
                let interned = self.ctx.intern(&name);
                match self.scopes.lookup(interned) {
                    Some(binding) => {
                        expr.ty = binding.ty;
                        true
                    }
                    None => {
                        self.ctx
                            .diagnostics
                            .error(expr.span, format!("undefined variable `{}`", name));
                        false
                    }
                }
            }
            ExprKind::ListAccess {
                base,
                base_span,
                index,
            } => {
                let base = base.clone();
                let base_span = *base_span;
                let interned = self.ctx.intern(&base);
                match self.scopes.lookup(interned).map(|b| b.ty) {
                    None => {
                        self.ctx
                            .diagnostics
                            .error(base_span, format!("undefined variable `{}`", base));
                        false
                    }
                    Some(base_ty) if !base_ty.is_list => {
                        self.ctx
                            .diagnostics
                            .error(base_span, format!("`{}` is not a list", base));
                        false
                    }
                    Some(base_ty) => {
                        if !self.analyze_expr(index, None) {
                            false
                        } else if !matches!(index.ty.kind, TypeKind::Int | TypeKind::UInt)
                            || index.ty.is_list
                        {
                            self.ctx
                                .diagnostics
                                .error(index.span, "list index must be an integer");
                            false
                        } else {
                            expr.ty = base_ty.element();
                            true
                        }
                    }
                }
            }
            ExprKind::FieldAccess {
                base,
                base_span,
                field,
                field_span,
            } => {
                let base = base.clone();
                let field = field.clone();
                let base_span = *base_span;
                let field_span = *field_span;
                let interned = self.ctx.intern(&base);
                match self.scopes.lookup(interned).map(|b| b.ty) {
                    None => {
                        self.ctx
                            .diagnostics
                            .error(base_span, format!("undefined variable `{}`", base));
                        false
                    }
                    Some(base_ty) => {
                        match self.record_field_ty(base_ty, &base, &field, base_span, field_span) {
                            Some(ty) => {
                                expr.ty = ty;
                                true
                            }
                            None => false,
                        }
                    }
                }
            }
            _ => unreachable!("handled above"),
        };

        if !ok {
            expr.ty = Type::INVALID;
        }
        ok
    }

    fn analyze_literal(&mut self, expr: &mut Expr, expected: Option<Type>) -> bool {
        let span = expr.span;

        // Scalar literals carry their type directly.
        let scalar_ty = match &expr.kind {
            ExprKind::Literal(Literal::Int(_)) => Some(Type::INT),
            ExprKind::Literal(Literal::UInt(_)) => Some(Type::UINT),
            ExprKind::Literal(Literal::Double(_)) => Some(Type::DOUBLE),
            ExprKind::Literal(Literal::Bool(_)) => Some(Type::BOOL),
            ExprKind::Literal(Literal::Char(_)) => Some(Type::CHAR),
            ExprKind::Literal(Literal::Str(_)) => Some(Type::STRING),
            ExprKind::Literal(Literal::List(_)) => None,
            _ => unreachable!(),
        };
        if let Some(ty) = scalar_ty {
            expr.ty = ty;
            return true;
        }

        let mut elems = match &mut expr.kind {
            ExprKind::Literal(Literal::List(elems)) => std::mem::take(elems),
            _ => unreachable!(),
        };

        let result = if elems.is_empty() {
            // The empty list adopts the declared target type.
            match expected {
                Some(ty) if ty.is_list => ty,
                _ => {
                    self.ctx
                        .diagnostics
                        .error(span, "cannot infer element type of empty list");
                    Type::INVALID
                }
            }
        } else {
            let mut ok = true;
            for elem in &mut elems {
                ok &= self.analyze_expr(elem, None);
            }
            if !ok {
                Type::INVALID
            } else {
                let first = elems[0].ty;
                if elems.iter().any(|e| e.ty != first) {
                    self.ctx
                        .diagnostics
                        .error(span, "list contains differing types");
                    Type::INVALID
                } else if first.is_list || first.is_record() {
                    self.ctx.diagnostics.error(
                        span,
                        format!("lists of {} are not supported", self.ctx.type_str(first)),
                    );
                    Type::INVALID
                } else {
                    Type::list_of(first.kind)
                }
            }
        };

        if let ExprKind::Literal(Literal::List(slot)) = &mut expr.kind {
            *slot = elems;
        }
        expr.ty = result;
        !result.is_invalid()
    }

    fn analyze_call(&mut self, expr: &mut Expr) -> bool {
        let span = expr.span;
        let (callee, callee_span) = match &expr.kind {
            ExprKind::Call {
                callee, callee_span, ..
            } => (callee.clone(), *callee_span),
            _ => unreachable!(),
        };

        let name = self.ctx.intern(&callee);
        let func = match self.ctx.defs.lookup_function(name) {
            Some(func) => func.clone(),
            None => {
                self.ctx
                    .diagnostics
                    .error(callee_span, format!("call to undefined function `{}`", callee));
                expr.ty = Type::INVALID;
                return false;
            }
        };

        let mut args = match &mut expr.kind {
            ExprKind::Call { args, .. } => std::mem::take(args),
            _ => unreachable!(),
        };

        let param_tys = self.ctx.defs.param_types(&func);
        if args.len() != param_tys.len() {
            self.ctx.diagnostics.error(
                span,
                format!(
                    "wrong number of arguments to `{}`: expected {}, found {}",
                    callee,
                    param_tys.len(),
                    args.len()
                ),
            );
            if let ExprKind::Call { args: slot, .. } = &mut expr.kind {
                *slot = args;
            }
            expr.ty = Type::INVALID;
            return false;
        }
        let mut ok = true;
        for (arg, &param_ty) in args.iter_mut().zip(&param_tys) {
            if !self.analyze_expr(arg, Some(param_ty)) {
                ok = false;
                continue;
            }
            // An opaque list parameter accepts any list argument.
            if param_ty == stdlib::ANY_LIST && arg.ty.is_list {
                continue;
            }
            if arg.ty == param_ty {
                continue;
            }
            if arg.ty.promotes_to(param_ty) {
                self.warn_upcast(
                    arg.ty,
                    param_ty,
                    arg.span,
                    &format!("in call to `{}`", callee),
                );
                continue;
            }
            self.ctx.diagnostics.error(
                arg.span,
                format!(
                    "type mismatch in call to `{}`: expected {}, found {}",
                    callee,
                    self.ctx.type_str(param_ty),
                    self.ctx.type_str(arg.ty)
                ),
            );
            ok = false;
        }
        if let ExprKind::Call { args: slot, .. } = &mut expr.kind {
            *slot = args;
        }

        expr.ty = if ok { func.ret } else { Type::INVALID };
        ok
    }

    fn analyze_binary(&mut self, expr: &mut Expr) -> bool {
        let span = expr.span;
        let (op, lhs, rhs) = match &mut expr.kind {
            ExprKind::Binary { op, lhs, rhs } => (*op, lhs, rhs),
            _ => unreachable!(),
        };

        let mut ok = self.analyze_expr(lhs, None);
        ok &= self.analyze_expr(rhs, None);
        if !ok {
            expr.ty = Type::INVALID;
            return false;
        }
        let (lt, rt) = (lhs.ty, rhs.ty);

        if lt.is_list || rt.is_list {
            self.ctx.diagnostics.error(
                span,
                format!("binary operator `{}` cannot be applied to lists", op),
            );
            expr.ty = Type::INVALID;
            return false;
        }

        if !lt.le(rt) && !rt.le(lt) {
            self.ctx.diagnostics.error(
                span,
                format!("binary operator type mismatch for op {}", op),
            );
            expr.ty = Type::INVALID;
            return false;
        }

        let larger = Type::larger(lt, rt);

        if op.is_logical() && !matches!(larger.kind, TypeKind::Bool | TypeKind::Int | TypeKind::UInt)
        {
            self.ctx.diagnostics.error(
                span,
                format!("binary operator `{}` requires boolean or integer operands", op),
            );
            expr.ty = Type::INVALID;
            return false;
        }
        if op.is_bitwise() && !larger.is_integral() {
            self.ctx.diagnostics.error(
                span,
                format!("binary operator `{}` requires integer operands", op),
            );
            expr.ty = Type::INVALID;
            return false;
        }
        if op.is_arithmetic() && !larger.is_numeric() {
            self.ctx.diagnostics.error(
                span,
                format!("binary operator `{}` requires numeric operands", op),
            );
            expr.ty = Type::INVALID;
            return false;
        }

        expr.ty = if op.yields_bool() { Type::BOOL } else { larger };
        true
    }

    fn analyze_unary(&mut self, expr: &mut Expr) -> bool {
        let span = expr.span;
        let (op, operand) = match &mut expr.kind {
            ExprKind::Unary { op, operand } => (*op, operand),
            _ => unreachable!(),
        };

        if !self.analyze_expr(operand, None) {
            expr.ty = Type::INVALID;
            return false;
        }

        match op {
            UnaryOp::Not => {
                if !operand.ty.is_condition() {
                    self.ctx
                        .diagnostics
                        .error(span, "operand of `!` cannot evaluate to a boolean");
                    expr.ty = Type::INVALID;
                    return false;
                }
                expr.ty = Type::BOOL;
            }
            UnaryOp::Neg => {
                if !operand.ty.is_numeric() {
                    self.ctx
                        .diagnostics
                        .error(span, "operand of unary `-` must be numeric");
                    expr.ty = Type::INVALID;
                    return false;
                }
                expr.ty = operand.ty;
            }
        }
        true
    }

    // ========================================================================
    // Shared checks
    // ========================================================================

    /// `value ≤ target` with an up-cast warning on strict promotion and a
    /// type-mismatch error otherwise. `what` names the construct.
    fn check_assignable(&mut self, value: Type, target: Type, span: Span, what: &str) -> bool {
        if value.is_invalid() || target.is_invalid() {
            return false;
        }
        if value == target {
            return true;
        }
        if value.promotes_to(target) {
            self.warn_upcast(value, target, span, &format!("for {}", what));
            return true;
        }

        let mut diag = crate::diagnostic::Diagnostic::error(format!(
            "type mismatch for {}",
            what
        ))
        .with_span(span);
        if target.is_string() && value.is_numeric() {
            diag = diag.with_note("there is no implicit conversion from a numeric type to str");
        }
        self.ctx.diagnostics.push(diag);
        false
    }

    fn warn_upcast(&mut self, from: Type, to: Type, span: Span, context: &str) {
        let message = format!(
            "implicit up-cast from {} to {} {}",
            self.ctx.type_str(from),
            self.ctx.type_str(to),
            context
        );
        self.ctx.diagnostics.warning(span, message);
    }

    /// Resolve `base.field`, checking that the base is a record and the
    /// field exists. Returns the field's type.
    fn record_field_ty(
        &mut self,
        base_ty: Type,
        base: &str,
        field: &str,
        base_span: Span,
        field_span: Span,
    ) -> Option<Type> {
        let record_name = match base_ty.kind {
            TypeKind::Record(name) if !base_ty.is_list => name,
            _ => {
                self.ctx
                    .diagnostics
                    .error(base_span, format!("`{}` is not a struct", base));
                return None;
            }
        };

        let record_id = self.ctx.defs.lookup(record_name, Namespace::Type)?;
        let field_name = self.ctx.intern(field);
        match self.ctx.defs.find_field(record_id, field_name) {
            Some((_, field_id)) => self.ctx.defs.as_field(field_id).map(|f| f.ty),
            None => {
                self.ctx.diagnostics.error(
                    field_span,
                    format!(
                        "struct `{}` has no field `{}`",
                        self.ctx.str(record_name),
                        field
                    ),
                );
                None
            }
        }
    }
}

// ============================================================================
// Call graph collection (syntactic, pre-analysis)
// ============================================================================

fn collect_calls_block(block: &Block, ctx: &CompilerContext, out: &mut Vec<Name>) {
    for stmt in &block.stmts {
        collect_calls_stmt(stmt, ctx, out);
    }
}

fn collect_calls_stmt(stmt: &Stmt, ctx: &CompilerContext, out: &mut Vec<Name>) {
    match &stmt.kind {
        StmtKind::VarDecl(decl) => {
            if let Some(init) = &decl.init {
                collect_calls_expr(init, ctx, out);
            }
        }
        StmtKind::RecordDecl(_) => {}
        // Functions are top-level only; a nested declaration is a parse
        // error, so there is nothing to walk into here.
        StmtKind::FuncDecl(_) => {}
        StmtKind::Assign(assign) => {
            if let AssignTarget::ListElem { index, .. } = &assign.target {
                collect_calls_expr(index, ctx, out);
            }
            collect_calls_expr(&assign.value, ctx, out);
        }
        StmtKind::If(if_stmt) => {
            collect_calls_expr(&if_stmt.cond, ctx, out);
            collect_calls_block(&if_stmt.then_block, ctx, out);
            match &if_stmt.else_branch {
                Some(ElseBranch::ElseIf(nested)) => collect_calls_stmt(nested, ctx, out),
                Some(ElseBranch::Else(block)) => collect_calls_block(block, ctx, out),
                None => {}
            }
        }
        StmtKind::Foreach(foreach) => collect_calls_block(&foreach.body, ctx, out),
        StmtKind::Return(Some(expr)) => collect_calls_expr(expr, ctx, out),
        StmtKind::Return(None) => {}
        StmtKind::Call(expr) => collect_calls_expr(expr, ctx, out),
    }
}

fn collect_calls_expr(expr: &Expr, ctx: &CompilerContext, out: &mut Vec<Name>) {
    match &expr.kind {
        ExprKind::Call { callee, args, .. } => {
            out.push(ctx.intern(callee));
            for arg in args {
                collect_calls_expr(arg, ctx, out);
            }
        }
        ExprKind::Binary { lhs, rhs, .. } => {
            collect_calls_expr(lhs, ctx, out);
            collect_calls_expr(rhs, ctx, out);
        }
        ExprKind::Unary { operand, .. } => collect_calls_expr(operand, ctx, out),
        ExprKind::ListAccess { index, .. } => collect_calls_expr(index, ctx, out),
        ExprKind::Literal(Literal::List(elems)) => {
            for elem in elems {
                collect_calls_expr(elem, ctx, out);
            }
        }
        _ => {}
    }
}
