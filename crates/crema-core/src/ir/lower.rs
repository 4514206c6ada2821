//! AST to IR lowering.
//!
//! Consumes a semantically valid, type-annotated AST and produces an
//! [`IrModule`]. Storage allocation, control-flow lowering, implicit
//! coercions and the runtime-call dispatch all live here. Anything the
//! analyzer should have rejected is a compiler bug and panics rather
//! than producing a diagnostic.

use std::collections::HashMap;

use crate::context::CompilerContext;
use crate::definitions::Namespace;
use crate::ids::{BlockId, FuncId, GlobalId, SlotId, TempId};
use crate::interner::Name;
use crate::ir::block::{
    BinInst, CastKind, Constant, FcmpPred, IcmpPred, Inst, IrType, Operand, Ptr, Terminator,
};
use crate::ir::layout::LayoutContext;
use crate::ir::module::{IrFunction, IrModule};
use crate::stdlib::{self, RUNTIME_DECLS};
use crate::syntax::ast::*;
use crate::types::{Type, TypeKind};

/// Lower an analyzed program to an IR module.
pub fn lower(program: &Program, ctx: &CompilerContext, module_name: &str) -> IrModule {
    let mut emitter = Emitter::new(ctx, module_name);
    emitter.emit_program(program);
    emitter.module
}

/// Where a variable lives.
#[derive(Debug, Clone, Copy)]
enum Storage {
    Global(GlobalId),
    Slot(SlotId),
}

impl Storage {
    fn ptr(self) -> Ptr {
        match self {
            Storage::Global(g) => Ptr::Global(g),
            Storage::Slot(s) => Ptr::Slot(s),
        }
    }
}

/// A name's storage plus its source-level type.
#[derive(Debug, Clone, Copy)]
struct Binding {
    storage: Storage,
    ty: Type,
}

/// Emitter state for one module.
struct Emitter<'ctx> {
    ctx: &'ctx CompilerContext,
    module: IrModule,
    /// Scope frames mapping names to storage, pushed and popped in
    /// lockstep with the analyzer's frames.
    scopes: Vec<HashMap<Name, Binding>>,
    /// Current function and insertion block.
    current: FuncId,
    block: BlockId,
    /// The entry function (`main`); returns there set the exit code.
    entry_func: FuncId,
    /// Declared source-level return type of the current user function.
    current_ret: Type,
}

impl<'ctx> Emitter<'ctx> {
    fn new(ctx: &'ctx CompilerContext, module_name: &str) -> Self {
        Self {
            ctx,
            module: IrModule::new(module_name),
            scopes: Vec::new(),
            current: FuncId(0),
            block: IrFunction::ENTRY,
            entry_func: FuncId(0),
            current_ret: Type::INT,
        }
    }

    // ========================================================================
    // Module prelude
    // ========================================================================

    fn emit_program(&mut self, program: &Program) {
        // Runtime declarations.
        for decl in RUNTIME_DECLS {
            let params = decl.params.iter().map(|&p| IrType::of(p)).collect();
            self.module
                .declare_function(decl.name, params, IrType::of(decl.ret), true);
        }

        // Record layouts, in declaration order.
        for layout in LayoutContext::new().compute_all(&self.ctx.defs) {
            self.module.add_layout(layout);
        }

        // User function signatures, so calls resolve regardless of the
        // declaration order.
        for func_id in self.ctx.defs.functions() {
            let func = self.ctx.defs.as_function(func_id).expect("function def");
            if func.is_external {
                continue;
            }
            let params = self
                .ctx
                .defs
                .param_types(func)
                .iter()
                .map(|&p| IrType::of(p))
                .collect();
            self.module.declare_function(
                self.ctx.str(func.name),
                params,
                IrType::of(func.ret),
                false,
            );
        }

        // The entry function: i64 main(i64 argc, ptr argv).
        let main = self
            .module
            .declare_function("main", vec![IrType::I64, IrType::Ptr], IrType::I64, false);
        self.entry_func = main;
        self.current = main;
        self.block = IrFunction::ENTRY;

        let argc = self.module.functions[main].param(0);
        let argv = self.module.functions[main].param(1);
        self.call_runtime("save_args", vec![argc, argv], Type::VOID);

        self.scopes.push(HashMap::new());
        for stmt in &program.stmts {
            self.emit_stmt(stmt);
        }
        self.scopes.pop();

        if !self.current_block_terminated() {
            self.terminate(Terminator::Ret(Some(Operand::Const(Constant::Int(0)))));
        }
    }

    // ========================================================================
    // Insertion-point helpers
    // ========================================================================

    fn func_mut(&mut self) -> &mut IrFunction {
        &mut self.module.functions[self.current]
    }

    fn push(&mut self, inst: Inst) {
        let block = self.block;
        self.func_mut().push_inst(block, inst);
    }

    fn terminate(&mut self, terminator: Terminator) {
        let block = self.block;
        self.func_mut().terminate(block, terminator);
    }

    fn current_block_terminated(&self) -> bool {
        self.module.functions[self.current].blocks[self.block].is_terminated()
    }

    fn new_block(&mut self, label: &'static str) -> BlockId {
        self.func_mut().new_block(label)
    }

    fn new_temp(&mut self, ty: IrType) -> TempId {
        self.func_mut().new_temp(ty)
    }

    fn lookup(&self, name: Name) -> Binding {
        self.scopes
            .iter()
            .rev()
            .find_map(|frame| frame.get(&name))
            .copied()
            .unwrap_or_else(|| panic!("unresolved variable reached the emitter"))
    }

    fn bind(&mut self, name: Name, binding: Binding) {
        self.scopes
            .last_mut()
            .expect("no open emitter scope")
            .insert(name, binding);
    }

    /// Resolve a type annotation. Analysis guaranteed it is well-formed.
    fn resolve_ty(&self, ty: &TyExpr) -> Type {
        match &ty.kind {
            TyExprKind::Void => Type::VOID,
            TyExprKind::Int => Type::INT,
            TyExprKind::UInt => Type::UINT,
            TyExprKind::Double => Type::DOUBLE,
            TyExprKind::Char => Type::CHAR,
            TyExprKind::Bool => Type::BOOL,
            TyExprKind::Str => Type::STRING,
            TyExprKind::Named(name) => Type::record(self.ctx.intern(name)),
            TyExprKind::List(inner) => {
                let elem = self.resolve_ty(inner);
                Type::list_of(elem.kind)
            }
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn emit_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::VarDecl(decl) => self.emit_var_decl(decl),
            // Records contribute layouts only.
            StmtKind::RecordDecl(_) => {}
            StmtKind::FuncDecl(decl) => self.emit_function(decl),
            StmtKind::Assign(assign) => self.emit_assign(assign),
            StmtKind::If(if_stmt) => self.emit_if(if_stmt),
            StmtKind::Foreach(foreach) => self.emit_foreach(foreach),
            StmtKind::Return(expr) => self.emit_return(expr.as_ref()),
            StmtKind::Call(expr) => {
                self.emit_expr(expr);
            }
        }
    }

    fn emit_var_decl(&mut self, decl: &VarDecl) {
        let ty = self.resolve_ty(&decl.ty);
        let ir_ty = IrType::of(ty);
        let name = self.ctx.intern(&decl.name);

        // Top-level declarations live in module globals with undefined
        // initial values; everything else gets a stack slot.
        let storage = if self.scopes.len() == 1 {
            Storage::Global(self.module.add_global(decl.name.clone(), ir_ty))
        } else {
            Storage::Slot(self.func_mut().new_slot(decl.name.clone(), ir_ty))
        };
        self.bind(name, Binding { storage, ty });

        match &decl.init {
            Some(init) => {
                let value = self.emit_expr(init);
                let value = self.coerce(value, init.ty, ty);
                self.push(Inst::Store {
                    ptr: storage.ptr(),
                    ty: ir_ty,
                    value,
                });
            }
            None if ty.is_list => {
                // Lists and strings are constructed eagerly so element
                // writes always see a live handle.
                let handle = self.call_runtime(create_fn(ty.kind), vec![], ty);
                self.push(Inst::Store {
                    ptr: storage.ptr(),
                    ty: IrType::Ptr,
                    value: handle,
                });
            }
            None => {}
        }
    }

    fn emit_function(&mut self, decl: &FuncDecl) {
        let name = self.ctx.intern(&decl.name);
        let func_def_id = self
            .ctx
            .defs
            .lookup(name, Namespace::Value)
            .expect("function not registered");
        let func_def = self
            .ctx
            .defs
            .as_function(func_def_id)
            .expect("function def")
            .clone();
        let func_id = self
            .module
            .function_id(&decl.name)
            .expect("function not declared in module");

        let saved = (self.current, self.block, self.current_ret);
        self.current = func_id;
        self.block = IrFunction::ENTRY;
        self.current_ret = func_def.ret;

        // Parameters spill to stack slots and are addressed like any
        // other variable.
        self.scopes.push(HashMap::new());
        let param_tys = self.ctx.defs.param_types(&func_def);
        for (i, (param, &ty)) in decl.params.iter().zip(&param_tys).enumerate() {
            let ir_ty = IrType::of(ty);
            let slot = self.func_mut().new_slot(param.name.clone(), ir_ty);
            let incoming = self.module.functions[func_id].param(i);
            self.push(Inst::Store {
                ptr: Ptr::Slot(slot),
                ty: ir_ty,
                value: incoming,
            });
            let param_name = self.ctx.intern(&param.name);
            self.bind(
                param_name,
                Binding {
                    storage: Storage::Slot(slot),
                    ty,
                },
            );
        }

        self.emit_block(&decl.body);

        // Guard against bodies lacking an explicit return.
        if !self.current_block_terminated() {
            let term = match IrType::of(func_def.ret) {
                IrType::Void | IrType::Record(_) => Terminator::Ret(None),
                other => Terminator::Ret(Some(Operand::Const(other.zero()))),
            };
            self.terminate(term);
        }

        self.scopes.pop();
        (self.current, self.block, self.current_ret) = saved;
    }

    fn emit_block(&mut self, block: &Block) {
        self.scopes.push(HashMap::new());
        for stmt in &block.stmts {
            self.emit_stmt(stmt);
        }
        self.scopes.pop();
    }

    fn emit_assign(&mut self, assign: &Assign) {
        let name = self.ctx.intern(assign.target.base_name());
        let binding = self.lookup(name);

        match &assign.target {
            AssignTarget::Var { .. } => {
                let value = self.emit_expr(&assign.value);
                let value = self.coerce(value, assign.value.ty, binding.ty);
                self.push(Inst::Store {
                    ptr: binding.storage.ptr(),
                    ty: IrType::of(binding.ty),
                    value,
                });
            }
            AssignTarget::ListElem { index, .. } => {
                let elem = binding.ty.element();
                let handle = self.load_from(binding.storage.ptr(), IrType::Ptr);
                let index = self.emit_expr(index);
                let value = self.emit_expr(&assign.value);
                let value = self.coerce(value, assign.value.ty, elem);
                let value = self.widen_list_elem(value, elem);
                self.call_runtime(insert_fn(elem.kind), vec![handle, index, value], Type::VOID);
            }
            AssignTarget::Field { field, .. } => {
                let (record, field_idx, field_ty) = self.field_info(binding.ty, field);
                let addr = self.new_temp(IrType::Ptr);
                self.push(Inst::FieldAddr {
                    dest: addr,
                    base: binding.storage.ptr(),
                    record,
                    field: field_idx,
                });
                let value = self.emit_expr(&assign.value);
                let value = self.coerce(value, assign.value.ty, field_ty);
                self.push(Inst::Store {
                    ptr: Ptr::Temp(addr),
                    ty: IrType::of(field_ty),
                    value,
                });
            }
        }
    }

    fn emit_if(&mut self, if_stmt: &IfStmt) {
        let cond = self.emit_expr(&if_stmt.cond);
        let cond = self.to_bool(cond, if_stmt.cond.ty);

        let then_bb = self.new_block("then");
        let else_bb = self.new_block("else");
        let cont_bb = self.new_block("ifcont");

        self.terminate(Terminator::CondBr {
            cond,
            then_bb,
            else_bb,
        });

        self.block = then_bb;
        self.emit_block(&if_stmt.then_block);
        if !self.current_block_terminated() {
            self.terminate(Terminator::Br(cont_bb));
        }

        self.block = else_bb;
        match &if_stmt.else_branch {
            Some(ElseBranch::ElseIf(nested)) => self.emit_stmt(nested),
            Some(ElseBranch::Else(block)) => self.emit_block(block),
            None => {}
        }
        if !self.current_block_terminated() {
            self.terminate(Terminator::Br(cont_bb));
        }

        self.block = cont_bb;
    }

    fn emit_foreach(&mut self, foreach: &Foreach) {
        let list_name = self.ctx.intern(&foreach.list);
        let list = self.lookup(list_name);
        let elem = list.ty.element();
        let elem_ir = IrType::of(elem);

        self.scopes.push(HashMap::new());

        // Induction integer plus a scalar holding the current element.
        let idx_slot = self
            .func_mut()
            .new_slot(format!("{}.idx", foreach.var), IrType::I64);
        let elem_slot = self.func_mut().new_slot(foreach.var.clone(), elem_ir);
        let var_name = self.ctx.intern(&foreach.var);
        self.bind(
            var_name,
            Binding {
                storage: Storage::Slot(elem_slot),
                ty: elem,
            },
        );

        self.push(Inst::Store {
            ptr: Ptr::Slot(idx_slot),
            ty: IrType::I64,
            value: Operand::Const(Constant::Int(0)),
        });

        let cond_bb = self.new_block("forcond");
        let body_bb = self.new_block("forbody");
        let end_bb = self.new_block("forend");
        self.terminate(Terminator::Br(cond_bb));

        // Pre-block: induction < list_length(list).
        self.block = cond_bb;
        let idx = self.load_from(Ptr::Slot(idx_slot), IrType::I64);
        let handle = self.load_from(list.storage.ptr(), IrType::Ptr);
        let len = self.call_runtime("list_length", vec![handle], Type::INT);
        let cmp = self.new_temp(IrType::I1);
        self.push(Inst::Icmp {
            dest: cmp,
            pred: IcmpPred::Slt,
            ty: IrType::I64,
            lhs: idx,
            rhs: len,
        });
        self.terminate(Terminator::CondBr {
            cond: Operand::Temp(cmp),
            then_bb: body_bb,
            else_bb: end_bb,
        });

        // Body: load the element, run the user body, bump the induction.
        self.block = body_bb;
        let handle = self.load_from(list.storage.ptr(), IrType::Ptr);
        let idx = self.load_from(Ptr::Slot(idx_slot), IrType::I64);
        let value = self.retrieve_elem(elem, handle, idx);
        self.push(Inst::Store {
            ptr: Ptr::Slot(elem_slot),
            ty: elem_ir,
            value,
        });

        self.emit_block(&foreach.body);

        if !self.current_block_terminated() {
            let idx = self.load_from(Ptr::Slot(idx_slot), IrType::I64);
            let next = self.new_temp(IrType::I64);
            self.push(Inst::Bin {
                dest: next,
                op: BinInst::Add,
                ty: IrType::I64,
                lhs: idx,
                rhs: Operand::Const(Constant::Int(1)),
            });
            self.push(Inst::Store {
                ptr: Ptr::Slot(idx_slot),
                ty: IrType::I64,
                value: Operand::Temp(next),
            });
            self.terminate(Terminator::Br(cond_bb));
        }

        self.block = end_bb;
        self.scopes.pop();
    }

    fn emit_return(&mut self, expr: Option<&Expr>) {
        if self.current == self.entry_func {
            // A top-level return overrides the exit code.
            let value = match expr {
                Some(expr) => {
                    let value = self.emit_expr(expr);
                    self.exit_code(value, expr.ty)
                }
                None => Operand::Const(Constant::Int(0)),
            };
            self.terminate(Terminator::Ret(Some(value)));
        } else {
            let ret_ty = self.current_ret;
            let value = expr.map(|expr| {
                let value = self.emit_expr(expr);
                self.coerce(value, expr.ty, ret_ty)
            });
            self.terminate(Terminator::Ret(value));
        }

        // Anything after a return lands in an unreachable block.
        let dead = self.new_block("dead");
        self.block = dead;
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn emit_expr(&mut self, expr: &Expr) -> Operand {
        match &expr.kind {
            ExprKind::Literal(lit) => self.emit_literal(lit, expr.ty),
            ExprKind::Variable(name) => {
                let binding = self.lookup(self.ctx.intern(name));
                self.load_from(binding.storage.ptr(), IrType::of(binding.ty))
            }
            ExprKind::ListAccess { base, index, .. } => {
                let binding = self.lookup(self.ctx.intern(base));
                let elem = binding.ty.element();
                let handle = self.load_from(binding.storage.ptr(), IrType::Ptr);
                let index = self.emit_expr(index);
                self.retrieve_elem(elem, handle, index)
            }
            ExprKind::FieldAccess { base, field, .. } => {
                let binding = self.lookup(self.ctx.intern(base));
                let (record, field_idx, field_ty) = self.field_info(binding.ty, field);
                let addr = self.new_temp(IrType::Ptr);
                self.push(Inst::FieldAddr {
                    dest: addr,
                    base: binding.storage.ptr(),
                    record,
                    field: field_idx,
                });
                self.load_from(Ptr::Temp(addr), IrType::of(field_ty))
            }
            ExprKind::Call { callee, args, .. } => self.emit_call(callee, args),
            ExprKind::Binary { op, lhs, rhs } => self.emit_binary(*op, lhs, rhs),
            ExprKind::Unary { op, operand } => self.emit_unary(*op, operand),
        }
    }

    fn emit_literal(&mut self, lit: &Literal, ty: Type) -> Operand {
        match lit {
            Literal::Int(v) => Operand::Const(Constant::Int(*v)),
            Literal::UInt(v) => Operand::Const(Constant::UInt(*v)),
            Literal::Double(v) => Operand::Const(Constant::Double(*v)),
            Literal::Bool(v) => Operand::Const(Constant::Bool(*v)),
            Literal::Char(c) => Operand::Const(Constant::Char(*c as u8)),
            Literal::Str(s) => {
                // A heap string built character by character.
                let handle = self.call_runtime("str_create", vec![], Type::STRING);
                for byte in s.bytes() {
                    self.call_runtime(
                        "str_append",
                        vec![handle, Operand::Const(Constant::Char(byte))],
                        Type::VOID,
                    );
                }
                handle
            }
            Literal::List(elems) => {
                let elem = ty.element();
                let handle = self.call_runtime(create_fn(elem.kind), vec![], ty);
                for elem_expr in elems {
                    let value = self.emit_expr(elem_expr);
                    let value = self.widen_list_elem(value, elem);
                    self.call_runtime(append_fn(elem.kind), vec![handle, value], Type::VOID);
                }
                handle
            }
        }
    }

    fn emit_call(&mut self, callee: &str, args: &[Expr]) -> Operand {
        let name = self.ctx.intern(callee);
        let def_id = self
            .ctx
            .defs
            .lookup(name, Namespace::Value)
            .expect("call to unregistered function");
        let func_def = self.ctx.defs.as_function(def_id).expect("function def");
        let ret = func_def.ret;
        let param_tys = self.ctx.defs.param_types(func_def);

        let mut arg_ops = Vec::with_capacity(args.len());
        for (arg, &param_ty) in args.iter().zip(&param_tys) {
            let value = self.emit_expr(arg);
            let value = if param_ty == stdlib::ANY_LIST {
                value
            } else {
                self.coerce(value, arg.ty, param_ty)
            };
            arg_ops.push(value);
        }

        let func_id = self
            .module
            .function_id(callee)
            .unwrap_or_else(|| panic!("function `{}` not declared in module", callee));
        self.emit_call_inst(func_id, arg_ops, ret)
    }

    fn emit_binary(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr) -> Operand {
        if op.is_logical() {
            // Logical operators normalize both sides to i1.
            let lv = self.emit_expr(lhs);
            let lv = self.to_bool(lv, lhs.ty);
            let rv = self.emit_expr(rhs);
            let rv = self.to_bool(rv, rhs.ty);
            let inst = match op {
                BinOp::And => BinInst::And,
                BinOp::Or => BinInst::Or,
                _ => unreachable!(),
            };
            let dest = self.new_temp(IrType::I1);
            self.push(Inst::Bin {
                dest,
                op: inst,
                ty: IrType::I1,
                lhs: lv,
                rhs: rv,
            });
            return Operand::Temp(dest);
        }

        // Both operands coerce into the larger type.
        let larger = Type::larger(lhs.ty, rhs.ty);
        debug_assert!(!larger.is_invalid(), "incomparable operands in emitter");
        let lv = self.emit_expr(lhs);
        let lv = self.coerce(lv, lhs.ty, larger);
        let rv = self.emit_expr(rhs);
        let rv = self.coerce(rv, rhs.ty, larger);
        let ir_ty = IrType::of(larger);

        if op.is_comparison() {
            let dest = self.new_temp(IrType::I1);
            if ir_ty == IrType::F64 {
                self.push(Inst::Fcmp {
                    dest,
                    pred: fcmp_pred(op),
                    lhs: lv,
                    rhs: rv,
                });
            } else {
                self.push(Inst::Icmp {
                    dest,
                    pred: icmp_pred(op, larger.kind == TypeKind::UInt),
                    ty: ir_ty,
                    lhs: lv,
                    rhs: rv,
                });
            }
            return Operand::Temp(dest);
        }

        let inst = if op.is_bitwise() {
            match op {
                BinOp::BitAnd => BinInst::And,
                BinOp::BitOr => BinInst::Or,
                BinOp::BitXor => BinInst::Xor,
                _ => unreachable!(),
            }
        } else if ir_ty == IrType::F64 {
            match op {
                BinOp::Add => BinInst::FAdd,
                BinOp::Sub => BinInst::FSub,
                BinOp::Mul => BinInst::FMul,
                BinOp::Div => BinInst::FDiv,
                BinOp::Mod => BinInst::FRem,
                _ => unreachable!(),
            }
        } else {
            match op {
                BinOp::Add => BinInst::Add,
                BinOp::Sub => BinInst::Sub,
                BinOp::Mul => BinInst::Mul,
                BinOp::Div => BinInst::SDiv,
                BinOp::Mod => BinInst::SRem,
                _ => unreachable!(),
            }
        };

        let dest = self.new_temp(ir_ty);
        self.push(Inst::Bin {
            dest,
            op: inst,
            ty: ir_ty,
            lhs: lv,
            rhs: rv,
        });
        Operand::Temp(dest)
    }

    fn emit_unary(&mut self, op: UnaryOp, operand: &Expr) -> Operand {
        let value = self.emit_expr(operand);
        match op {
            UnaryOp::Not => {
                let value = self.to_bool(value, operand.ty);
                let dest = self.new_temp(IrType::I1);
                self.push(Inst::Bin {
                    dest,
                    op: BinInst::Xor,
                    ty: IrType::I1,
                    lhs: value,
                    rhs: Operand::Const(Constant::Bool(true)),
                });
                Operand::Temp(dest)
            }
            UnaryOp::Neg => {
                let ir_ty = IrType::of(operand.ty);
                let dest = self.new_temp(ir_ty);
                let (inst, zero) = if ir_ty == IrType::F64 {
                    (BinInst::FSub, Constant::Double(0.0))
                } else {
                    (BinInst::Sub, Constant::Int(0))
                };
                self.push(Inst::Bin {
                    dest,
                    op: inst,
                    ty: ir_ty,
                    lhs: Operand::Const(zero),
                    rhs: value,
                });
                Operand::Temp(dest)
            }
        }
    }

    // ========================================================================
    // Coercions and shared lowering
    // ========================================================================

    /// Insert the implicit coercion from `from` to `to`. Any pair the
    /// promotion lattice does not admit is a compiler bug.
    fn coerce(&mut self, value: Operand, from: Type, to: Type) -> Operand {
        if from == to {
            return value;
        }
        match (from.kind, to.kind) {
            (TypeKind::Int, TypeKind::Double) | (TypeKind::UInt, TypeKind::Double) => {
                self.cast(CastKind::SiToFp, value, IrType::I64, IrType::F64)
            }
            (TypeKind::Char, TypeKind::Int) => {
                self.cast(CastKind::ZExt, value, IrType::I8, IrType::I64)
            }
            (TypeKind::Bool, TypeKind::Int) | (TypeKind::Bool, TypeKind::UInt) => {
                self.cast(CastKind::ZExt, value, IrType::I1, IrType::I64)
            }
            (TypeKind::Bool, TypeKind::Double) => {
                let wide = self.cast(CastKind::ZExt, value, IrType::I1, IrType::I64);
                self.cast(CastKind::SiToFp, wide, IrType::I64, IrType::F64)
            }
            _ => panic!(
                "unsupported coercion from {} to {}",
                self.ctx.type_str(from),
                self.ctx.type_str(to)
            ),
        }
    }

    fn cast(&mut self, kind: CastKind, value: Operand, from: IrType, to: IrType) -> Operand {
        let dest = self.new_temp(to);
        self.push(Inst::Cast {
            dest,
            kind,
            value,
            from,
            to,
        });
        Operand::Temp(dest)
    }

    /// Lower a value to i1 for branching: non-boolean conditions compare
    /// not-equal against the appropriate zero.
    fn to_bool(&mut self, value: Operand, ty: Type) -> Operand {
        match IrType::of(ty) {
            IrType::I1 => value,
            IrType::I8 | IrType::I64 => {
                let ir_ty = IrType::of(ty);
                let dest = self.new_temp(IrType::I1);
                self.push(Inst::Icmp {
                    dest,
                    pred: IcmpPred::Ne,
                    ty: ir_ty,
                    lhs: value,
                    rhs: Operand::Const(ir_ty.zero()),
                });
                Operand::Temp(dest)
            }
            IrType::F64 => {
                let dest = self.new_temp(IrType::I1);
                self.push(Inst::Fcmp {
                    dest,
                    pred: FcmpPred::One,
                    lhs: value,
                    rhs: Operand::Const(Constant::Double(0.0)),
                });
                Operand::Temp(dest)
            }
            other => panic!("cannot branch on {:?}", other),
        }
    }

    /// Narrow a top-level return value to the i64 exit code.
    fn exit_code(&mut self, value: Operand, ty: Type) -> Operand {
        match IrType::of(ty) {
            IrType::I64 => value,
            IrType::F64 => self.cast(CastKind::FpToSi, value, IrType::F64, IrType::I64),
            IrType::I8 => self.cast(CastKind::ZExt, value, IrType::I8, IrType::I64),
            IrType::I1 => self.cast(CastKind::ZExt, value, IrType::I1, IrType::I64),
            other => panic!("cannot produce an exit code from {:?}", other),
        }
    }

    /// The int-list family stores 64-bit elements; bool elements widen
    /// on the way in.
    fn widen_list_elem(&mut self, value: Operand, elem: Type) -> Operand {
        if elem.kind == TypeKind::Bool {
            self.cast(CastKind::ZExt, value, IrType::I1, IrType::I64)
        } else {
            value
        }
    }

    /// Read one element out of a runtime list, narrowing bool elements
    /// back from their 64-bit storage.
    fn retrieve_elem(&mut self, elem: Type, handle: Operand, index: Operand) -> Operand {
        let stored = if elem.kind == TypeKind::Bool {
            Type::INT
        } else {
            elem
        };
        let value = self.call_runtime(retrieve_fn(elem.kind), vec![handle, index], stored);
        if elem.kind == TypeKind::Bool {
            self.to_bool(value, Type::INT)
        } else {
            value
        }
    }

    fn load_from(&mut self, ptr: Ptr, ty: IrType) -> Operand {
        let dest = self.new_temp(ty);
        self.push(Inst::Load { dest, ty, ptr });
        Operand::Temp(dest)
    }

    fn call_runtime(&mut self, name: &str, args: Vec<Operand>, ret: Type) -> Operand {
        let func_id = self
            .module
            .function_id(name)
            .unwrap_or_else(|| panic!("runtime function `{}` not declared", name));
        self.emit_call_inst(func_id, args, ret)
    }

    fn emit_call_inst(&mut self, func: FuncId, args: Vec<Operand>, ret: Type) -> Operand {
        let dest = if ret == Type::VOID {
            None
        } else {
            Some(self.new_temp(IrType::of(ret)))
        };
        self.push(Inst::Call { dest, func, args });
        match dest {
            Some(dest) => Operand::Temp(dest),
            // Void calls have no value; this operand is never read.
            None => Operand::Const(Constant::Int(0)),
        }
    }

    /// Record name, field index and field type for `base.field`.
    fn field_info(&self, base_ty: Type, field: &str) -> (Name, crate::ids::FieldIdx, Type) {
        let record_name = match base_ty.kind {
            TypeKind::Record(name) => name,
            _ => panic!("field access on non-record reached the emitter"),
        };
        let record_id = self
            .ctx
            .defs
            .lookup(record_name, Namespace::Type)
            .expect("record not registered");
        let field_name = self.ctx.intern(field);
        let (idx, field_id) = self
            .ctx
            .defs
            .find_field(record_id, field_name)
            .expect("missing field reached the emitter");
        let field_ty = self.ctx.defs.as_field(field_id).expect("field def").ty;
        (record_name, idx, field_ty)
    }
}

// ============================================================================
// Runtime dispatch by element kind
// ============================================================================

fn create_fn(elem: TypeKind) -> &'static str {
    match elem {
        TypeKind::Char => "str_create",
        TypeKind::Double => "double_list_create",
        _ => "int_list_create",
    }
}

fn retrieve_fn(elem: TypeKind) -> &'static str {
    match elem {
        TypeKind::Char => "str_retrieve",
        TypeKind::Double => "double_list_retrieve",
        _ => "int_list_retrieve",
    }
}

fn insert_fn(elem: TypeKind) -> &'static str {
    match elem {
        TypeKind::Char => "str_insert",
        TypeKind::Double => "double_list_insert",
        _ => "int_list_insert",
    }
}

fn append_fn(elem: TypeKind) -> &'static str {
    match elem {
        TypeKind::Char => "str_append",
        TypeKind::Double => "double_list_append",
        _ => "int_list_append",
    }
}

fn icmp_pred(op: BinOp, unsigned: bool) -> IcmpPred {
    match (op, unsigned) {
        (BinOp::Eq, _) => IcmpPred::Eq,
        (BinOp::Ne, _) => IcmpPred::Ne,
        (BinOp::Lt, false) => IcmpPred::Slt,
        (BinOp::Le, false) => IcmpPred::Sle,
        (BinOp::Gt, false) => IcmpPred::Sgt,
        (BinOp::Ge, false) => IcmpPred::Sge,
        (BinOp::Lt, true) => IcmpPred::Ult,
        (BinOp::Le, true) => IcmpPred::Ule,
        (BinOp::Gt, true) => IcmpPred::Ugt,
        (BinOp::Ge, true) => IcmpPred::Uge,
        _ => panic!("not a comparison: {}", op),
    }
}

fn fcmp_pred(op: BinOp) -> FcmpPred {
    match op {
        BinOp::Eq => FcmpPred::Oeq,
        BinOp::Ne => FcmpPred::One,
        BinOp::Lt => FcmpPred::Olt,
        BinOp::Le => FcmpPred::Ole,
        BinOp::Gt => FcmpPred::Ogt,
        BinOp::Ge => FcmpPred::Oge,
        _ => panic!("not a comparison: {}", op),
    }
}
