//! Textual rendering of an IR module (the driver's `-S` output).
//!
//! The syntax is LLVM-flavoured and stable: named record types up
//! front, then globals, external declarations, and function bodies with
//! labeled blocks. Stack slots render as allocas at the head of a
//! function's entry block.

use crate::interner::Interner;
use crate::ir::block::{Constant, Inst, IrType, Operand, Ptr, Terminator};
use crate::ir::module::{IrFunction, IrModule};

/// Render a whole module.
pub fn render(module: &IrModule, interner: &Interner) -> String {
    let mut out = String::new();

    out.push_str(&format!("; ModuleID = '{}'\n", module.name));

    if !module.layouts.is_empty() {
        out.push('\n');
        for layout in &module.layouts {
            let fields = layout
                .fields
                .iter()
                .map(|f| type_str(f.ty, interner))
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!(
                "%struct.{} = type {{ {} }}\n",
                interner.str(layout.name),
                fields
            ));
        }
    }

    if !module.globals.is_empty() {
        out.push('\n');
        for (id, global) in module.globals.iter_enumerated() {
            out.push_str(&format!(
                "@{} = global {} undef ; {}\n",
                id,
                type_str(global.ty, interner),
                global.name
            ));
        }
    }

    let mut declares = String::new();
    let mut defines = String::new();
    for func in module.functions.iter() {
        if func.is_external {
            let params = func
                .params
                .iter()
                .map(|&p| type_str(p, interner))
                .collect::<Vec<_>>()
                .join(", ");
            declares.push_str(&format!(
                "declare {} @{}({})\n",
                type_str(func.ret, interner),
                func.name,
                params
            ));
        } else {
            defines.push('\n');
            defines.push_str(&render_function(func, module, interner));
        }
    }
    if !declares.is_empty() {
        out.push('\n');
        out.push_str(&declares);
    }
    out.push_str(&defines);

    out
}

fn render_function(func: &IrFunction, module: &IrModule, interner: &Interner) -> String {
    let mut out = String::new();

    let params = func
        .params
        .iter()
        .enumerate()
        .map(|(i, &p)| format!("{} %t{}", type_str(p, interner), i))
        .collect::<Vec<_>>()
        .join(", ");
    out.push_str(&format!(
        "define {} @{}({}) {{\n",
        type_str(func.ret, interner),
        func.name,
        params
    ));

    for (i, block) in func.blocks.iter().enumerate() {
        out.push_str(&format!("{}{}:\n", block.label, block.id.0));
        if i == 0 {
            for (slot_id, slot) in func.slots.iter_enumerated() {
                out.push_str(&format!(
                    "  %{} = alloca {} ; {}\n",
                    slot_id,
                    type_str(slot.ty, interner),
                    slot.name
                ));
            }
        }
        for inst in &block.insts {
            out.push_str(&format!("  {}\n", inst_str(inst, func, module, interner)));
        }
        match &block.terminator {
            Some(term) => out.push_str(&format!("  {}\n", term_str(term, func, interner))),
            None => out.push_str("  ; <unterminated>\n"),
        }
    }

    out.push_str("}\n");
    out
}

fn type_str(ty: IrType, interner: &Interner) -> String {
    match ty {
        IrType::I1 => "i1".to_string(),
        IrType::I8 => "i8".to_string(),
        IrType::I64 => "i64".to_string(),
        IrType::F64 => "double".to_string(),
        IrType::Ptr => "ptr".to_string(),
        IrType::Void => "void".to_string(),
        IrType::Record(name) => format!("%struct.{}", interner.str(name)),
    }
}

fn const_str(constant: &Constant) -> String {
    match constant {
        Constant::Int(v) => format!("{}", v),
        Constant::UInt(v) => format!("{}", v),
        Constant::Double(v) => format!("{:?}", v),
        Constant::Bool(v) => format!("{}", *v as u8),
        Constant::Char(v) => format!("{}", v),
        Constant::NullPtr => "null".to_string(),
    }
}

fn op_str(op: &Operand) -> String {
    match op {
        Operand::Temp(t) => format!("{}", t),
        Operand::Const(c) => const_str(c),
    }
}

fn op_ty(op: &Operand, func: &IrFunction) -> IrType {
    match op {
        Operand::Temp(t) => func.temps[*t],
        Operand::Const(c) => c.ty(),
    }
}

fn ptr_str(ptr: &Ptr) -> String {
    match ptr {
        Ptr::Global(g) => format!("@{}", g),
        Ptr::Slot(s) => format!("%{}", s),
        Ptr::Temp(t) => format!("{}", t),
    }
}

fn inst_str(inst: &Inst, func: &IrFunction, module: &IrModule, interner: &Interner) -> String {
    match inst {
        Inst::Load { dest, ty, ptr } => format!(
            "{} = load {}, ptr {}",
            dest,
            type_str(*ty, interner),
            ptr_str(ptr)
        ),
        Inst::Store { ptr, ty, value } => format!(
            "store {} {}, ptr {}",
            type_str(*ty, interner),
            op_str(value),
            ptr_str(ptr)
        ),
        Inst::Bin {
            dest,
            op,
            ty,
            lhs,
            rhs,
        } => format!(
            "{} = {} {} {}, {}",
            dest,
            op.mnemonic(),
            type_str(*ty, interner),
            op_str(lhs),
            op_str(rhs)
        ),
        Inst::Icmp {
            dest,
            pred,
            ty,
            lhs,
            rhs,
        } => format!(
            "{} = icmp {} {} {}, {}",
            dest,
            pred.mnemonic(),
            type_str(*ty, interner),
            op_str(lhs),
            op_str(rhs)
        ),
        Inst::Fcmp {
            dest,
            pred,
            lhs,
            rhs,
        } => format!(
            "{} = fcmp {} double {}, {}",
            dest,
            pred.mnemonic(),
            op_str(lhs),
            op_str(rhs)
        ),
        Inst::Call { dest, func: id, args } => {
            let callee = &module.functions[*id];
            let args = args
                .iter()
                .map(|a| format!("{} {}", type_str(op_ty(a, func), interner), op_str(a)))
                .collect::<Vec<_>>()
                .join(", ");
            match dest {
                Some(dest) => format!(
                    "{} = call {} @{}({})",
                    dest,
                    type_str(callee.ret, interner),
                    callee.name,
                    args
                ),
                None => format!("call void @{}({})", callee.name, args),
            }
        }
        Inst::Cast {
            dest,
            kind,
            value,
            from,
            to,
        } => format!(
            "{} = {} {} {} to {}",
            dest,
            kind.mnemonic(),
            type_str(*from, interner),
            op_str(value),
            type_str(*to, interner)
        ),
        Inst::FieldAddr {
            dest,
            base,
            record,
            field,
        } => format!(
            "{} = getelementptr %struct.{}, ptr {}, i32 0, i32 {}",
            dest,
            interner.str(*record),
            ptr_str(base),
            field.0
        ),
    }
}

fn term_str(term: &Terminator, func: &IrFunction, interner: &Interner) -> String {
    match term {
        Terminator::Br(target) => {
            let target = &func.blocks[*target];
            format!("br label %{}{}", target.label, target.id.0)
        }
        Terminator::CondBr {
            cond,
            then_bb,
            else_bb,
        } => {
            let then_block = &func.blocks[*then_bb];
            let else_block = &func.blocks[*else_bb];
            format!(
                "br i1 {}, label %{}{}, label %{}{}",
                op_str(cond),
                then_block.label,
                then_block.id.0,
                else_block.label,
                else_block.id.0
            )
        }
        Terminator::Ret(Some(value)) => format!(
            "ret {} {}",
            type_str(op_ty(value, func), interner),
            op_str(value)
        ),
        Terminator::Ret(None) => "ret void".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::block::{BinInst, Constant};
    use crate::ir::module::IrModule;

    #[test]
    fn test_render_small_module() {
        let interner = Interner::new();
        let mut module = IrModule::new("prog");

        module.declare_function("int_println", vec![IrType::I64], IrType::Void, true);
        let main = module.declare_function(
            "main",
            vec![IrType::I64, IrType::Ptr],
            IrType::I64,
            false,
        );

        let func = &mut module.functions[main];
        let slot = func.new_slot("a", IrType::I64);
        func.push_inst(
            IrFunction::ENTRY,
            Inst::Store {
                ptr: Ptr::Slot(slot),
                ty: IrType::I64,
                value: Operand::Const(Constant::Int(3)),
            },
        );
        let loaded = func.new_temp(IrType::I64);
        func.push_inst(
            IrFunction::ENTRY,
            Inst::Load {
                dest: loaded,
                ty: IrType::I64,
                ptr: Ptr::Slot(slot),
            },
        );
        let sum = func.new_temp(IrType::I64);
        func.push_inst(
            IrFunction::ENTRY,
            Inst::Bin {
                dest: sum,
                op: BinInst::Add,
                ty: IrType::I64,
                lhs: Operand::Temp(loaded),
                rhs: Operand::Const(Constant::Int(4)),
            },
        );
        func.terminate(IrFunction::ENTRY, Terminator::Ret(Some(Operand::Temp(sum))));

        let text = render(&module, &interner);
        assert!(text.contains("; ModuleID = 'prog'"));
        assert!(text.contains("declare void @int_println(i64)"));
        assert!(text.contains("define i64 @main(i64 %t0, ptr %t1)"));
        assert!(text.contains("%slot0 = alloca i64 ; a"));
        assert!(text.contains("store i64 3, ptr %slot0"));
        assert!(text.contains("%t2 = load i64, ptr %slot0"));
        assert!(text.contains("%t3 = add i64 %t2, 4"));
        assert!(text.contains("ret i64 %t3"));
    }
}
