//! IR module, function and global containers.

use std::collections::HashMap;

use crate::ids::{BlockId, FuncId, GlobalId, SlotId, TempId};
use crate::index_vec::IndexVec;
use crate::interner::Name;
use crate::ir::block::{Inst, IrBlock, IrType, Operand, Terminator};
use crate::ir::layout::RecordLayout;

/// A stack slot within a function. Slots are rendered as allocas in the
/// function's entry block.
#[derive(Debug, Clone)]
pub struct IrSlot {
    /// Source name the slot backs (or a synthesized name for loop
    /// induction variables).
    pub name: String,
    pub ty: IrType,
}

/// A module-level global backing a top-level variable. Globals start
/// undefined; top-level initializers run in the entry function.
#[derive(Debug, Clone)]
pub struct IrGlobal {
    pub name: String,
    pub ty: IrType,
}

/// An IR function: external declaration or definition with blocks.
#[derive(Debug, Clone)]
pub struct IrFunction {
    pub id: FuncId,
    pub name: String,
    pub params: Vec<IrType>,
    pub ret: IrType,
    pub is_external: bool,
    pub slots: IndexVec<SlotId, IrSlot>,
    /// Types of all temporaries. The first `params.len()` temps are the
    /// incoming parameters.
    pub temps: IndexVec<TempId, IrType>,
    pub blocks: IndexVec<BlockId, IrBlock>,
}

impl IrFunction {
    pub const ENTRY: BlockId = BlockId(0);

    fn new(id: FuncId, name: String, params: Vec<IrType>, ret: IrType, is_external: bool) -> Self {
        let mut temps = IndexVec::new();
        for &p in &params {
            temps.push(p);
        }
        let mut blocks = IndexVec::new();
        if !is_external {
            blocks.push(IrBlock::new(Self::ENTRY, "entry"));
        }
        Self {
            id,
            name,
            params,
            ret,
            is_external,
            slots: IndexVec::new(),
            temps,
            blocks,
        }
    }

    /// The operand referring to parameter `i`.
    pub fn param(&self, i: usize) -> Operand {
        debug_assert!(i < self.params.len());
        Operand::Temp(TempId::new(i as u32))
    }

    pub fn new_temp(&mut self, ty: IrType) -> TempId {
        self.temps.push(ty)
    }

    pub fn new_slot(&mut self, name: impl Into<String>, ty: IrType) -> SlotId {
        self.slots.push(IrSlot {
            name: name.into(),
            ty,
        })
    }

    pub fn new_block(&mut self, label: &'static str) -> BlockId {
        let id = self.blocks.next_idx();
        self.blocks.push(IrBlock::new(id, label))
    }

    pub fn push_inst(&mut self, block: BlockId, inst: Inst) {
        debug_assert!(
            !self.blocks[block].is_terminated(),
            "instruction after terminator in {}",
            block
        );
        self.blocks[block].insts.push(inst);
    }

    pub fn terminate(&mut self, block: BlockId, terminator: Terminator) {
        let block = &mut self.blocks[block];
        debug_assert!(!block.is_terminated(), "second terminator in {}", block.id);
        block.terminator = Some(terminator);
    }
}

/// A complete IR module: functions, globals and record layouts, plus
/// the output name recorded for the driver.
#[derive(Debug, Clone, Default)]
pub struct IrModule {
    pub name: String,
    pub functions: IndexVec<FuncId, IrFunction>,
    pub globals: IndexVec<GlobalId, IrGlobal>,
    /// Record layouts in declaration order.
    pub layouts: Vec<RecordLayout>,
    layout_index: HashMap<Name, usize>,
    func_by_name: HashMap<String, FuncId>,
}

impl IrModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Declare a function. Externals carry no blocks.
    pub fn declare_function(
        &mut self,
        name: impl Into<String>,
        params: Vec<IrType>,
        ret: IrType,
        is_external: bool,
    ) -> FuncId {
        let name = name.into();
        let id = self.functions.next_idx();
        self.functions
            .push(IrFunction::new(id, name.clone(), params, ret, is_external));
        self.func_by_name.insert(name, id);
        id
    }

    /// Look up a declared function by name. Missing runtime functions
    /// are a compiler bug, so callers `expect` on this.
    pub fn function_id(&self, name: &str) -> Option<FuncId> {
        self.func_by_name.get(name).copied()
    }

    pub fn add_global(&mut self, name: impl Into<String>, ty: IrType) -> GlobalId {
        self.globals.push(IrGlobal {
            name: name.into(),
            ty,
        })
    }

    pub fn add_layout(&mut self, layout: RecordLayout) {
        self.layout_index.insert(layout.name, self.layouts.len());
        self.layouts.push(layout);
    }

    pub fn layout(&self, record: Name) -> Option<&RecordLayout> {
        self.layout_index.get(&record).map(|&i| &self.layouts[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::block::{Constant, Terminator};

    #[test]
    fn test_function_declaration() {
        let mut module = IrModule::new("test");
        let id = module.declare_function("list_length", vec![IrType::Ptr], IrType::I64, true);
        assert_eq!(module.function_id("list_length"), Some(id));
        assert!(module.functions[id].is_external);
        assert!(module.functions[id].blocks.is_empty());
    }

    #[test]
    fn test_function_body_building() {
        let mut module = IrModule::new("test");
        let id = module.declare_function("main", vec![IrType::I64, IrType::Ptr], IrType::I64, false);

        let func = &mut module.functions[id];
        assert_eq!(func.blocks.len(), 1);
        assert_eq!(func.temps.len(), 2); // params are temps

        let t = func.new_temp(IrType::I64);
        assert_eq!(t.index(), 2);

        func.terminate(
            IrFunction::ENTRY,
            Terminator::Ret(Some(Operand::Const(Constant::Int(0)))),
        );
        assert!(func.blocks[IrFunction::ENTRY].is_terminated());
    }
}
