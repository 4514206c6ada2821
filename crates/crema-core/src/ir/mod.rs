//! The intermediate representation and its emitter.
//!
//! `block` defines instructions and basic blocks, `module` the
//! function/global containers, `layout` record layouts, `lower` the
//! AST-to-IR emitter, and `print` the textual rendering consumed by
//! the external native code generator.

pub mod block;
pub mod layout;
pub mod lower;
pub mod module;
pub mod print;

pub use block::{
    BinInst, CastKind, Constant, FcmpPred, IcmpPred, Inst, IrBlock, IrType, Operand, Ptr,
    Terminator,
};
pub use layout::{FieldLayout, LayoutContext, RecordLayout};
pub use lower::lower;
pub use module::{IrFunction, IrGlobal, IrModule, IrSlot};
pub use print::render;
