//! Crema compiler core.
//!
//! Crema is a small, deliberately sub-Turing-complete imperative
//! language: scalars, homogeneous lists, records with named fields,
//! non-recursive top-level functions, structured control flow and
//! block-scoped variables. This crate implements the middle pipeline:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      CompilerContext                        │
//! │  ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌──────────┐  │
//! │  │ Interner  │  │   Defs    │  │ SourceMap │  │  Diags   │  │
//! │  │ (strings) │  │(DefId→Def)│  │  (files)  │  │  (sink)  │  │
//! │  └───────────┘  └───────────┘  └───────────┘  └──────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//!         ↑               ↑               ↑
//!    ┌────┴────┐     ┌────┴────┐     ┌────┴────┐
//!    │  Parse  │  →  │ Analyze │  →  │  Lower  │  →  native codegen
//!    │  (AST)  │     │ (types) │     │  (IR)   │     (external)
//!    └─────────┘     └─────────┘     └─────────┘
//! ```
//!
//! The analyzer annotates expression types in place and enforces the
//! language's whole-program no-recursion rule; the emitter lowers the
//! annotated tree to a load/store IR linked against a small C runtime
//! for dynamic lists and strings.

// Core modules
pub mod compiler;
pub mod context;
pub mod definitions;
pub mod diagnostic;
pub mod ids;
pub mod index_vec;
pub mod interner;
pub mod source;
pub mod stdlib;
pub mod types;

// Pipeline modules
pub mod ir;
pub mod sema;
pub mod syntax;

// Re-exports
pub use compiler::{CompileError, CompileResult, Compiler};
pub use context::CompilerContext;
pub use definitions::{DefKind, Definitions, Namespace};
pub use diagnostic::{Diagnostic, Diagnostics, Severity};
pub use ids::{BlockId, DefId, FieldIdx, FuncId, GlobalId, SlotId, TempId};
pub use index_vec::{Idx, IndexVec};
pub use interner::{Interner, Name};
pub use ir::IrModule;
pub use sema::analyze;
pub use source::{Source, SourceId, SourceMap, Span};
pub use syntax::{parse, ParseError};
pub use types::{Type, TypeKind};
