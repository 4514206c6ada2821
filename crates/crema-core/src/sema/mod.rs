//! Semantic analysis: scope resolution, type checking, the recursion
//! check, and expression type annotation.

pub mod analyzer;
pub mod recursion;
pub mod scope;

pub use analyzer::analyze;
pub use scope::{ScopeStack, VarBinding};
