//! Central compiler context.
//!
//! All passes thread a `CompilerContext` explicitly; there is no
//! process-wide mutable state.

use std::sync::Arc;

use crate::definitions::{Definitions, Namespace};
use crate::diagnostic::Diagnostics;
use crate::ids::DefId;
use crate::interner::{Interner, Name};
use crate::source::SourceMap;
use crate::types::Type;

/// Stores global compiler state for one compilation unit.
pub struct CompilerContext {
    /// String interner (shared, thread-safe).
    pub interner: Arc<Interner>,
    /// All global definitions (functions, records, their members).
    pub defs: Definitions,
    /// Source file management.
    pub source_map: SourceMap,
    /// Accumulated diagnostics.
    pub diagnostics: Diagnostics,
}

impl Default for CompilerContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CompilerContext {
    /// Create a new compiler context.
    pub fn new() -> Self {
        Self {
            interner: Arc::new(Interner::new()),
            defs: Definitions::new(),
            source_map: SourceMap::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Create with a shared interner.
    pub fn with_interner(interner: Arc<Interner>) -> Self {
        Self {
            interner,
            defs: Definitions::new(),
            source_map: SourceMap::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    // ========================================================================
    // String interning
    // ========================================================================

    /// Intern a string.
    pub fn intern(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    /// Get the string for an interned name.
    pub fn str(&self, name: Name) -> String {
        self.interner.str(name).to_string()
    }

    /// Human-readable form of a type (resolves record names).
    pub fn type_str(&self, ty: Type) -> String {
        ty.display(&self.interner)
    }

    // ========================================================================
    // Definition access
    // ========================================================================

    /// Look up a function by name.
    pub fn lookup_function(&self, name: &str) -> Option<DefId> {
        let n = self.interner.intern(name);
        self.defs.lookup(n, Namespace::Value)
    }

    /// Look up a record by name.
    pub fn lookup_record(&self, name: &str) -> Option<DefId> {
        let n = self.interner.intern(name);
        self.defs.lookup(n, Namespace::Type)
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Check if there are any errors.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    /// Get the error count.
    pub fn error_count(&self) -> usize {
        self.diagnostics.error_count()
    }

    /// Render all diagnostics.
    pub fn render_diagnostics(&self) -> String {
        self.diagnostics.render(&self.source_map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_basic() {
        let ctx = CompilerContext::new();

        let name = ctx.intern("foreach");
        assert_eq!(ctx.str(name), "foreach");
    }

    #[test]
    fn test_context_shared_interner() {
        let interner = Arc::new(Interner::new());
        let name1 = interner.intern("shared");

        let ctx = CompilerContext::with_interner(interner.clone());
        let name2 = ctx.intern("shared");

        assert_eq!(name1, name2);
    }

    #[test]
    fn test_type_str() {
        let ctx = CompilerContext::new();
        assert_eq!(ctx.type_str(Type::INT), "int");
        assert_eq!(ctx.type_str(Type::STRING), "str");

        let pt = ctx.intern("Pt");
        assert_eq!(ctx.type_str(Type::record(pt)), "Pt");
    }
}
