//! Scope stack for the semantic analyzer.
//!
//! A frame maps names to variable bindings and carries the expected
//! return type of the innermost enclosing function (used by `return`
//! statements). Lookup walks inward-to-outward. For every push there is
//! exactly one pop; the analyzer asserts the stack is back at the root
//! when it finishes.

use crate::interner::Name;
use crate::source::Span;
use crate::types::Type;
use std::collections::HashMap;

/// A variable binding created by a declaration.
#[derive(Debug, Clone)]
pub struct VarBinding {
    pub name: Name,
    pub ty: Type,
    pub span: Span,
}

/// One lexical scope frame.
#[derive(Debug)]
struct Frame {
    bindings: HashMap<Name, VarBinding>,
    /// Declared return type of the innermost enclosing function; `None`
    /// in the synthetic entry function, where a `return` sets the
    /// program exit code instead.
    expected_return: Option<Type>,
}

/// The analyzer's scope stack.
#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<Frame>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    /// Push a scope with a new expected return type: `None` for the
    /// root scope, `Some` for function bodies.
    pub fn push(&mut self, expected_return: Option<Type>) {
        self.frames.push(Frame {
            bindings: HashMap::new(),
            expected_return,
        });
    }

    /// Push a scope inheriting the enclosing expected return type
    /// (blocks, loop bodies).
    pub fn push_inherit(&mut self) {
        let ret = self.expected_return();
        self.push(ret);
    }

    pub fn pop(&mut self) {
        let popped = self.frames.pop();
        debug_assert!(popped.is_some(), "scope stack underflow");
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// The declared return type of the innermost enclosing function, or
    /// `None` at the top level.
    pub fn expected_return(&self) -> Option<Type> {
        self.frames.last().and_then(|f| f.expected_return)
    }

    /// Declare a variable in the current scope. Returns `false` on a
    /// duplicate within the same frame (shadowing an outer frame is
    /// allowed).
    pub fn declare(&mut self, binding: VarBinding) -> bool {
        let frame = self.frames.last_mut().expect("no open scope");
        if frame.bindings.contains_key(&binding.name) {
            return false;
        }
        frame.bindings.insert(binding.name, binding);
        true
    }

    /// Look up a binding, walking inward-to-outward.
    pub fn lookup(&self, name: Name) -> Option<&VarBinding> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.bindings.get(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interner::Interner;
    use crate::source::{SourceId, Span};

    fn binding(name: Name, ty: Type) -> VarBinding {
        VarBinding {
            name,
            ty,
            span: Span::new(SourceId(0), 0, 0),
        }
    }

    #[test]
    fn test_declare_and_lookup() {
        let interner = Interner::new();
        let mut scopes = ScopeStack::new();
        scopes.push(None);

        let a = interner.intern("a");
        assert!(scopes.declare(binding(a, Type::INT)));
        assert_eq!(scopes.lookup(a).unwrap().ty, Type::INT);

        // Duplicate in the same frame is refused.
        assert!(!scopes.declare(binding(a, Type::DOUBLE)));

        scopes.pop();
        assert_eq!(scopes.depth(), 0);
    }

    #[test]
    fn test_shadowing_and_teardown() {
        let interner = Interner::new();
        let mut scopes = ScopeStack::new();
        scopes.push(None);

        let x = interner.intern("x");
        assert!(scopes.declare(binding(x, Type::INT)));

        scopes.push_inherit();
        assert!(scopes.declare(binding(x, Type::DOUBLE)));
        assert_eq!(scopes.lookup(x).unwrap().ty, Type::DOUBLE);

        scopes.pop();
        assert_eq!(scopes.lookup(x).unwrap().ty, Type::INT);

        scopes.pop();
        assert!(scopes.lookup(x).is_none());
    }

    #[test]
    fn test_expected_return_inheritance() {
        let mut scopes = ScopeStack::new();
        scopes.push(None);
        assert_eq!(scopes.expected_return(), None);

        scopes.push(Some(Type::INT));
        scopes.push_inherit();
        assert_eq!(scopes.expected_return(), Some(Type::INT));

        scopes.pop();
        scopes.pop();
        assert_eq!(scopes.expected_return(), None);
    }
}
