//! Identifier interning.
//!
//! Crema compares identifiers by value, never by object identity: a
//! variable use, the declaration it resolves to, and a record name
//! carried inside a [`Type`](crate::types::Type) all denote the same
//! name. Interning turns that value comparison into an integer compare
//! on a [`Name`] handle, and keeps `Type` a `Copy` value even when its
//! kind is a named record.
//!
//! The parser hands the analyzer plain `String` identifiers; the
//! analyzer interns them on first contact and every table from there on
//! (scopes, definitions, call graph, record layouts) is keyed on
//! `Name`.

use serde::Serialize;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use parking_lot::Mutex;

/// An interned identifier.
///
/// Two `Name`s are equal iff the identifiers they were interned from
/// are textually equal. The original spelling is recovered through
/// [`Interner::str`] (diagnostics and IR rendering need it).
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash, Serialize)]
pub struct Name(pub usize);

/// A shared, immutable spelling of an interned identifier.
///
/// Handed out by [`Interner::str`]; cloning is a refcount bump, so
/// diagnostics can keep spellings without copying the text.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ArcStr(Arc<String>);

impl ArcStr {
    fn new(value: String) -> ArcStr {
        ArcStr(Arc::new(value))
    }
}

impl fmt::Display for ArcStr {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{}", &*self.0)
    }
}

impl fmt::Debug for ArcStr {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{}", &*self.0)
    }
}

impl Borrow<str> for ArcStr {
    fn borrow(&self) -> &str {
        &self.0[..]
    }
}

impl Deref for ArcStr {
    type Target = String;

    fn deref(&self) -> &String {
        &self.0
    }
}

/// The interner's table: spellings in interning order, plus the
/// reverse index. `Name(i)` is the position of its spelling in
/// `spellings`.
#[derive(Debug)]
struct InternerState {
    names: HashMap<ArcStr, Name>,
    spellings: Vec<ArcStr>,
}

/// A thread-safe identifier interner.
///
/// Shared (behind an `Arc`) by the whole compilation unit via
/// [`CompilerContext`](crate::context::CompilerContext); the mutex makes
/// interning safe from helper threads even though the passes themselves
/// are sequential.
#[derive(Debug)]
pub struct Interner {
    state: Mutex<InternerState>,
}

impl Interner {
    /// Create a new empty interner.
    pub fn new() -> Interner {
        Interner {
            state: Mutex::new(InternerState {
                names: HashMap::new(),
                spellings: Vec::new(),
            }),
        }
    }

    /// Intern an identifier, returning its [`Name`].
    ///
    /// Interning the same spelling again returns the same handle.
    pub fn intern(&self, ident: &str) -> Name {
        let mut state = self.state.lock();

        match state.names.get(ident) {
            Some(&name) => name,
            None => {
                let name = Name(state.spellings.len());
                let spelling = ArcStr::new(String::from(ident));
                state.spellings.push(spelling.clone());
                state.names.insert(spelling, name);
                name
            }
        }
    }

    /// The spelling of a previously interned [`Name`].
    pub fn str(&self, name: Name) -> ArcStr {
        let state = self.state.lock();
        state.spellings[name.0].clone()
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}
