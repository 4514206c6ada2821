//! The Crema type lattice.
//!
//! Types are flat values: a scalar kind plus a list flag. Two types are
//! equal iff kind and list flag agree (and the record name, when the kind
//! is a record). The promotion order is a partial order used both for
//! assignability checks in the analyzer and to derive the emitter's
//! coercion table.

use crate::interner::{Interner, Name};
use serde::Serialize;
use std::fmt;

/// The scalar kind of a Crema type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TypeKind {
    Int,
    UInt,
    Double,
    Char,
    Bool,
    Void,
    Record(Name),
    Invalid,
}

/// A Crema type: a kind plus a list flag.
///
/// A *string* is `Type { kind: Char, is_list: true }`; the surface syntax
/// `str` names it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Type {
    pub kind: TypeKind,
    pub is_list: bool,
}

impl Type {
    pub const INT: Type = Type::scalar(TypeKind::Int);
    pub const UINT: Type = Type::scalar(TypeKind::UInt);
    pub const DOUBLE: Type = Type::scalar(TypeKind::Double);
    pub const CHAR: Type = Type::scalar(TypeKind::Char);
    pub const BOOL: Type = Type::scalar(TypeKind::Bool);
    pub const VOID: Type = Type::scalar(TypeKind::Void);
    pub const INVALID: Type = Type::scalar(TypeKind::Invalid);
    /// `str` is a list of chars.
    pub const STRING: Type = Type::list_of(TypeKind::Char);

    pub const fn scalar(kind: TypeKind) -> Self {
        Self {
            kind,
            is_list: false,
        }
    }

    pub const fn list_of(kind: TypeKind) -> Self {
        Self {
            kind,
            is_list: true,
        }
    }

    pub fn record(name: Name) -> Self {
        Self::scalar(TypeKind::Record(name))
    }

    /// The scalar element type of a list.
    pub fn element(self) -> Type {
        debug_assert!(self.is_list);
        Type::scalar(self.kind)
    }

    pub fn is_record(self) -> bool {
        matches!(self.kind, TypeKind::Record(_)) && !self.is_list
    }

    pub fn is_string(self) -> bool {
        self.kind == TypeKind::Char && self.is_list
    }

    pub fn is_invalid(self) -> bool {
        self.kind == TypeKind::Invalid
    }

    pub fn is_numeric(self) -> bool {
        !self.is_list
            && matches!(
                self.kind,
                TypeKind::Int | TypeKind::UInt | TypeKind::Double | TypeKind::Char
            )
    }

    /// Integral or boolean scalar: valid operand for bitwise and logical ops.
    pub fn is_integral(self) -> bool {
        !self.is_list
            && matches!(
                self.kind,
                TypeKind::Int | TypeKind::UInt | TypeKind::Char | TypeKind::Bool
            )
    }

    /// Scalars an `if` condition may have: anything comparable against zero.
    pub fn is_condition(self) -> bool {
        !self.is_list
            && matches!(
                self.kind,
                TypeKind::Bool | TypeKind::Int | TypeKind::UInt | TypeKind::Double
            )
    }

    /// Strict promotion: `self < other`.
    ///
    /// Defined only between types with the same list flag; in practice all
    /// promotion pairs are scalar. The inherited numeric-to-string pairs
    /// are deliberately absent (see DESIGN.md): the emitter has no
    /// corresponding coercion, so the analyzer rejects them instead.
    pub fn promotes_to(self, other: Type) -> bool {
        if self.is_list || other.is_list {
            return false;
        }
        use TypeKind::*;
        matches!(
            (self.kind, other.kind),
            (Int, Double) | (UInt, Double) | (Char, Int) | (Bool, Int) | (Bool, UInt) | (Bool, Double)
        )
    }

    /// Non-strict promotion: `self ≤ other`.
    pub fn le(self, other: Type) -> bool {
        self == other || self.promotes_to(other)
    }

    /// The larger of two comparable types, or `Invalid` if incomparable.
    pub fn larger(a: Type, b: Type) -> Type {
        if b.le(a) {
            a
        } else if a.le(b) {
            b
        } else {
            Type::INVALID
        }
    }

    /// Fixed size in bytes per kind. Lists and records are reference-sized
    /// (handles to runtime- or layout-managed storage).
    pub fn size(self) -> usize {
        if self.is_list {
            return 8;
        }
        match self.kind {
            TypeKind::Int | TypeKind::UInt | TypeKind::Double => 8,
            TypeKind::Char | TypeKind::Bool => 1,
            TypeKind::Void | TypeKind::Invalid => 0,
            TypeKind::Record(_) => 8,
        }
    }

    /// Human-readable form, resolving record names through the interner.
    pub fn display(self, interner: &Interner) -> String {
        let base = match self.kind {
            TypeKind::Int => "int".to_string(),
            TypeKind::UInt => "uint".to_string(),
            TypeKind::Double => "double".to_string(),
            TypeKind::Char => "char".to_string(),
            TypeKind::Bool => "bool".to_string(),
            TypeKind::Void => "void".to_string(),
            TypeKind::Record(name) => interner.str(name).to_string(),
            TypeKind::Invalid => "<invalid>".to_string(),
        };
        if self.is_string() {
            "str".to_string()
        } else if self.is_list {
            format!("{}[]", base)
        } else {
            base
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = match self.kind {
            TypeKind::Int => "int",
            TypeKind::UInt => "uint",
            TypeKind::Double => "double",
            TypeKind::Char => "char",
            TypeKind::Bool => "bool",
            TypeKind::Void => "void",
            TypeKind::Record(name) => return write!(f, "struct#{}{}", name.0, if self.is_list { "[]" } else { "" }),
            TypeKind::Invalid => "<invalid>",
        };
        if self.is_string() {
            write!(f, "str")
        } else if self.is_list {
            write!(f, "{}[]", base)
        } else {
            write!(f, "{}", base)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interner::Name;

    const ALL_SCALARS: [Type; 6] = [
        Type::INT,
        Type::UINT,
        Type::DOUBLE,
        Type::CHAR,
        Type::BOOL,
        Type::VOID,
    ];

    #[test]
    fn test_promotion_pairs() {
        assert!(Type::INT.promotes_to(Type::DOUBLE));
        assert!(Type::UINT.promotes_to(Type::DOUBLE));
        assert!(Type::CHAR.promotes_to(Type::INT));
        assert!(Type::BOOL.promotes_to(Type::INT));
        assert!(Type::BOOL.promotes_to(Type::UINT));
        assert!(Type::BOOL.promotes_to(Type::DOUBLE));
    }

    #[test]
    fn test_incomparable_pairs() {
        assert!(!Type::CHAR.promotes_to(Type::DOUBLE));
        assert!(!Type::DOUBLE.promotes_to(Type::INT));
        assert!(!Type::INT.promotes_to(Type::UINT));
        assert!(!Type::UINT.promotes_to(Type::INT));
        assert!(!Type::CHAR.promotes_to(Type::UINT));
        // The inherited numeric-to-string ordering is rejected, not modeled.
        assert!(!Type::INT.promotes_to(Type::STRING));
        assert!(!Type::DOUBLE.promotes_to(Type::STRING));
    }

    #[test]
    fn test_lists_never_promote() {
        let ints = Type::list_of(TypeKind::Int);
        let doubles = Type::list_of(TypeKind::Double);
        assert!(!ints.promotes_to(doubles));
        assert!(!Type::INT.promotes_to(ints));
        assert!(!ints.promotes_to(Type::INT));
        assert!(ints.le(ints));
    }

    #[test]
    fn test_antisymmetry() {
        for &s in &ALL_SCALARS {
            for &t in &ALL_SCALARS {
                if s.le(t) && t.le(s) {
                    assert_eq!(s, t, "antisymmetry violated for {} and {}", s, t);
                }
            }
        }
    }

    #[test]
    fn test_larger() {
        assert_eq!(Type::larger(Type::INT, Type::DOUBLE), Type::DOUBLE);
        assert_eq!(Type::larger(Type::DOUBLE, Type::INT), Type::DOUBLE);
        assert_eq!(Type::larger(Type::INT, Type::INT), Type::INT);
        assert_eq!(Type::larger(Type::BOOL, Type::UINT), Type::UINT);
        assert_eq!(Type::larger(Type::CHAR, Type::DOUBLE), Type::INVALID);
        assert_eq!(Type::larger(Type::INT, Type::UINT), Type::INVALID);
    }

    #[test]
    fn test_sizes() {
        assert_eq!(Type::INT.size(), 8);
        assert_eq!(Type::DOUBLE.size(), 8);
        assert_eq!(Type::CHAR.size(), 1);
        assert_eq!(Type::BOOL.size(), 1);
        assert_eq!(Type::VOID.size(), 0);
        assert_eq!(Type::STRING.size(), 8);
        assert_eq!(Type::list_of(TypeKind::Double).size(), 8);
    }

    #[test]
    fn test_string_is_char_list() {
        assert!(Type::STRING.is_string());
        assert!(Type::STRING.is_list);
        assert_eq!(Type::STRING.element(), Type::CHAR);
        assert_eq!(Type::STRING.to_string(), "str");
    }

    #[test]
    fn test_record_equality_by_name() {
        let pt = Name(0);
        let other = Name(1);
        assert_eq!(Type::record(pt), Type::record(pt));
        assert_ne!(Type::record(pt), Type::record(other));
        assert!(Type::record(pt).le(Type::record(pt)));
        assert!(!Type::record(pt).le(Type::record(other)));
    }
}
