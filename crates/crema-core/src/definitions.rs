//! Central storage for all global definitions in a compilation unit.
//!
//! Functions and records live in disjoint namespaces; both are global
//! (Crema has no nested functions and no local records). Variables live
//! on the analyzer's scope stack instead, but share a reservation check
//! with function names.

use crate::ids::{DefId, FieldIdx};
use crate::index_vec::IndexVec;
use crate::interner::Name;
use crate::source::Span;
use crate::types::Type;
use std::collections::HashMap;

/// All definitions in the compilation unit.
pub struct Definitions {
    /// All definition items.
    items: IndexVec<DefId, DefItem>,
    /// Name to DefId lookup (by namespace).
    names: HashMap<(Name, Namespace), DefId>,
}

/// Metadata for a definition.
#[derive(Debug, Clone)]
pub struct DefItem {
    /// The interned name.
    pub name: Name,
    /// What kind of definition this is.
    pub kind: DefKind,
    /// Source location (a default span for runtime-provided functions).
    pub span: Span,
}

/// The kind of a definition.
#[derive(Debug, Clone)]
pub enum DefKind {
    /// A top-level function.
    Function(FunctionDef),
    /// A record type.
    Record(RecordDef),
    /// A field of a record.
    Field(FieldDef),
    /// A parameter of a function.
    Parameter(ParameterDef),
}

/// Namespace for name resolution.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Namespace {
    /// Values (functions).
    Value,
    /// Types (records).
    Type,
}

/// Function definition.
///
/// `is_external` marks runtime-provided declarations (no body in the
/// source program); they resolve like any other call.
#[derive(Clone, Debug)]
pub struct FunctionDef {
    pub def_id: DefId,
    pub name: Name,
    /// Parameter DefIds (in order).
    pub params: Vec<DefId>,
    /// Return type.
    pub ret: Type,
    /// Whether the body is provided by the runtime library.
    pub is_external: bool,
}

/// Record definition.
#[derive(Clone, Debug)]
pub struct RecordDef {
    pub def_id: DefId,
    pub name: Name,
    /// Field DefIds (in order, index = FieldIdx). The order defines the
    /// IR layout.
    pub fields: Vec<DefId>,
}

/// Field definition (for records).
#[derive(Clone, Debug)]
pub struct FieldDef {
    /// DefId of the owning record.
    pub owner: DefId,
    pub name: Name,
    pub ty: Type,
    /// Index within the owner.
    pub idx: FieldIdx,
}

/// Parameter definition.
#[derive(Clone, Debug)]
pub struct ParameterDef {
    /// DefId of the owning function.
    pub owner: DefId,
    pub name: Name,
    pub ty: Type,
    /// Index within the function's parameters.
    pub idx: u32,
}

impl Default for Definitions {
    fn default() -> Self {
        Self::new()
    }
}

impl Definitions {
    pub fn new() -> Self {
        Self {
            items: IndexVec::new(),
            names: HashMap::new(),
        }
    }

    /// Allocate a new definition.
    pub fn alloc(&mut self, name: Name, kind: DefKind, span: Span) -> DefId {
        self.items.push(DefItem { name, kind, span })
    }

    /// Register a name in a namespace. Returns `false` if the name is
    /// already taken in that namespace.
    pub fn register_name(&mut self, name: Name, ns: Namespace, def_id: DefId) -> bool {
        if self.names.contains_key(&(name, ns)) {
            return false;
        }
        self.names.insert((name, ns), def_id);
        true
    }

    /// Look up a definition by name and namespace.
    pub fn lookup(&self, name: Name, ns: Namespace) -> Option<DefId> {
        self.names.get(&(name, ns)).copied()
    }

    /// Get a definition by ID.
    pub fn get(&self, def_id: DefId) -> &DefItem {
        &self.items[def_id]
    }

    /// Get the kind of a definition.
    pub fn kind(&self, def_id: DefId) -> &DefKind {
        &self.items[def_id].kind
    }

    /// Get the name of a definition.
    pub fn name(&self, def_id: DefId) -> Name {
        self.items[def_id].name
    }

    /// Get the span of a definition.
    pub fn span(&self, def_id: DefId) -> Span {
        self.items[def_id].span
    }

    /// Get as a function.
    pub fn as_function(&self, def_id: DefId) -> Option<&FunctionDef> {
        match &self.items[def_id].kind {
            DefKind::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Get as a mutable function.
    pub fn as_function_mut(&mut self, def_id: DefId) -> Option<&mut FunctionDef> {
        match &mut self.items[def_id].kind {
            DefKind::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Get as a record.
    pub fn as_record(&self, def_id: DefId) -> Option<&RecordDef> {
        match &self.items[def_id].kind {
            DefKind::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Get as a mutable record.
    pub fn as_record_mut(&mut self, def_id: DefId) -> Option<&mut RecordDef> {
        match &mut self.items[def_id].kind {
            DefKind::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Get as a field.
    pub fn as_field(&self, def_id: DefId) -> Option<&FieldDef> {
        match &self.items[def_id].kind {
            DefKind::Field(f) => Some(f),
            _ => None,
        }
    }

    /// Get as a parameter.
    pub fn as_parameter(&self, def_id: DefId) -> Option<&ParameterDef> {
        match &self.items[def_id].kind {
            DefKind::Parameter(p) => Some(p),
            _ => None,
        }
    }

    /// Get as a mutable parameter.
    pub fn as_parameter_mut(&mut self, def_id: DefId) -> Option<&mut ParameterDef> {
        match &mut self.items[def_id].kind {
            DefKind::Parameter(p) => Some(p),
            _ => None,
        }
    }

    /// Look up a function by name.
    pub fn lookup_function(&self, name: Name) -> Option<&FunctionDef> {
        self.lookup(name, Namespace::Value)
            .and_then(|id| self.as_function(id))
    }

    /// Look up a record by name.
    pub fn lookup_record(&self, name: Name) -> Option<&RecordDef> {
        self.lookup(name, Namespace::Type)
            .and_then(|id| self.as_record(id))
    }

    /// The parameter types of a function, in order.
    pub fn param_types(&self, func: &FunctionDef) -> Vec<Type> {
        func.params
            .iter()
            .map(|&p| self.as_parameter(p).map(|p| p.ty).unwrap_or(Type::INVALID))
            .collect()
    }

    /// Find a field by name within a record.
    pub fn find_field(&self, owner: DefId, field_name: Name) -> Option<(FieldIdx, DefId)> {
        let fields = match self.kind(owner) {
            DefKind::Record(r) => &r.fields,
            _ => return None,
        };

        for (idx, &field_def_id) in fields.iter().enumerate() {
            if self.items[field_def_id].name == field_name {
                return Some((FieldIdx::new(idx as u32), field_def_id));
            }
        }
        None
    }

    /// Get all function DefIds.
    pub fn functions(&self) -> impl Iterator<Item = DefId> + '_ {
        self.items
            .iter_enumerated()
            .filter_map(|(id, item)| match &item.kind {
                DefKind::Function(_) => Some(id),
                _ => None,
            })
    }

    /// Get all record DefIds.
    pub fn records(&self) -> impl Iterator<Item = DefId> + '_ {
        self.items
            .iter_enumerated()
            .filter_map(|(id, item)| match &item.kind {
                DefKind::Record(_) => Some(id),
                _ => None,
            })
    }

    /// Iterate over all definitions.
    pub fn iter(&self) -> impl Iterator<Item = (DefId, &DefItem)> {
        self.items.iter_enumerated()
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interner::Interner;
    use crate::source::SourceId;

    fn dummy_span() -> Span {
        Span::new(SourceId(0), 0, 0)
    }

    #[test]
    fn test_namespaces_are_disjoint() {
        let interner = Interner::new();
        let mut defs = Definitions::new();

        let name = interner.intern("point");
        let func_id = defs.alloc(
            name,
            DefKind::Function(FunctionDef {
                def_id: DefId(0),
                name,
                params: vec![],
                ret: Type::VOID,
                is_external: false,
            }),
            dummy_span(),
        );
        assert!(defs.register_name(name, Namespace::Value, func_id));

        // Same name in the type namespace is fine.
        let rec_id = defs.alloc(
            name,
            DefKind::Record(RecordDef {
                def_id: DefId(1),
                name,
                fields: vec![],
            }),
            dummy_span(),
        );
        assert!(defs.register_name(name, Namespace::Type, rec_id));

        // Duplicate within a namespace is refused.
        assert!(!defs.register_name(name, Namespace::Value, rec_id));

        assert_eq!(defs.lookup(name, Namespace::Value), Some(func_id));
        assert_eq!(defs.lookup(name, Namespace::Type), Some(rec_id));
    }

    #[test]
    fn test_field_lookup() {
        let interner = Interner::new();
        let mut defs = Definitions::new();

        let record_name = interner.intern("Pt");
        let record_id = defs.alloc(
            record_name,
            DefKind::Record(RecordDef {
                def_id: DefId(0),
                name: record_name,
                fields: vec![],
            }),
            dummy_span(),
        );

        let x_name = interner.intern("x");
        let x_id = defs.alloc(
            x_name,
            DefKind::Field(FieldDef {
                owner: record_id,
                name: x_name,
                ty: Type::INT,
                idx: FieldIdx::new(0),
            }),
            dummy_span(),
        );

        let y_name = interner.intern("y");
        let y_id = defs.alloc(
            y_name,
            DefKind::Field(FieldDef {
                owner: record_id,
                name: y_name,
                ty: Type::INT,
                idx: FieldIdx::new(1),
            }),
            dummy_span(),
        );

        if let Some(record) = defs.as_record_mut(record_id) {
            record.fields = vec![x_id, y_id];
        }

        let (idx, found_id) = defs.find_field(record_id, x_name).unwrap();
        assert_eq!(idx, FieldIdx::new(0));
        assert_eq!(found_id, x_id);

        let (idx, found_id) = defs.find_field(record_id, y_name).unwrap();
        assert_eq!(idx, FieldIdx::new(1));
        assert_eq!(found_id, y_id);

        let z_name = interner.intern("z");
        assert!(defs.find_field(record_id, z_name).is_none());
    }
}
