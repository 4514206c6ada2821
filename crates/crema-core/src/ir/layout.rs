//! Record layouts.
//!
//! Field order in the source declaration defines the layout; offsets
//! are naturally aligned and the record size is padded to its largest
//! field alignment. Records may nest records declared earlier.

use std::collections::HashMap;

use crate::definitions::Definitions;
use crate::interner::Name;
use crate::ir::block::IrType;
use crate::types::{Type, TypeKind};

/// Layout of a single field.
#[derive(Debug, Clone)]
pub struct FieldLayout {
    pub name: Name,
    pub ty: IrType,
    pub offset: usize,
    pub size: usize,
}

/// Layout of a record: ordered fields with byte offsets.
#[derive(Debug, Clone)]
pub struct RecordLayout {
    pub name: Name,
    pub fields: Vec<FieldLayout>,
    pub size: usize,
    pub align: usize,
}

/// Computes layouts for all records, in declaration order.
pub struct LayoutContext {
    layouts: HashMap<Name, RecordLayout>,
}

impl Default for LayoutContext {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutContext {
    pub fn new() -> Self {
        Self {
            layouts: HashMap::new(),
        }
    }

    /// Compute layouts for every registered record. Records only refer
    /// to records declared before them (the analyzer enforces this), so
    /// a single in-order pass suffices.
    pub fn compute_all(&mut self, defs: &Definitions) -> Vec<RecordLayout> {
        let mut ordered = Vec::new();
        for record_id in defs.records() {
            let record = defs.as_record(record_id).expect("record def");
            let mut fields = Vec::with_capacity(record.fields.len());
            let mut offset = 0usize;
            let mut align = 1usize;

            for &field_id in &record.fields {
                let field = defs.as_field(field_id).expect("field def");
                let (size, field_align) = self.size_align(field.ty);
                offset = round_up(offset, field_align);
                fields.push(FieldLayout {
                    name: field.name,
                    ty: IrType::of(field.ty),
                    offset,
                    size,
                });
                offset += size;
                align = align.max(field_align);
            }

            let layout = RecordLayout {
                name: record.name,
                fields,
                size: round_up(offset, align),
                align,
            };
            self.layouts.insert(record.name, layout.clone());
            ordered.push(layout);
        }
        ordered
    }

    /// Size and alignment of a type as stored in a record field.
    fn size_align(&self, ty: Type) -> (usize, usize) {
        if let TypeKind::Record(name) = ty.kind {
            if !ty.is_list {
                let layout = self
                    .layouts
                    .get(&name)
                    .expect("nested record declared after its container");
                return (layout.size, layout.align);
            }
        }
        let size = ty.size();
        (size, size.max(1))
    }
}

fn round_up(value: usize, align: usize) -> usize {
    (value + align - 1) / align * align
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::{DefKind, FieldDef, RecordDef};
    use crate::ids::{DefId, FieldIdx};
    use crate::interner::Interner;
    use crate::source::{SourceId, Span};

    fn make_record(
        defs: &mut Definitions,
        name: Name,
        fields: &[(Name, Type)],
    ) -> DefId {
        let span = Span::new(SourceId(0), 0, 0);
        let record_id = defs.alloc(
            name,
            DefKind::Record(RecordDef {
                def_id: DefId(0),
                name,
                fields: vec![],
            }),
            span,
        );
        let mut field_ids = Vec::new();
        for (idx, &(field_name, ty)) in fields.iter().enumerate() {
            field_ids.push(defs.alloc(
                field_name,
                DefKind::Field(FieldDef {
                    owner: record_id,
                    name: field_name,
                    ty,
                    idx: FieldIdx::new(idx as u32),
                }),
                span,
            ));
        }
        if let Some(r) = defs.as_record_mut(record_id) {
            r.fields = field_ids;
        }
        record_id
    }

    #[test]
    fn test_scalar_layout() {
        let interner = Interner::new();
        let mut defs = Definitions::new();
        let pt = interner.intern("Pt");
        make_record(
            &mut defs,
            pt,
            &[
                (interner.intern("x"), Type::INT),
                (interner.intern("y"), Type::INT),
            ],
        );

        let layouts = LayoutContext::new().compute_all(&defs);
        assert_eq!(layouts.len(), 1);
        assert_eq!(layouts[0].size, 16);
        assert_eq!(layouts[0].fields[0].offset, 0);
        assert_eq!(layouts[0].fields[1].offset, 8);
    }

    #[test]
    fn test_padding() {
        let interner = Interner::new();
        let mut defs = Definitions::new();
        let rec = interner.intern("Mixed");
        make_record(
            &mut defs,
            rec,
            &[
                (interner.intern("flag"), Type::BOOL),
                (interner.intern("value"), Type::DOUBLE),
                (interner.intern("tag"), Type::CHAR),
            ],
        );

        let layouts = LayoutContext::new().compute_all(&defs);
        let layout = &layouts[0];
        assert_eq!(layout.fields[0].offset, 0);
        assert_eq!(layout.fields[1].offset, 8); // aligned past the bool
        assert_eq!(layout.fields[2].offset, 16);
        assert_eq!(layout.size, 24); // padded to 8
    }

    #[test]
    fn test_nested_record() {
        let interner = Interner::new();
        let mut defs = Definitions::new();
        let inner = interner.intern("Inner");
        make_record(&mut defs, inner, &[(interner.intern("a"), Type::INT)]);
        let outer = interner.intern("Outer");
        make_record(
            &mut defs,
            outer,
            &[
                (interner.intern("i"), Type::record(inner)),
                (interner.intern("b"), Type::INT),
            ],
        );

        let layouts = LayoutContext::new().compute_all(&defs);
        assert_eq!(layouts[1].fields[1].offset, 8);
        assert_eq!(layouts[1].size, 16);
    }
}
