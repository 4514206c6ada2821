//! Runtime library declarations.
//!
//! The generated program links against a small C runtime providing
//! dynamic lists, strings, I/O and math routines. Before analysis the
//! whole set is injected into the global function table as external
//! declarations, so runtime calls resolve exactly like user calls; the
//! emitter later declares each one in the IR module. Names and shapes
//! are load-bearing for the emitter's list/string dispatch.

use crate::context::CompilerContext;
use crate::definitions::{DefKind, FunctionDef, Namespace, ParameterDef};
use crate::source::Span;
use crate::types::{Type, TypeKind};

/// Opaque runtime list handle. `list_length` and `save_args` accept any
/// list; the analyzer treats an argument of any list type as satisfying
/// a parameter of this type.
pub const ANY_LIST: Type = Type::list_of(TypeKind::Void);

const INT_LIST: Type = Type::list_of(TypeKind::Int);
const DOUBLE_LIST: Type = Type::list_of(TypeKind::Double);
const STR: Type = Type::STRING;
const INT: Type = Type::INT;
const DOUBLE: Type = Type::DOUBLE;
const CHAR: Type = Type::CHAR;
const VOID: Type = Type::VOID;

/// The shape of one runtime-provided routine.
pub struct RuntimeDecl {
    pub name: &'static str,
    pub params: &'static [Type],
    pub ret: Type,
}

/// Every routine the runtime exports to Crema programs.
pub const RUNTIME_DECLS: &[RuntimeDecl] = &[
    // List constructors
    RuntimeDecl { name: "int_list_create", params: &[], ret: INT_LIST },
    RuntimeDecl { name: "double_list_create", params: &[], ret: DOUBLE_LIST },
    RuntimeDecl { name: "str_create", params: &[], ret: STR },
    // Generic list ops
    RuntimeDecl { name: "list_length", params: &[ANY_LIST], ret: INT },
    // Int lists
    RuntimeDecl { name: "int_list_retrieve", params: &[INT_LIST, INT], ret: INT },
    RuntimeDecl { name: "int_list_insert", params: &[INT_LIST, INT, INT], ret: VOID },
    RuntimeDecl { name: "int_list_append", params: &[INT_LIST, INT], ret: VOID },
    // Double lists
    RuntimeDecl { name: "double_list_retrieve", params: &[DOUBLE_LIST, INT], ret: DOUBLE },
    RuntimeDecl { name: "double_list_insert", params: &[DOUBLE_LIST, INT, DOUBLE], ret: VOID },
    RuntimeDecl { name: "double_list_append", params: &[DOUBLE_LIST, DOUBLE], ret: VOID },
    // Strings (char lists)
    RuntimeDecl { name: "str_retrieve", params: &[STR, INT], ret: CHAR },
    RuntimeDecl { name: "str_insert", params: &[STR, INT, CHAR], ret: VOID },
    RuntimeDecl { name: "str_append", params: &[STR, CHAR], ret: VOID },
    // I/O
    RuntimeDecl { name: "str_print", params: &[STR], ret: VOID },
    RuntimeDecl { name: "str_println", params: &[STR], ret: VOID },
    RuntimeDecl { name: "int_print", params: &[INT], ret: VOID },
    RuntimeDecl { name: "int_println", params: &[INT], ret: VOID },
    RuntimeDecl { name: "double_print", params: &[DOUBLE], ret: VOID },
    RuntimeDecl { name: "double_println", params: &[DOUBLE], ret: VOID },
    // Program arguments
    RuntimeDecl { name: "prog_arg_count", params: &[], ret: INT },
    RuntimeDecl { name: "prog_argument", params: &[INT], ret: STR },
    RuntimeDecl { name: "save_args", params: &[INT, ANY_LIST], ret: VOID },
    // Ranges
    RuntimeDecl { name: "crema_seq", params: &[INT, INT], ret: INT_LIST },
    // Math
    RuntimeDecl { name: "double_floor", params: &[DOUBLE], ret: DOUBLE },
    RuntimeDecl { name: "double_ceiling", params: &[DOUBLE], ret: DOUBLE },
    RuntimeDecl { name: "double_round", params: &[DOUBLE], ret: DOUBLE },
    RuntimeDecl { name: "double_square", params: &[DOUBLE], ret: DOUBLE },
    RuntimeDecl { name: "double_pow", params: &[DOUBLE, DOUBLE], ret: DOUBLE },
    RuntimeDecl { name: "double_sin", params: &[DOUBLE], ret: DOUBLE },
    RuntimeDecl { name: "double_sqrt", params: &[DOUBLE], ret: DOUBLE },
    RuntimeDecl { name: "double_abs", params: &[DOUBLE], ret: DOUBLE },
    RuntimeDecl { name: "int_square", params: &[INT], ret: INT },
    RuntimeDecl { name: "int_pow", params: &[INT, INT], ret: INT },
    RuntimeDecl { name: "int_abs", params: &[INT], ret: INT },
];

/// Register the whole runtime in the function table. Idempotent: names
/// already present are left alone, so re-running analysis does not
/// produce duplicate-declaration errors.
pub fn register_runtime(ctx: &mut CompilerContext) {
    for decl in RUNTIME_DECLS {
        let name = ctx.intern(decl.name);
        if ctx.defs.lookup(name, Namespace::Value).is_some() {
            continue;
        }

        let func_id = ctx.defs.alloc(
            name,
            DefKind::Function(FunctionDef {
                def_id: crate::ids::DefId::INVALID,
                name,
                params: Vec::new(),
                ret: decl.ret,
                is_external: true,
            }),
            Span::default(),
        );

        let mut param_ids = Vec::with_capacity(decl.params.len());
        for (idx, &ty) in decl.params.iter().enumerate() {
            let param_name = ctx.intern(&format!("arg{}", idx));
            let param_id = ctx.defs.alloc(
                param_name,
                DefKind::Parameter(ParameterDef {
                    owner: func_id,
                    name: param_name,
                    ty,
                    idx: idx as u32,
                }),
                Span::default(),
            );
            param_ids.push(param_id);
        }

        if let Some(func) = ctx.defs.as_function_mut(func_id) {
            func.def_id = func_id;
            func.params = param_ids;
        }

        ctx.defs.register_name(name, Namespace::Value, func_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_runtime() {
        let mut ctx = CompilerContext::new();
        register_runtime(&mut ctx);

        let len = ctx.lookup_function("list_length").unwrap();
        let func = ctx.defs.as_function(len).unwrap();
        assert!(func.is_external);
        assert_eq!(func.ret, Type::INT);
        assert_eq!(ctx.defs.param_types(func), vec![ANY_LIST]);

        let seq = ctx.lookup_function("crema_seq").unwrap();
        let func = ctx.defs.as_function(seq).unwrap();
        assert_eq!(func.ret, Type::list_of(TypeKind::Int));
        assert_eq!(ctx.defs.param_types(func).len(), 2);
    }

    #[test]
    fn test_register_runtime_is_idempotent() {
        let mut ctx = CompilerContext::new();
        register_runtime(&mut ctx);
        let count = ctx.defs.len();
        register_runtime(&mut ctx);
        assert_eq!(ctx.defs.len(), count);
    }
}
