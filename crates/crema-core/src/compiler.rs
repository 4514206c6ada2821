//! Main compiler driver.
//!
//! High-level API for running a translation unit through the pipeline:
//! parse → analyze → lower. Fatal diagnostics disable later phases; the
//! CLI maps `has_errors` to its exit code.

use crate::context::CompilerContext;
use crate::diagnostic::Diagnostic;
use crate::ir::{lower, render, IrModule};
use crate::sema::analyze;
use crate::syntax::ast::Program;
use crate::syntax::{parse as parse_source, ParseError};

use std::path::Path;

/// Result type for compilation.
pub type CompileResult<T> = Result<T, CompileError>;

/// Compilation error.
#[derive(Debug)]
pub enum CompileError {
    /// Parse error.
    Parse(ParseError),
    /// Semantic analysis reported fatal diagnostics.
    Analysis,
    /// IO error.
    Io(std::io::Error),
}

impl From<ParseError> for CompileError {
    fn from(e: ParseError) -> Self {
        CompileError::Parse(e)
    }
}

impl From<std::io::Error> for CompileError {
    fn from(e: std::io::Error) -> Self {
        CompileError::Io(e)
    }
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::Parse(e) => write!(f, "parse error: {}", e),
            CompileError::Analysis => write!(f, "semantic analysis failed"),
            CompileError::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl std::error::Error for CompileError {}

/// Compiler instance owning the compilation-unit context.
pub struct Compiler {
    ctx: CompilerContext,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    /// Create a new compiler.
    pub fn new() -> Self {
        Self {
            ctx: CompilerContext::new(),
        }
    }

    /// Get the compiler context.
    pub fn context(&self) -> &CompilerContext {
        &self.ctx
    }

    /// Get mutable compiler context.
    pub fn context_mut(&mut self) -> &mut CompilerContext {
        &mut self.ctx
    }

    /// Load and parse a source file.
    ///
    /// On parse error, adds the error to diagnostics.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> CompileResult<Program> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let source_id = self.ctx.source_map.add_file(path.to_path_buf(), &content);
        match parse_source(&content, source_id) {
            Ok(program) => Ok(program),
            Err(e) => {
                self.ctx
                    .diagnostics
                    .push(Diagnostic::error(e.to_string()).with_span(e.span()));
                Err(e.into())
            }
        }
    }

    /// Parse a source string.
    ///
    /// On parse error, adds the error to diagnostics and returns an
    /// error. Callers should check `has_errors()` afterwards.
    pub fn parse(&mut self, source: &str) -> CompileResult<Program> {
        let source_id = self.ctx.source_map.add_inline(source);
        match parse_source(source, source_id) {
            Ok(program) => Ok(program),
            Err(e) => {
                self.ctx
                    .diagnostics
                    .push(Diagnostic::error(e.to_string()).with_span(e.span()));
                Err(e.into())
            }
        }
    }

    /// Run semantic analysis, annotating expression types in place.
    /// Returns `true` iff the program is semantically valid (warnings
    /// are not failures).
    pub fn analyze(&mut self, program: &mut Program) -> bool {
        analyze(program, &mut self.ctx)
    }

    /// Lower an analyzed program to IR. Callers must only invoke this
    /// after a successful `analyze`.
    pub fn lower(&self, program: &Program, module_name: &str) -> IrModule {
        lower(program, &self.ctx, module_name)
    }

    /// Render an IR module to text (the `-S` output).
    pub fn render_ir(&self, module: &IrModule) -> String {
        render(module, &self.ctx.interner)
    }

    /// Check if there were any errors.
    pub fn has_errors(&self) -> bool {
        self.ctx.has_errors()
    }

    /// Get the number of errors.
    pub fn error_count(&self) -> usize {
        self.ctx.error_count()
    }

    /// Render all diagnostics.
    pub fn render_diagnostics(&self) -> String {
        self.ctx.render_diagnostics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Severity;

    /// Parse and analyze, returning the compiler and the analysis result.
    fn check(source: &str) -> (Compiler, bool) {
        let mut compiler = Compiler::new();
        let mut program = compiler.parse(source).expect("parse should succeed");
        let ok = compiler.analyze(&mut program);
        (compiler, ok)
    }

    /// Full pipeline on a program that must analyze cleanly; returns the
    /// rendered IR.
    fn compile(source: &str) -> String {
        let mut compiler = Compiler::new();
        let mut program = compiler.parse(source).expect("parse should succeed");
        assert!(
            compiler.analyze(&mut program),
            "analysis failed:\n{}",
            compiler.render_diagnostics()
        );
        let module = compiler.lower(&program, "test");
        compiler.render_ir(&module)
    }

    fn error_messages(compiler: &Compiler) -> Vec<String> {
        compiler
            .context()
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .map(|d| d.message.clone())
            .collect()
    }

    fn warning_messages(compiler: &Compiler) -> Vec<String> {
        compiler
            .context()
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .map(|d| d.message.clone())
            .collect()
    }

    // ========================================================================
    // END-TO-END SCENARIOS
    // ========================================================================

    #[test]
    fn test_scenario_arithmetic_and_return() {
        // int a = 3  int b = a + 4  return b → exits 7
        let ir = compile("int a = 3  int b = a + 4  return b");
        assert!(ir.contains("@g0 = global i64 undef ; a"));
        assert!(ir.contains("@g1 = global i64 undef ; b"));
        assert!(ir.contains("store i64 3, ptr @g0"));
        assert!(ir.contains("add i64"));
        assert!(ir.contains("call void @save_args(i64 %t0, ptr %t1)"));
        // The top-level return feeds the exit code directly.
        assert!(ir.contains("ret i64 %t"));
    }

    #[test]
    fn test_scenario_narrowing_assignment_rejected() {
        // int a  double b = 2.5  a = b → double does not fit int
        let (compiler, ok) = check("int a  double b = 2.5  a = b");
        assert!(!ok);
        let errors = error_messages(&compiler);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("type mismatch for assignment to a"));
    }

    #[test]
    fn test_scenario_upcast_warning() {
        // int a  double b = a  return b → ok, warns, returns 0.0
        let (compiler, ok) = check("int a  double b = a  return b");
        assert!(ok, "{}", compiler.render_diagnostics());
        let warnings = warning_messages(&compiler);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("up-cast from int to double"));

        let ir = compile("int a  double b = a  return b");
        assert!(ir.contains("sitofp i64"));
        // The double return narrows to the i64 exit code.
        assert!(ir.contains("fptosi double"));
    }

    #[test]
    fn test_scenario_self_recursion_rejected() {
        let (compiler, ok) = check("def int f() { return f() }");
        assert!(!ok);
        let errors = error_messages(&compiler);
        assert!(errors.iter().any(|e| e.contains("recursive function call in f")));
    }

    #[test]
    fn test_scenario_record_roundtrip() {
        let ir = compile("struct Pt { int x  int y }  Pt p  p.x = 5  return p.x");
        assert!(ir.contains("%struct.Pt = type { i64, i64 }"));
        assert!(ir.contains("getelementptr %struct.Pt, ptr @g0, i32 0, i32 0"));
        assert!(ir.contains("store i64 5"));
    }

    #[test]
    fn test_scenario_foreach_prints_elements() {
        let ir = compile("int[] xs = [1, 2, 3]  foreach (xs as v) { int_println(v) }");
        assert!(ir.contains("call ptr @int_list_create()"));
        assert_eq!(ir.matches("call void @int_list_append").count(), 3);
        assert!(ir.contains("call i64 @list_length"));
        assert!(ir.contains("icmp slt i64"));
        assert!(ir.contains("call i64 @int_list_retrieve"));
        assert!(ir.contains("call void @int_println"));
        assert!(ir.contains("forcond"));
        assert!(ir.contains("forbody"));
        assert!(ir.contains("forend"));
    }

    #[test]
    fn test_scenario_heterogeneous_list_rejected() {
        let (compiler, ok) = check("int[] xs = [1, 2.0]");
        assert!(!ok);
        assert!(error_messages(&compiler)
            .iter()
            .any(|e| e.contains("list contains differing types")));
    }

    #[test]
    fn test_scenario_string_condition_rejected() {
        let (compiler, ok) = check("if (\"hi\") { }");
        assert!(!ok);
        assert!(error_messages(&compiler)
            .iter()
            .any(|e| e.contains("condition cannot evaluate to a boolean")));
    }

    // ========================================================================
    // ANALYZER BEHAVIOR
    // ========================================================================

    #[test]
    fn test_analysis_is_idempotent() {
        let mut compiler = Compiler::new();
        let mut program = compiler.parse("int a  double b = a  return b").unwrap();

        assert!(compiler.analyze(&mut program));
        let first_warnings = warning_messages(&compiler);
        let b_ty = match &program.stmts[1].kind {
            crate::syntax::ast::StmtKind::VarDecl(d) => d.init.as_ref().unwrap().ty,
            _ => unreachable!(),
        };

        // A second run over the same tree: same outcome, same
        // diagnostics, same annotations.
        assert!(compiler.analyze(&mut program));
        let second_warnings = warning_messages(&compiler);
        assert_eq!(second_warnings.len(), first_warnings.len() * 2);
        assert_eq!(&second_warnings[first_warnings.len()..], &first_warnings[..]);

        let b_ty_again = match &program.stmts[1].kind {
            crate::syntax::ast::StmtKind::VarDecl(d) => d.init.as_ref().unwrap().ty,
            _ => unreachable!(),
        };
        assert_eq!(b_ty, b_ty_again);
    }

    #[test]
    fn test_mutual_recursion_rejected() {
        let (compiler, ok) = check(
            "def int f() { return g() }  def int g() { return f() }",
        );
        assert!(!ok);
        let errors = error_messages(&compiler);
        assert!(errors.iter().any(|e| e.contains("recursive function call in f")));
        assert!(errors.iter().any(|e| e.contains("recursive function call in g")));
    }

    #[test]
    fn test_acyclic_calls_accepted() {
        let (compiler, ok) = check(
            "def int helper(int x) { return x + 1 }  def int top() { return helper(1) + helper(2) }  return top()",
        );
        assert!(ok, "{}", compiler.render_diagnostics());
    }

    #[test]
    fn test_forward_reference_resolves() {
        let (compiler, ok) = check("def int a() { return b() }  def int b() { return 1 }");
        assert!(ok, "{}", compiler.render_diagnostics());
    }

    #[test]
    fn test_undefined_variable() {
        let (compiler, ok) = check("int a = b");
        assert!(!ok);
        assert!(error_messages(&compiler)
            .iter()
            .any(|e| e.contains("undefined variable `b`")));
    }

    #[test]
    fn test_undefined_function() {
        let (compiler, ok) = check("int a = missing()");
        assert!(!ok);
        assert!(error_messages(&compiler)
            .iter()
            .any(|e| e.contains("call to undefined function `missing`")));
    }

    #[test]
    fn test_duplicate_variable() {
        let (compiler, ok) = check("int a  int a");
        assert!(!ok);
        assert!(error_messages(&compiler)
            .iter()
            .any(|e| e.contains("duplicate declaration of variable `a`")));
    }

    #[test]
    fn test_variable_function_reservation() {
        // Runtime names are function names; declaring a variable with
        // one is an error, in both directions.
        let (compiler, ok) = check("int int_println");
        assert!(!ok);
        assert!(error_messages(&compiler)
            .iter()
            .any(|e| e.contains("`int_println` is already declared as a function")));

        // Functions are registered before the statement walk, so the
        // clash surfaces on the variable regardless of source order.
        let (compiler, ok) = check("int a  def int a() { return 1 }");
        assert!(!ok);
        assert!(error_messages(&compiler)
            .iter()
            .any(|e| e.contains("`a` is already declared as a function")));
    }

    #[test]
    fn test_shadowing_in_nested_block_allowed() {
        let (compiler, ok) = check("int a = 1  if (a) { double a = 2.5  double b = a }");
        assert!(ok, "{}", compiler.render_diagnostics());
    }

    #[test]
    fn test_block_scope_is_torn_down() {
        let (compiler, ok) = check("if (true) { int inner = 1 }  int a = inner");
        assert!(!ok);
        assert!(error_messages(&compiler)
            .iter()
            .any(|e| e.contains("undefined variable `inner`")));
        // The duplicate declaration path would have fired instead if the
        // inner scope leaked.
        let _ = compiler;
    }

    #[test]
    fn test_multiple_errors_reported() {
        let (compiler, ok) = check("int a = x  int b = y");
        assert!(!ok);
        assert_eq!(compiler.error_count(), 2);
    }

    #[test]
    fn test_call_arity_checked() {
        let (compiler, ok) = check("int n = int_abs(1, 2)");
        assert!(!ok);
        assert!(error_messages(&compiler)
            .iter()
            .any(|e| e.contains("wrong number of arguments to `int_abs`")));
    }

    #[test]
    fn test_argument_upcast_warns() {
        let (compiler, ok) = check("double_println(1)");
        assert!(ok, "{}", compiler.render_diagnostics());
        assert!(warning_messages(&compiler)
            .iter()
            .any(|w| w.contains("up-cast from int to double")));
    }

    #[test]
    fn test_list_length_accepts_any_list() {
        let (compiler, ok) = check(
            "int[] xs = [1]  double[] ys = [1.5]  int a = list_length(xs)  int b = list_length(ys)",
        );
        assert!(ok, "{}", compiler.render_diagnostics());
    }

    #[test]
    fn test_foreach_over_scalar_rejected() {
        let (compiler, ok) = check("int n = 3  foreach (n as v) { }");
        assert!(!ok);
        assert!(error_messages(&compiler)
            .iter()
            .any(|e| e.contains("`n` is not a list")));
    }

    #[test]
    fn test_list_index_must_be_integral() {
        let (compiler, ok) = check("int[] xs = [1]  int a = xs[1.5]");
        assert!(!ok);
        assert!(error_messages(&compiler)
            .iter()
            .any(|e| e.contains("list index must be an integer")));
    }

    #[test]
    fn test_record_must_be_declared_before_use() {
        let (compiler, ok) = check("Pt p  struct Pt { int x }");
        assert!(!ok);
        assert!(error_messages(&compiler)
            .iter()
            .any(|e| e.contains("undefined struct `Pt`")));
    }

    #[test]
    fn test_unknown_record_field() {
        let (compiler, ok) = check("struct Pt { int x }  Pt p  p.z = 1");
        assert!(!ok);
        assert!(error_messages(&compiler)
            .iter()
            .any(|e| e.contains("struct `Pt` has no field `z`")));
    }

    #[test]
    fn test_duplicate_record_field() {
        let (compiler, ok) = check("struct Pt { int x  int x }");
        assert!(!ok);
        assert!(error_messages(&compiler)
            .iter()
            .any(|e| e.contains("duplicate field `x` in struct `Pt`")));
    }

    #[test]
    fn test_numeric_to_string_rejected_with_note() {
        let (compiler, ok) = check("str s = 3");
        assert!(!ok);
        let has_note = compiler
            .context()
            .diagnostics
            .iter()
            .any(|d| d.notes.iter().any(|n| n.contains("numeric type to str")));
        assert!(has_note);
    }

    #[test]
    fn test_return_type_checked_in_functions() {
        let (compiler, ok) = check("def int f() { return 2.5 }");
        assert!(!ok);
        assert!(error_messages(&compiler)
            .iter()
            .any(|e| e.contains("returning double when int was expected")));
    }

    #[test]
    fn test_return_upcast_warns_in_functions() {
        let (compiler, ok) = check("def double f() { return 1 }");
        assert!(ok, "{}", compiler.render_diagnostics());
        assert!(warning_messages(&compiler)
            .iter()
            .any(|w| w.contains("up-cast from int to double")));
    }

    #[test]
    fn test_empty_list_takes_declared_type() {
        let (compiler, ok) = check("int[] xs = []  foreach (xs as v) { int_println(v) }");
        assert!(ok, "{}", compiler.render_diagnostics());
    }

    #[test]
    fn test_logical_ops_yield_bool() {
        let (compiler, ok) = check("bool b = 1 < 2 && true");
        assert!(ok, "{}", compiler.render_diagnostics());
    }

    #[test]
    fn test_logical_ops_reject_doubles() {
        let (compiler, ok) = check("bool b = 1.5 && 2.5");
        assert!(!ok);
        let _ = compiler;
    }

    #[test]
    fn test_incomparable_operands_rejected() {
        let (compiler, ok) = check("char c = 'a'  double d = 1.0  bool b = c < d");
        assert!(!ok);
        assert!(error_messages(&compiler)
            .iter()
            .any(|e| e.contains("binary operator type mismatch")));
    }

    // ========================================================================
    // EMITTER BEHAVIOR
    // ========================================================================

    #[test]
    fn test_if_lowering_shape() {
        let ir = compile("int a = 1  if (a) { a = 2 } else { a = 3 }");
        assert!(ir.contains("icmp ne i64"));
        assert!(ir.contains("then"));
        assert!(ir.contains("else"));
        assert!(ir.contains("ifcont"));
    }

    #[test]
    fn test_string_literal_lowering() {
        let ir = compile("str s = \"hi\"");
        assert!(ir.contains("call ptr @str_create()"));
        assert_eq!(ir.matches("call void @str_append").count(), 2);
    }

    #[test]
    fn test_uninitialized_list_gets_constructor() {
        let ir = compile("double[] xs");
        assert!(ir.contains("call ptr @double_list_create()"));
    }

    #[test]
    fn test_function_bodies_spill_params() {
        let ir = compile("def int add(int x, int y) { return x + y }  return add(3, 4)");
        assert!(ir.contains("define i64 @add(i64 %t0, i64 %t1)"));
        assert!(ir.contains("%slot0 = alloca i64 ; x"));
        assert!(ir.contains("%slot1 = alloca i64 ; y"));
        assert!(ir.contains("call i64 @add(i64 3, i64 4)"));
    }

    #[test]
    fn test_void_function_gets_guard_return() {
        let ir = compile("def void log(int x) { int_println(x) }  log(1)");
        assert!(ir.contains("define void @log(i64 %t0)"));
        assert!(ir.contains("ret void"));
    }

    #[test]
    fn test_local_declarations_use_slots() {
        let ir = compile("def int f() { int local = 5 return local }  return f()");
        assert!(ir.contains("alloca i64 ; local"));
    }

    #[test]
    fn test_list_element_assignment_dispatch() {
        let ir = compile("int[] xs = [1]  xs[0] = 9");
        assert!(ir.contains("call void @int_list_insert"));

        let ir = compile("str s = \"a\"  s[0] = 'b'");
        assert!(ir.contains("call void @str_insert"));
    }

    #[test]
    fn test_runtime_declarations_present() {
        let ir = compile("return 0");
        assert!(ir.contains("declare ptr @int_list_create()"));
        assert!(ir.contains("declare i64 @list_length(ptr)"));
        assert!(ir.contains("declare void @save_args(i64, ptr)"));
        assert!(ir.contains("declare ptr @crema_seq(i64, i64)"));
        assert!(ir.contains("declare double @double_pow(double, double)"));
    }

    #[test]
    fn test_coercion_table_covers_promotions() {
        // char → int
        let ir = compile("char c = 'a'  int i = c");
        assert!(ir.contains("zext i8"));
        // uint → double
        let ir = compile("uint u = 3u  double d = u");
        assert!(ir.contains("sitofp i64"));
        // bool → int
        let ir = compile("bool b = true  int i = b");
        assert!(ir.contains("zext i1"));
        // bool → double goes through i64
        let ir = compile("bool b = true  double d = b");
        assert!(ir.contains("zext i1"));
        assert!(ir.contains("sitofp i64"));
    }
}
