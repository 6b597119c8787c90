//! End-to-end interpreter tests: complete programs executed against a fresh
//! context, observed through the surviving globals.

use mysore_core::{selector, Value};
use mysore_interp::{interpret_statements, run_caught, Backend, Context, SymbolTable};
use mysore_parser::ast::{ClosureDecl, ExprKind, Statements, StmtKind};
use mysore_parser::parse;
use mysore_runtime::{lookup_class, receiver_class, Class, Closure, ClosureInvoke, CompiledMethod};

fn leak(source: &str) -> &'static Statements {
    Box::leak(Box::new(parse(source).expect("program should parse")))
}

fn run(source: &str) -> (Context, &'static Statements) {
    let ast = leak(source);
    let mut ctx = Context::new();
    interpret_statements(ast, &mut ctx);
    (ctx, ast)
}

fn global_int(ctx: &Context, name: &str) -> i64 {
    let value = ctx.global(name).expect("global should exist");
    assert!(value.is_int(), "global '{name}' is not an integer: {value:?}");
    value.as_int()
}

fn first_closure(ast: &'static Statements) -> &'static ClosureDecl {
    for stmt in &ast.statements {
        if let StmtKind::Expr(expr) = &stmt.kind {
            if let ExprKind::Closure(decl) = &expr.kind {
                return decl;
            }
        }
    }
    panic!("no closure declaration in program");
}

// =============================================================================
// Arithmetic and comparisons
// =============================================================================

#[test]
fn test_small_integer_arithmetic() {
    let (ctx, _) = run("var x = 2 * 3 + 4;");
    assert_eq!(global_int(&ctx, "x"), 10);
}

#[test]
fn test_division_and_subtraction() {
    let (ctx, _) = run("var x = 7 / 2 - 10;");
    assert_eq!(global_int(&ctx, "x"), -7);
}

#[test]
fn test_comparison_yields_boxed_bit() {
    let (ctx, _) = run("var a = 1; var b = 1; var c = (a == b);");
    assert_eq!(global_int(&ctx, "c"), 1);

    let (ctx, _) = run("var c = (2 < 1);");
    assert_eq!(global_int(&ctx, "c"), 0);
}

#[test]
fn test_mixed_comparison_uses_raw_bits() {
    // An object compared against an integer compares the shifted tagged
    // words; they can never be equal.
    let (ctx, _) = run("class MixedCmp { } var o = new MixedCmp; var c = (o == 1); var d = (o != 1);");
    assert_eq!(global_int(&ctx, "c"), 0);
    assert_eq!(global_int(&ctx, "d"), 1);
}

#[test]
fn test_constant_expression_is_cached() {
    let ast = leak("var x = 2 + 3;");
    let mut ctx = Context::new();
    interpret_statements(ast, &mut ctx);

    let StmtKind::Decl { init: Some(init), .. } = &ast.statements[0].kind else {
        panic!("expected decl");
    };
    assert_eq!(init.cached().as_int(), 5);
}

#[test]
fn test_string_literal_constant_identity() {
    // A constant expression evaluated twice returns the identical value,
    // including object identity for a string literal allocated once.
    let (ctx, _) = run("func lit() { return \"stable\"; } var a = lit(); var b = lit();");
    let a = ctx.global("a").unwrap();
    let b = ctx.global("b").unwrap();
    assert!(a.is_object());
    assert_eq!(a.raw(), b.raw());
}

// =============================================================================
// Classes and dispatch
// =============================================================================

#[test]
fn test_method_dispatch_on_non_integer_operand() {
    let (ctx, _) = run(
        "class BoxAdd { var val; func add(o) { return new BoxAdd; } }\n\
         var b = new BoxAdd;\n\
         var r = b + 1;",
    );
    let b = ctx.global("b").unwrap();
    let r = ctx.global("r").unwrap();
    assert!(r.is_object());
    assert_ne!(r.raw(), b.raw(), "add must return a fresh instance");
    let cls = unsafe { receiver_class(r) };
    assert_eq!(cls.name, "BoxAdd");
}

#[test]
fn test_factorial_method_with_while_and_return() {
    let (ctx, _) = run(
        "class FactC { func fact(n) { var a = 1; while (n > 0) { a = a * n; n = n - 1; } return a; } }\n\
         var r = (new FactC).fact(5);",
    );
    assert_eq!(global_int(&ctx, "r"), 120);
}

#[test]
fn test_instance_variables_persist_across_methods() {
    let (ctx, _) = run(
        "class CounterIv { var count; func start() { count = 10; return 0; } func get() { return count; } }\n\
         var c = new CounterIv;\n\
         var d = c.start();\n\
         var r = c.get();",
    );
    assert_eq!(global_int(&ctx, "r"), 10);
}

#[test]
fn test_new_object_ivars_are_null() {
    let (ctx, _) = run(
        "class FreshIv { var slot; func get() { return slot; } }\n\
         var r = (new FreshIv).get();",
    );
    assert!(ctx.global("r").unwrap().is_null());
}

#[test]
fn test_inherited_method_dispatch() {
    let (ctx, _) = run(
        "class BaseGreet { func answer() { return 42; } }\n\
         class SubGreet : BaseGreet { }\n\
         var r = (new SubGreet).answer();",
    );
    assert_eq!(global_int(&ctx, "r"), 42);
}

#[test]
fn test_subclass_overrides_method() {
    let (ctx, _) = run(
        "class BaseOv { func v() { return 1; } }\n\
         class SubOv : BaseOv { func v() { return 2; } }\n\
         var r = (new SubOv).v();",
    );
    assert_eq!(global_int(&ctx, "r"), 2);
}

#[test]
fn test_self_is_bound_in_methods() {
    let (ctx, _) = run(
        "class SelfRet { func me() { return self; } }\n\
         var o = new SelfRet;\n\
         var r = o.me();",
    );
    assert_eq!(ctx.global("r").unwrap().raw(), ctx.global("o").unwrap().raw());
}

#[test]
fn test_string_builtin_methods() {
    let (ctx, _) = run("var n = \"hello\".length(); var ch = \"abc\".charAt(1);");
    assert_eq!(global_int(&ctx, "n"), 5);
    assert_eq!(global_int(&ctx, "ch"), i64::from(b'b'));
}

// =============================================================================
// Closures
// =============================================================================

#[test]
fn test_closure_captures_by_value() {
    let (ctx, _) = run(
        "var x = 1;\n\
         func make() { return func() { return x; }; }\n\
         var f = make();\n\
         x = 99;\n\
         var r = f();",
    );
    assert_eq!(global_int(&ctx, "r"), 1);
}

#[test]
fn test_function_without_return_yields_null() {
    let (ctx, _) = run("func noop() { var a = 1; } var r = noop();");
    assert!(ctx.global("r").unwrap().is_null());
}

#[test]
fn test_recursive_closure() {
    let (ctx, _) = run(
        "func fib(n) { if (n < 2) { return 1; } return fib(n - 1) + fib(n - 2); }\n\
         var r = fib(10);",
    );
    assert_eq!(global_int(&ctx, "r"), 89);
}

#[test]
fn test_parameters_are_assignable() {
    let (ctx, _) = run("func dec(n) { n = n - 1; return n; } var r = dec(5);");
    assert_eq!(global_int(&ctx, "r"), 4);
}

#[test]
fn test_return_inside_while_terminates() {
    let (ctx, _) = run("func first(n) { while (1) { return n; } return 0; } var r = first(5);");
    assert_eq!(global_int(&ctx, "r"), 5);
}

#[test]
fn test_local_stack_depth_restored_after_calls() {
    let (ctx, _) = run(
        "func inner(n) { return n + 1; }\n\
         func outer(n) { return inner(n) + inner(n); }\n\
         var r = outer(3);",
    );
    assert_eq!(global_int(&ctx, "r"), 8);
    assert_eq!(ctx.local_depth(), 0);
}

#[test]
fn test_assignment_to_unknown_name_creates_global() {
    let (ctx, _) = run("func setit() { autocreated_global = 7; return 0; } var d = setit();");
    assert_eq!(global_int(&ctx, "autocreated_global"), 7);
}

#[test]
fn test_function_locals_live_in_globals() {
    // A `var` inside a function is not bound in the call frame, so storing
    // it falls through to global storage. Faithful, if surprising.
    let (ctx, _) = run("func f() { var leaked_local = 3; return leaked_local; } var r = f();");
    assert_eq!(global_int(&ctx, "r"), 3);
    assert_eq!(global_int(&ctx, "leaked_local"), 3);
}

// =============================================================================
// Tier-up
// =============================================================================

unsafe extern "C" fn compiled_inc(_closure: *mut Closure, n: Value) -> Value {
    Value::from_int(n.as_int() + 1)
}

unsafe extern "C" fn compiled_method_inc(
    _this: Value,
    _cmd: mysore_core::Selector,
    n: Value,
) -> Value {
    Value::from_int(n.as_int() + 1)
}

struct IncBackend;

impl Backend for IncBackend {
    fn compile_closure(
        &self,
        decl: &'static ClosureDecl,
        _globals: &SymbolTable,
    ) -> Option<ClosureInvoke> {
        (decl.arity() == 1).then(|| unsafe {
            std::mem::transmute::<unsafe extern "C" fn(*mut Closure, Value) -> Value, ClosureInvoke>(
                compiled_inc,
            )
        })
    }

    fn compile_method(
        &self,
        decl: &'static ClosureDecl,
        _class: &'static Class,
    ) -> Option<CompiledMethod> {
        (decl.arity() == 1).then(|| unsafe {
            std::mem::transmute::<
                unsafe extern "C" fn(Value, mysore_core::Selector, Value) -> Value,
                CompiledMethod,
            >(compiled_method_inc)
        })
    }
}

const INC_LOOP: &str = "var total = 0;\n\
                        var i = 0;\n\
                        while (i < 12) { total = total + inc(i); i = i + 1; }";

#[test]
fn test_closure_tier_up_preserves_semantics() {
    let source = format!("func inc(n) {{ return n + 1; }}\n{INC_LOOP}");

    // Interpreted only.
    let ast = leak(&source);
    let mut ctx = Context::new();
    interpret_statements(ast, &mut ctx);
    let interpreted_total = global_int(&ctx, "total");
    assert_eq!(first_closure(ast).execution_count(), 12);

    // With a backend the 10th call installs the compiled function, the
    // remaining calls bypass the interpreter, and the result is unchanged.
    let ast = leak(&source);
    let mut ctx = Context::with_backend(Box::new(IncBackend));
    interpret_statements(ast, &mut ctx);
    assert_eq!(global_int(&ctx, "total"), interpreted_total);
    assert_eq!(global_int(&ctx, "total"), 78);

    let decl = first_closure(ast);
    assert_eq!(decl.execution_count(), 10, "calls after tier-up skip the interpreter");
    assert!(decl.compiled_entry().is_some());
}

#[test]
fn test_closures_born_after_tier_up_start_compiled() {
    // Once the declaration is compiled, new closure instances minted from
    // it get the compiled entry point at construction.
    let source = "func makeinc() { return func inc2(n) { return n + 1; }; }\n\
                  var f = makeinc();\n\
                  var total = 0;\n\
                  var i = 0;\n\
                  while (i < 12) { total = total + f(i); i = i + 1; }\n\
                  var g = makeinc();";
    let ast = leak(source);
    let mut ctx = Context::with_backend(Box::new(IncBackend));
    interpret_statements(ast, &mut ctx);
    assert_eq!(global_int(&ctx, "total"), 78);

    let g = ctx.global("g").unwrap();
    assert!(g.is_object());
    let invoke = unsafe { (*g.as_obj_ptr::<Closure>()).invoke };
    assert_eq!(invoke as usize, compiled_inc as usize);
}

#[test]
fn test_method_tier_up_replaces_table_entry() {
    let source = "class HotCounter { func inc(n) { return n + 1; } }\n\
                  var c = new HotCounter;\n\
                  var total = 0;\n\
                  var i = 0;\n\
                  while (i < 12) { total = total + c.inc(i); i = i + 1; }";
    let ast = leak(source);
    let mut ctx = Context::with_backend(Box::new(IncBackend));
    interpret_statements(ast, &mut ctx);
    assert_eq!(global_int(&ctx, "total"), 78);

    let cls = lookup_class("HotCounter").unwrap();
    let method = cls.method_for_selector(selector::intern("inc")).unwrap();
    assert_eq!(method.function() as usize, compiled_method_inc as usize);
}

#[test]
fn test_no_backend_means_no_tier_up() {
    let source = format!("func inc(n) {{ return n + 1; }}\n{INC_LOOP}");
    let ast = leak(&source);
    let mut ctx = Context::new();
    interpret_statements(ast, &mut ctx);
    let decl = first_closure(ast);
    assert_eq!(decl.execution_count(), 12);
    assert!(decl.compiled_entry().is_none());
}

// =============================================================================
// Fatal errors
// =============================================================================

#[test]
fn test_unknown_symbol_aborts_batch() {
    let ast = leak("var z = never_defined_symbol_xyz;");
    let mut ctx = Context::new();
    let err = run_caught(ast, &mut ctx).unwrap_err();
    assert!(err.to_string().contains("unknown symbol"));
    assert_eq!(ctx.local_depth(), 0);
}

#[test]
fn test_unknown_class_aborts_batch() {
    let ast = leak("var z = new NeverDeclaredClassXyz;");
    let mut ctx = Context::new();
    let err = run_caught(ast, &mut ctx).unwrap_err();
    assert!(err.to_string().contains("unknown class"));
}

#[test]
fn test_unknown_selector_aborts_batch() {
    let ast = leak("var z = 1.frobnicate();");
    let mut ctx = Context::new();
    let err = run_caught(ast, &mut ctx).unwrap_err();
    assert!(err.to_string().contains("does not respond to"));
}

#[test]
fn test_context_survives_abort() {
    let mut ctx = Context::new();
    assert!(run_caught(leak("var kept = 5;"), &mut ctx).is_ok());
    assert!(run_caught(leak("var z = missing_name_abc;"), &mut ctx).is_err());
    assert!(run_caught(leak("var after = kept + 1;"), &mut ctx).is_ok());
    assert_eq!(global_int(&ctx, "after"), 6);
}
