//! Per-node semantics: statement interpretation and expression evaluation.

use crate::closure::evaluate_closure_decl;
use crate::context::Context;
use crate::fatal;
use crate::trampoline::{method_trampoline, publish_context};
use mysore_core::{selector, MysoreError, Value};
use mysore_parser::ast::{ClassDecl, Expr, ExprKind, Statements, Stmt, StmtKind};
use mysore_runtime::{
    alloc_object, alloc_string, call_compiled_closure, call_compiled_method,
    compiled_method_for_selector, lookup_class, receiver_class, register_class, Class, Closure,
    Method, MAX_ARITY,
};
use smallvec::SmallVec;

/// Interpret a statement block, stopping as soon as a `return` has set the
/// returning flag.
pub fn interpret_statements(stmts: &'static Statements, ctx: &mut Context) {
    for stmt in &stmts.statements {
        if ctx.is_returning {
            return;
        }
        interpret_stmt(stmt, ctx);
    }
}

fn interpret_stmt(stmt: &'static Stmt, ctx: &mut Context) {
    match &stmt.kind {
        StmtKind::Decl { name, init } => {
            // Declarations allocate no storage of their own; storing into an
            // unresolved name is what creates a global slot on first sight.
            let value = match init {
                Some(expr) => evaluate(expr, ctx),
                None => Value::NULL,
            };
            ctx.set_symbol(&name.name, value);
        }
        StmtKind::Assignment { target, expr } => {
            let value = evaluate(expr, ctx);
            ctx.set_symbol(&target.name, value);
        }
        StmtKind::Return(expr) => {
            ctx.ret_val = evaluate(expr, ctx);
            ctx.is_returning = true;
        }
        StmtKind::If { condition, body } => {
            if evaluate(condition, ctx).is_truthy() {
                interpret_statements(body, ctx);
            }
        }
        StmtKind::While { condition, body } => {
            while !ctx.is_returning && evaluate(condition, ctx).is_truthy() {
                interpret_statements(body, ctx);
            }
        }
        StmtKind::Class(decl) => interpret_class_decl(decl),
        StmtKind::Expr(expr) => {
            evaluate(expr, ctx);
        }
    }
}

/// Evaluate an expression, consulting and filling the constant cache.
pub fn evaluate(expr: &'static Expr, ctx: &mut Context) -> Value {
    let cached = expr.cached();
    if !cached.is_null() {
        return cached;
    }
    let result = evaluate_expr(expr, ctx);
    if expr.is_constant_expression() {
        expr.store_cache(result);
    }
    result
}

fn evaluate_expr(expr: &'static Expr, ctx: &mut Context) -> Value {
    match &expr.kind {
        ExprKind::Number(value) => Value::from_int(*value),
        ExprKind::StringLiteral(text) => Value::from_obj_ptr(alloc_string(text)),
        ExprKind::VarRef(name) => match ctx.lookup_symbol(&name.name) {
            Some(slot) => unsafe { *slot },
            None => fatal(MysoreError::unknown_symbol(name.name.clone())),
        },
        ExprKind::BinOp { op, lhs, rhs } => {
            let lhs = evaluate(lhs, ctx);
            let rhs = evaluate(rhs, ctx);
            // Comparisons always work on the raw tagged words, even for
            // objects; arithmetic stays primitive only when both sides are
            // small integers and otherwise dispatches to a method on the
            // left-hand side.
            if op.is_comparison() || (lhs.is_int() && rhs.is_int()) {
                return Value::from_int(op.apply_ints(lhs.as_int(), rhs.as_int()));
            }
            let Some(method_name) = op.method_name() else {
                unreachable!("non-comparison operator without a method name");
            };
            if lhs.is_null() {
                fatal(unknown_selector_for(lhs, method_name));
            }
            let sel = selector::intern(method_name);
            publish_context(ctx);
            let Some(function) = (unsafe { compiled_method_for_selector(lhs, sel) }) else {
                fatal(unknown_selector_for(lhs, method_name));
            };
            unsafe { call_compiled_method(function, lhs, sel, &[rhs]) }
        }
        ExprKind::Call {
            callee,
            method,
            arguments,
        } => {
            let receiver = evaluate(callee, ctx);
            if arguments.len() > MAX_ARITY {
                fatal(MysoreError::internal(format!(
                    "call with {} arguments; the limit is {MAX_ARITY}",
                    arguments.len()
                )));
            }
            let mut args: SmallVec<[Value; MAX_ARITY]> = SmallVec::new();
            for arg in arguments {
                args.push(evaluate(arg, ctx));
            }
            publish_context(ctx);
            match method {
                // No method name: the callee must be a closure.
                None => {
                    if !receiver.is_object()
                        || !std::ptr::eq(
                            unsafe { receiver_class(receiver) },
                            mysore_runtime::builtins::closure_class(),
                        )
                    {
                        fatal(MysoreError::internal("called value is not a closure"));
                    }
                    let closure = receiver.as_obj_ptr::<Closure>();
                    let invoke = unsafe { (*closure).invoke };
                    unsafe { call_compiled_closure(invoke, closure, &args) }
                }
                Some(name) => {
                    if receiver.is_null() {
                        fatal(unknown_selector_for(receiver, &name.name));
                    }
                    let sel = selector::intern(&name.name);
                    let Some(function) = (unsafe { compiled_method_for_selector(receiver, sel) })
                    else {
                        fatal(unknown_selector_for(receiver, &name.name));
                    };
                    unsafe { call_compiled_method(function, receiver, sel, &args) }
                }
            }
        }
        ExprKind::New(class_name) => match lookup_class(&class_name.name) {
            Some(cls) => Value::from_obj_ptr(alloc_object(cls)),
            None => fatal(MysoreError::unknown_class(class_name.name.clone())),
        },
        ExprKind::Closure(decl) => evaluate_closure_decl(ctx, decl),
    }
}

fn unknown_selector_for(receiver: Value, method_name: &str) -> MysoreError {
    let class_name = if receiver.is_int() || receiver.is_object() {
        unsafe { receiver_class(receiver) }.name.clone()
    } else {
        "null".to_owned()
    };
    MysoreError::unknown_selector(class_name, method_name)
}

/// Interpret a class declaration: build the class, point each method at the
/// arity-matched trampoline, and register it in the class table.
fn interpret_class_decl(decl: &'static ClassDecl) {
    let superclass = match decl.superclass() {
        Some(name) => match lookup_class(name) {
            Some(cls) => Some(cls),
            None => fatal(MysoreError::unknown_class(name)),
        },
        None => None,
    };

    let mut methods = Vec::with_capacity(decl.methods.len());
    for m in &decl.methods {
        if m.arity() > MAX_ARITY {
            fatal(MysoreError::arity_overflow(m.name_or_anon(), m.arity()));
        }
        let sel = selector::intern(m.name_or_anon());
        methods.push(Method::new(
            sel,
            m.arity() as u32,
            method_trampoline(m.arity()),
            std::ptr::from_ref(m).cast(),
        ));
    }

    register_class(Class {
        name: decl.class_name().to_owned(),
        superclass,
        methods,
        ivar_names: decl.ivars.iter().map(|ivar| ivar.name.clone()).collect(),
    });
}
