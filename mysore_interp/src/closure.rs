//! Closure construction, interpreted calls, and tier-up.
//!
//! Both call paths share the same shape: bump the declaration's execution
//! counter, hand the declaration to the backend when the counter reaches
//! the threshold, run compiled code if any exists, and otherwise push a
//! local symbol frame whose entries alias the caller's argument array and
//! the relevant object slots, then walk the body.

use crate::context::Context;
use crate::eval::interpret_statements;
use crate::fatal;
use crate::trampoline::closure_trampoline;
use mysore_core::{MysoreError, Selector, Value};
use mysore_parser::ast::ClosureDecl;
use mysore_runtime::{
    alloc_closure, call_compiled_closure, call_compiled_method, receiver_class, Closure,
    ClosureInvoke, CompiledMethod, Method, Object, MAX_ARITY,
};
use std::mem::transmute;

/// How many interpreted executions a declaration gets before the backend is
/// asked to compile it.
pub const TIER_UP_THRESHOLD: u32 = 10;

/// Evaluate a closure-declaration expression: allocate the closure object,
/// bind its name in the enclosing scope, and copy the captured values in.
///
/// Captures are by value at creation time; later assignments to the outer
/// variable do not affect a closure that already captured it.
pub fn evaluate_closure_decl(ctx: &mut Context, decl: &'static ClosureDecl) -> Value {
    decl.check();
    if decl.arity() > MAX_ARITY {
        fatal(MysoreError::arity_overflow(decl.name_or_anon(), decl.arity()));
    }

    // Closures minted from an already-compiled declaration are born
    // compiled; the rest start on the arity-matched trampoline.
    let invoke: ClosureInvoke = match decl.compiled_entry() {
        Some(entry) => unsafe { transmute::<*const (), ClosureInvoke>(entry) },
        None => closure_trampoline(decl.arity()),
    };

    let closure = alloc_closure(
        std::ptr::from_ref(decl).cast(),
        decl.arity(),
        decl.captured_count(),
        invoke,
    );
    let result = Value::from_obj_ptr(closure);

    if let Some(name) = &decl.name {
        ctx.set_symbol(&name.name, result);
    }
    for (i, var) in decl.captured().iter().enumerate() {
        let Some(slot) = ctx.lookup_symbol(var) else {
            fatal(MysoreError::unknown_symbol(var.clone()));
        };
        unsafe { *Closure::captured_slot(closure, i) = *slot };
    }
    result
}

/// Execute a closure call against its declaration.
///
/// `args` is the caller's argument array; parameter symbols alias directly
/// into it, so assignments to parameters write through to it.
pub fn interpret_closure(
    ctx: &mut Context,
    decl: &'static ClosureDecl,
    closure: *mut Closure,
    args: &mut [Value],
) -> Value {
    let count = decl.bump_execution_count();
    if count == TIER_UP_THRESHOLD {
        if let Some(backend) = ctx.backend() {
            // Only the globals go to the compiler: the captured variables
            // were copied into the closure object when it was created.
            if let Some(compiled) = backend.compile_closure(decl, ctx.global_symbols()) {
                unsafe { (*closure).invoke = compiled };
                decl.set_compiled_entry(compiled as *const ());
            }
        }
    }
    if let Some(entry) = decl.compiled_entry() {
        let compiled: ClosureInvoke = unsafe { transmute::<*const (), ClosureInvoke>(entry) };
        return unsafe { call_compiled_closure(compiled, closure, args) };
    }

    ctx.push_symbols();
    for (i, param) in decl.parameters.iter().enumerate() {
        ctx.bind_slot(&param.name, unsafe { args.as_mut_ptr().add(i) });
    }
    for (i, var) in decl.captured().iter().enumerate() {
        ctx.bind_slot(var, unsafe { Closure::captured_slot(closure, i) });
    }

    interpret_statements(&decl.body, ctx);

    let ret = ctx.take_return();
    ctx.pop_symbols();
    ret
}

/// Execute a method call against its declaration.
///
/// Beyond the closure path, the frame binds `self`, `cmd` and the
/// receiver's instance variables. On tier-up the compiled function replaces
/// the method-table entry, so every receiver of the class routes straight
/// to compiled code from its next call.
pub fn interpret_method(
    ctx: &mut Context,
    method: &'static Method,
    this: Value,
    cmd: Selector,
    args: &mut [Value],
) -> Value {
    let decl = unsafe { &*method.ast.cast::<ClosureDecl>() };
    decl.check();
    let cls = unsafe { receiver_class(this) };

    let count = decl.bump_execution_count();
    if count == TIER_UP_THRESHOLD {
        if let Some(backend) = ctx.backend() {
            if let Some(compiled) = backend.compile_method(decl, cls) {
                method.set_function(compiled);
                decl.set_compiled_entry(compiled as *const ());
            }
        }
    }
    if let Some(entry) = decl.compiled_entry() {
        let compiled: CompiledMethod = unsafe { transmute::<*const (), CompiledMethod>(entry) };
        return unsafe { call_compiled_method(compiled, this, cmd, args) };
    }

    ctx.push_symbols();
    for (i, param) in decl.parameters.iter().enumerate() {
        ctx.bind_slot(&param.name, unsafe { args.as_mut_ptr().add(i) });
    }

    // The receiver and selector get stack holders aliased into the frame;
    // the frame is popped before the holders die.
    let mut this_holder = this;
    let mut cmd_holder = Value::from_int(i64::from(cmd.raw()));
    ctx.bind_slot("self", &mut this_holder);
    ctx.bind_slot("cmd", &mut cmd_holder);

    // Instance variables alias slots inside the receiver. Small-integer
    // receivers have none.
    if this.is_object() {
        let obj = this.as_obj_ptr::<Object>();
        for (i, name) in cls.ivar_names.iter().enumerate() {
            ctx.bind_slot(name, unsafe { Object::ivar_slot(obj, i) });
        }
    }

    interpret_statements(&decl.body, ctx);

    let ret = ctx.take_return();
    ctx.pop_symbols();
    ret
}
