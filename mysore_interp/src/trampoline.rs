//! Arity-indexed trampolines bridging the compiled calling conventions
//! back into the interpreter.
//!
//! A closure's `invoke` slot and a fresh method-table entry both point at
//! one of these until tier-up. Each trampoline gathers its register
//! arguments into an array, recovers the declaring AST node from its first
//! argument (the closure, or the located method), and re-enters the
//! evaluator through the published context pointer.
//!
//! The context pointer is thread-local and is written by every call site
//! before it dispatches; execution is single-threaded, so the pointer is
//! always the active context when a trampoline runs.

use crate::closure::{interpret_closure, interpret_method};
use crate::context::Context;
use crate::fatal;
use mysore_core::{selector, MysoreError, Selector, Value};
use mysore_runtime::{receiver_class, Closure, ClosureInvoke, CompiledMethod, MAX_ARITY};
use mysore_parser::ast::ClosureDecl;
use std::cell::Cell;
use std::mem::transmute;

thread_local! {
    /// The active interpreter context, published by call sites.
    static CURRENT_CONTEXT: Cell<*mut Context> = const { Cell::new(std::ptr::null_mut()) };
}

/// Publish `ctx` as the context trampolines re-enter with.
pub(crate) fn publish_context(ctx: &mut Context) {
    CURRENT_CONTEXT.with(|slot| slot.set(std::ptr::from_mut(ctx)));
}

fn current_context() -> *mut Context {
    let ptr = CURRENT_CONTEXT.with(Cell::get);
    assert!(!ptr.is_null(), "no interpreter context published");
    ptr
}

unsafe fn decl_of(closure: *mut Closure) -> &'static ClosureDecl {
    unsafe { &*(*closure).ast.cast::<ClosureDecl>() }
}

macro_rules! closure_trampoline_fn {
    ($name:ident) => {
        unsafe extern "C" fn $name(closure: *mut Closure) -> Value {
            let mut args: [Value; 0] = [];
            let ctx = unsafe { &mut *current_context() };
            let decl = unsafe { decl_of(closure) };
            interpret_closure(ctx, decl, closure, &mut args)
        }
    };
    ($name:ident, $($arg:ident),+) => {
        unsafe extern "C" fn $name(closure: *mut Closure, $($arg: Value),+) -> Value {
            let mut args = [$($arg),+];
            let ctx = unsafe { &mut *current_context() };
            let decl = unsafe { decl_of(closure) };
            interpret_closure(ctx, decl, closure, &mut args)
        }
    };
}

closure_trampoline_fn!(closure_trampoline0);
closure_trampoline_fn!(closure_trampoline1, a0);
closure_trampoline_fn!(closure_trampoline2, a0, a1);
closure_trampoline_fn!(closure_trampoline3, a0, a1, a2);
closure_trampoline_fn!(closure_trampoline4, a0, a1, a2, a3);
closure_trampoline_fn!(closure_trampoline5, a0, a1, a2, a3, a4);
closure_trampoline_fn!(closure_trampoline6, a0, a1, a2, a3, a4, a5);
closure_trampoline_fn!(closure_trampoline7, a0, a1, a2, a3, a4, a5, a6);
closure_trampoline_fn!(closure_trampoline8, a0, a1, a2, a3, a4, a5, a6, a7);
closure_trampoline_fn!(closure_trampoline9, a0, a1, a2, a3, a4, a5, a6, a7, a8);
closure_trampoline_fn!(closure_trampoline10, a0, a1, a2, a3, a4, a5, a6, a7, a8, a9);

macro_rules! method_trampoline_fn {
    ($name:ident) => {
        unsafe extern "C" fn $name(this: Value, cmd: Selector) -> Value {
            let mut args: [Value; 0] = [];
            method_trampoline_body(this, cmd, &mut args)
        }
    };
    ($name:ident, $($arg:ident),+) => {
        unsafe extern "C" fn $name(this: Value, cmd: Selector, $($arg: Value),+) -> Value {
            let mut args = [$($arg),+];
            method_trampoline_body(this, cmd, &mut args)
        }
    };
}

/// Shared tail of every method trampoline: re-locate the method from the
/// receiver and selector, then re-enter the interpreter.
fn method_trampoline_body(this: Value, cmd: Selector, args: &mut [Value]) -> Value {
    let ctx = unsafe { &mut *current_context() };
    let cls = unsafe { receiver_class(this) };
    let Some(method) = cls.method_for_selector(cmd) else {
        fatal(MysoreError::unknown_selector(
            cls.name.clone(),
            selector::name_of(cmd).unwrap_or_default(),
        ));
    };
    interpret_method(ctx, method, this, cmd, args)
}

method_trampoline_fn!(method_trampoline0);
method_trampoline_fn!(method_trampoline1, a0);
method_trampoline_fn!(method_trampoline2, a0, a1);
method_trampoline_fn!(method_trampoline3, a0, a1, a2);
method_trampoline_fn!(method_trampoline4, a0, a1, a2, a3);
method_trampoline_fn!(method_trampoline5, a0, a1, a2, a3, a4);
method_trampoline_fn!(method_trampoline6, a0, a1, a2, a3, a4, a5);
method_trampoline_fn!(method_trampoline7, a0, a1, a2, a3, a4, a5, a6);
method_trampoline_fn!(method_trampoline8, a0, a1, a2, a3, a4, a5, a6, a7);
method_trampoline_fn!(method_trampoline9, a0, a1, a2, a3, a4, a5, a6, a7, a8);
method_trampoline_fn!(method_trampoline10, a0, a1, a2, a3, a4, a5, a6, a7, a8, a9);

type V = Value;
type C = *mut Closure;
type S = Selector;

/// The closure trampoline for a given arity, type-erased for storage in a
/// closure's `invoke` slot.
pub fn closure_trampoline(arity: usize) -> ClosureInvoke {
    unsafe {
        match arity {
            0 => closure_trampoline0,
            1 => transmute(closure_trampoline1 as unsafe extern "C" fn(C, V) -> V),
            2 => transmute(closure_trampoline2 as unsafe extern "C" fn(C, V, V) -> V),
            3 => transmute(closure_trampoline3 as unsafe extern "C" fn(C, V, V, V) -> V),
            4 => transmute(closure_trampoline4 as unsafe extern "C" fn(C, V, V, V, V) -> V),
            5 => transmute(closure_trampoline5 as unsafe extern "C" fn(C, V, V, V, V, V) -> V),
            6 => transmute(closure_trampoline6 as unsafe extern "C" fn(C, V, V, V, V, V, V) -> V),
            7 => transmute(
                closure_trampoline7 as unsafe extern "C" fn(C, V, V, V, V, V, V, V) -> V,
            ),
            8 => transmute(
                closure_trampoline8 as unsafe extern "C" fn(C, V, V, V, V, V, V, V, V) -> V,
            ),
            9 => transmute(
                closure_trampoline9 as unsafe extern "C" fn(C, V, V, V, V, V, V, V, V, V) -> V,
            ),
            10 => transmute(
                closure_trampoline10 as unsafe extern "C" fn(C, V, V, V, V, V, V, V, V, V, V) -> V,
            ),
            _ => unreachable!("closure arity above {MAX_ARITY}"),
        }
    }
}

/// The method trampoline for a given arity, type-erased for storage in a
/// method table.
pub fn method_trampoline(arity: usize) -> CompiledMethod {
    unsafe {
        match arity {
            0 => method_trampoline0,
            1 => transmute(method_trampoline1 as unsafe extern "C" fn(V, S, V) -> V),
            2 => transmute(method_trampoline2 as unsafe extern "C" fn(V, S, V, V) -> V),
            3 => transmute(method_trampoline3 as unsafe extern "C" fn(V, S, V, V, V) -> V),
            4 => transmute(method_trampoline4 as unsafe extern "C" fn(V, S, V, V, V, V) -> V),
            5 => transmute(method_trampoline5 as unsafe extern "C" fn(V, S, V, V, V, V, V) -> V),
            6 => transmute(
                method_trampoline6 as unsafe extern "C" fn(V, S, V, V, V, V, V, V) -> V,
            ),
            7 => transmute(
                method_trampoline7 as unsafe extern "C" fn(V, S, V, V, V, V, V, V, V) -> V,
            ),
            8 => transmute(
                method_trampoline8 as unsafe extern "C" fn(V, S, V, V, V, V, V, V, V, V) -> V,
            ),
            9 => transmute(
                method_trampoline9 as unsafe extern "C" fn(V, S, V, V, V, V, V, V, V, V, V) -> V,
            ),
            10 => transmute(
                method_trampoline10
                    as unsafe extern "C" fn(V, S, V, V, V, V, V, V, V, V, V, V) -> V,
            ),
            _ => unreachable!("method arity above {MAX_ARITY}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trampolines_are_distinct_per_arity() {
        let mut seen = Vec::new();
        for arity in 0..=MAX_ARITY {
            let f = closure_trampoline(arity) as usize;
            assert!(!seen.contains(&f));
            seen.push(f);
        }
    }

    #[test]
    fn test_method_trampolines_are_distinct_per_arity() {
        let mut seen = Vec::new();
        for arity in 0..=MAX_ARITY {
            let f = method_trampoline(arity) as usize;
            assert!(!seen.contains(&f));
            seen.push(f);
        }
    }

    #[test]
    #[should_panic(expected = "arity above")]
    fn test_arity_over_limit_panics() {
        let _ = closure_trampoline(11);
    }
}
