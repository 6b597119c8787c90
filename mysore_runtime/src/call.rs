//! Calling conventions, and the only code paths that cross the
//! interpreter/compiled boundary.
//!
//! Two conventions exist:
//!
//! - **Closure invoke**: `(closure, arg0, …, argN-1) -> value`
//! - **Method invoke**: `(self, selector, arg0, …, argN-1) -> value`
//!
//! Entry points are stored type-erased as their zero-argument shape; a call
//! site materializes the arity-specific function-pointer type and performs
//! the call. Arities run from 0 to [`MAX_ARITY`]; declarations beyond that
//! are rejected when the closure or class is constructed.

use crate::object::Closure;
use mysore_core::{Selector, Value};
use std::mem::transmute;

/// Maximum number of parameters a closure or method may declare.
pub const MAX_ARITY: usize = 10;

/// Entry point of a closure, stored in its `invoke` slot.
///
/// The true signature takes the closure's declared parameter count of
/// trailing `Value` arguments; only [`call_compiled_closure`] may call
/// through this type.
pub type ClosureInvoke = unsafe extern "C" fn(*mut Closure) -> Value;

/// Entry point of a method, stored in its class's method table.
///
/// The true signature takes the method's declared argument count of
/// trailing `Value` arguments; only [`call_compiled_method`] may call
/// through this type.
pub type CompiledMethod = unsafe extern "C" fn(Value, Selector) -> Value;

/// Invoke a closure entry point with the closure calling convention.
///
/// # Safety
///
/// `f` must be an entry point honouring the closure convention for exactly
/// `args.len()` arguments, and `closure` must point at a live closure
/// object.
pub unsafe fn call_compiled_closure(f: ClosureInvoke, closure: *mut Closure, args: &[Value]) -> Value {
    type V = Value;
    type C = *mut Closure;
    unsafe {
        match *args {
            [] => f(closure),
            [a0] => transmute::<_, unsafe extern "C" fn(C, V) -> V>(f)(closure, a0),
            [a0, a1] => transmute::<_, unsafe extern "C" fn(C, V, V) -> V>(f)(closure, a0, a1),
            [a0, a1, a2] => {
                transmute::<_, unsafe extern "C" fn(C, V, V, V) -> V>(f)(closure, a0, a1, a2)
            }
            [a0, a1, a2, a3] => {
                transmute::<_, unsafe extern "C" fn(C, V, V, V, V) -> V>(f)(closure, a0, a1, a2, a3)
            }
            [a0, a1, a2, a3, a4] => transmute::<_, unsafe extern "C" fn(C, V, V, V, V, V) -> V>(f)(
                closure, a0, a1, a2, a3, a4,
            ),
            [a0, a1, a2, a3, a4, a5] => {
                transmute::<_, unsafe extern "C" fn(C, V, V, V, V, V, V) -> V>(f)(
                    closure, a0, a1, a2, a3, a4, a5,
                )
            }
            [a0, a1, a2, a3, a4, a5, a6] => {
                transmute::<_, unsafe extern "C" fn(C, V, V, V, V, V, V, V) -> V>(f)(
                    closure, a0, a1, a2, a3, a4, a5, a6,
                )
            }
            [a0, a1, a2, a3, a4, a5, a6, a7] => {
                transmute::<_, unsafe extern "C" fn(C, V, V, V, V, V, V, V, V) -> V>(f)(
                    closure, a0, a1, a2, a3, a4, a5, a6, a7,
                )
            }
            [a0, a1, a2, a3, a4, a5, a6, a7, a8] => {
                transmute::<_, unsafe extern "C" fn(C, V, V, V, V, V, V, V, V, V) -> V>(f)(
                    closure, a0, a1, a2, a3, a4, a5, a6, a7, a8,
                )
            }
            [a0, a1, a2, a3, a4, a5, a6, a7, a8, a9] => {
                transmute::<_, unsafe extern "C" fn(C, V, V, V, V, V, V, V, V, V, V) -> V>(f)(
                    closure, a0, a1, a2, a3, a4, a5, a6, a7, a8, a9,
                )
            }
            _ => unreachable!("closure arity above MAX_ARITY"),
        }
    }
}

/// Invoke a method entry point with the method calling convention.
///
/// # Safety
///
/// `f` must be an entry point honouring the method convention for exactly
/// `args.len()` arguments, and `receiver` must be a value `f` accepts as
/// `self`.
pub unsafe fn call_compiled_method(
    f: CompiledMethod,
    receiver: Value,
    sel: Selector,
    args: &[Value],
) -> Value {
    type V = Value;
    type S = Selector;
    unsafe {
        match *args {
            [] => f(receiver, sel),
            [a0] => transmute::<_, unsafe extern "C" fn(V, S, V) -> V>(f)(receiver, sel, a0),
            [a0, a1] => {
                transmute::<_, unsafe extern "C" fn(V, S, V, V) -> V>(f)(receiver, sel, a0, a1)
            }
            [a0, a1, a2] => transmute::<_, unsafe extern "C" fn(V, S, V, V, V) -> V>(f)(
                receiver, sel, a0, a1, a2,
            ),
            [a0, a1, a2, a3] => transmute::<_, unsafe extern "C" fn(V, S, V, V, V, V) -> V>(f)(
                receiver, sel, a0, a1, a2, a3,
            ),
            [a0, a1, a2, a3, a4] => {
                transmute::<_, unsafe extern "C" fn(V, S, V, V, V, V, V) -> V>(f)(
                    receiver, sel, a0, a1, a2, a3, a4,
                )
            }
            [a0, a1, a2, a3, a4, a5] => {
                transmute::<_, unsafe extern "C" fn(V, S, V, V, V, V, V, V) -> V>(f)(
                    receiver, sel, a0, a1, a2, a3, a4, a5,
                )
            }
            [a0, a1, a2, a3, a4, a5, a6] => {
                transmute::<_, unsafe extern "C" fn(V, S, V, V, V, V, V, V, V) -> V>(f)(
                    receiver, sel, a0, a1, a2, a3, a4, a5, a6,
                )
            }
            [a0, a1, a2, a3, a4, a5, a6, a7] => {
                transmute::<_, unsafe extern "C" fn(V, S, V, V, V, V, V, V, V, V) -> V>(f)(
                    receiver, sel, a0, a1, a2, a3, a4, a5, a6, a7,
                )
            }
            [a0, a1, a2, a3, a4, a5, a6, a7, a8] => {
                transmute::<_, unsafe extern "C" fn(V, S, V, V, V, V, V, V, V, V, V) -> V>(f)(
                    receiver, sel, a0, a1, a2, a3, a4, a5, a6, a7, a8,
                )
            }
            [a0, a1, a2, a3, a4, a5, a6, a7, a8, a9] => {
                transmute::<_, unsafe extern "C" fn(V, S, V, V, V, V, V, V, V, V, V, V) -> V>(f)(
                    receiver, sel, a0, a1, a2, a3, a4, a5, a6, a7, a8, a9,
                )
            }
            _ => unreachable!("method arity above MAX_ARITY"),
        }
    }
}
