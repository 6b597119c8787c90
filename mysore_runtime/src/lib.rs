//! # MysoreScript Runtime
//!
//! The object model and execution substrate: classes with per-class method
//! tables, heap objects with inline slot arrays, closures, strings, the
//! calling conventions bridging interpreted and compiled code, and the
//! interface the runtime demands of a garbage collector.

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]

pub mod builtins;
pub mod call;
pub mod class;
pub mod gc;
pub mod object;

pub use call::{call_compiled_closure, call_compiled_method, ClosureInvoke, CompiledMethod, MAX_ARITY};
pub use class::{
    compiled_method_for_selector, lookup_class, receiver_class, register_class, AstRef, Class,
    Method,
};
pub use object::{alloc_closure, alloc_object, alloc_string, Closure, Object, Str};
