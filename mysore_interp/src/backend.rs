//! The contract a native-code backend satisfies.
//!
//! The interpreter does not require a backend to exist; without one the
//! execution counter still advances but tier-up never fires and everything
//! stays interpreted. A backend is asked to compile at most once per
//! declaration, exactly when the counter reaches the threshold.

use crate::context::SymbolTable;
use mysore_parser::ast::ClosureDecl;
use mysore_runtime::{Class, ClosureInvoke, CompiledMethod};

/// A native-code backend.
///
/// The produced functions accept and return tagged values and honour the
/// corresponding calling convention for the declaration's arity. Returning
/// `None` declines the request and leaves the declaration interpreted for
/// good.
pub trait Backend {
    /// Compile `decl` as a closure. `globals` maps global names to their
    /// slot addresses; captured variables are already copied into each
    /// closure object and need no symbol information.
    fn compile_closure(
        &self,
        decl: &'static ClosureDecl,
        globals: &SymbolTable,
    ) -> Option<ClosureInvoke>;

    /// Compile `decl` as a method of `class`.
    fn compile_method(
        &self,
        decl: &'static ClosureDecl,
        class: &'static Class,
    ) -> Option<CompiledMethod>;
}
