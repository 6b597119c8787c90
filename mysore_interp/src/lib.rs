//! # MysoreScript Interpreter
//!
//! The tree-walking evaluator, the interpreter context, the arity-indexed
//! trampolines that bridge the compiled calling conventions back into the
//! evaluator, and the threshold-triggered tier-up machinery.
//!
//! Runtime failures (unknown class, unknown selector, unknown symbol,
//! arity overflow) have no recoverable channel in the language: they abort
//! the current execution unit. They are raised as panics carrying a
//! [`MysoreError`] payload; [`run_caught`] is the boundary that turns them
//! back into values for the driver.

#![warn(clippy::all)]

pub mod backend;
pub mod closure;
pub mod context;
pub mod eval;
pub mod trampoline;

pub use backend::Backend;
pub use closure::TIER_UP_THRESHOLD;
pub use context::{Context, SymbolTable};
pub use eval::{evaluate, interpret_statements};

use mysore_core::MysoreError;
use mysore_parser::ast::Statements;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Abort the current execution unit with a fatal runtime error.
pub(crate) fn fatal(err: MysoreError) -> ! {
    std::panic::panic_any(err)
}

/// Interpret a batch, catching fatal errors at the execution-unit boundary.
///
/// On an abort the context's transient state (local symbol stack, return
/// register) is discarded so the same context can keep serving a REPL;
/// globals and registered classes survive.
pub fn run_caught(ast: &'static Statements, ctx: &mut Context) -> Result<(), MysoreError> {
    match catch_unwind(AssertUnwindSafe(|| interpret_statements(ast, ctx))) {
        Ok(()) => Ok(()),
        Err(payload) => {
            ctx.reset_after_abort();
            Err(error_from_panic(payload))
        }
    }
}

fn error_from_panic(payload: Box<dyn std::any::Any + Send>) -> MysoreError {
    match payload.downcast::<MysoreError>() {
        Ok(err) => *err,
        Err(payload) => match payload.downcast::<String>() {
            Ok(msg) => MysoreError::internal(*msg),
            Err(payload) => match payload.downcast::<&str>() {
                Ok(msg) => MysoreError::internal(*msg),
                Err(_) => MysoreError::internal("execution aborted"),
            },
        },
    }
}
