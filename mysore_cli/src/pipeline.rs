//! Batch execution: parse, retain the AST, interpret.

use crate::args::{EXIT_NOINPUT, EXIT_RUNTIME, EXIT_SUCCESS, EXIT_SYNTAX};
use mysore_core::{span, MysoreError};
use mysore_interp::{run_caught, Context};
use mysore_parser::ast::Statements;
use mysore_parser::parse;
use std::path::Path;
use std::time::Instant;

/// Log elapsed time since `start` to stderr when timing is enabled.
pub fn log_time_since(enabled: bool, start: Instant, what: &str) {
    if enabled {
        eprintln!("{what} took {:.6} seconds.", start.elapsed().as_secs_f64());
    }
}

/// The result of executing one source batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// The batch parsed and ran to completion.
    Completed,
    /// The batch was rejected by the parser; nothing ran.
    SyntaxError,
    /// A fatal runtime error aborted the batch.
    RuntimeError,
}

impl BatchOutcome {
    /// The process exit code this outcome maps to.
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Completed => EXIT_SUCCESS,
            Self::SyntaxError => EXIT_SYNTAX,
            Self::RuntimeError => EXIT_RUNTIME,
        }
    }
}

/// Parse and interpret one batch against `ctx`.
///
/// The parsed AST is intentionally leaked: methods and closures hold
/// references into it for the life of the process, and in REPL mode later
/// batches may call into anything parsed earlier.
pub fn run_batch(source: &str, ctx: &mut Context, timing: bool) -> BatchOutcome {
    let start = Instant::now();
    let ast: &'static Statements = match parse(source) {
        Ok(ast) => Box::leak(Box::new(ast)),
        Err(err) => {
            report_syntax_error(&err, source);
            return BatchOutcome::SyntaxError;
        }
    };
    log_time_since(timing, start, "Parsing program");

    let start = Instant::now();
    let result = run_caught(ast, ctx);
    log_time_since(timing, start, "Executing program");

    match result {
        Ok(()) => BatchOutcome::Completed,
        Err(err) => {
            eprintln!("error: {err}");
            BatchOutcome::RuntimeError
        }
    }
}

/// Load and execute a file, returning the process exit code.
pub fn run_file(path: &Path, ctx: &mut Context, timing: bool) -> u8 {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("mysorescript: cannot read '{}': {err}", path.display());
            return EXIT_NOINPUT;
        }
    };
    run_batch(&source, ctx, timing).exit_code()
}

fn report_syntax_error(err: &MysoreError, source: &str) {
    match err.span() {
        Some(sp) => {
            let (line, col) = span::line_col(source, sp.start);
            eprintln!("line {line}, col {col}: {err}");
        }
        None => eprintln!("{err}"),
    }
}
