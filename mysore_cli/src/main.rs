//! MysoreScript — a small dynamically-typed, class-based scripting
//! language with a tree-walking interpreter and threshold-triggered
//! tier-up.
//!
//! Command-line driver: executes a file, runs a REPL, or both, against one
//! persistent interpreter context.

mod args;
mod pipeline;
mod repl;

use args::{EXIT_SUCCESS, EXIT_USAGE};
use mysore_core::MysoreError;
use mysore_interp::Context;
use mysore_runtime::gc;
use std::process::ExitCode;
use std::time::Instant;

fn main() -> ExitCode {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let parsed = match args::parse_args(&argv) {
        Ok(parsed) => parsed,
        Err(message) => {
            eprintln!("mysorescript: {message}");
            eprintln!("{}", args::usage("mysorescript"));
            return ExitCode::from(EXIT_USAGE);
        }
    };

    if parsed.help || (parsed.file.is_none() && !parsed.repl) {
        println!("{}", args::usage("mysorescript"));
        return ExitCode::from(EXIT_SUCCESS);
    }

    // Fatal runtime errors travel as MysoreError panic payloads and are
    // reported at the batch boundary; keep the default hook quiet for them.
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if info.payload().downcast_ref::<MysoreError>().is_none() {
            default_hook(info);
        }
    }));

    let start = Instant::now();
    let mut ctx = Context::new();
    pipeline::log_time_since(parsed.timing, start, "Setup");

    let mut code = EXIT_SUCCESS;
    if let Some(file) = &parsed.file {
        code = pipeline::run_file(file, &mut ctx, parsed.timing);
        if code != EXIT_SUCCESS {
            return ExitCode::from(code);
        }
    }

    if parsed.repl {
        repl::run_repl(&mut ctx, parsed.timing);
    }

    if parsed.memstats {
        let stats = gc::stats();
        eprintln!("Allocated {} bytes during execution.", stats.total_allocated);
        eprintln!("GC heap size: {} bytes.", stats.heap_bytes + stats.root_bytes);
    }

    ExitCode::from(code)
}
