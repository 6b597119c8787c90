//! The read-evaluate-print loop.
//!
//! One persistent context serves the whole session; every parsed batch is
//! retained because later input may call functions or methods declared
//! earlier. An empty line exits. A collection runs before each prompt.

use crate::pipeline::{log_time_since, run_batch};
use mysore_interp::Context;
use mysore_runtime::gc;
use std::io::{self, BufRead, Write};
use std::time::Instant;

/// Run the REPL until an empty line or end of input.
pub fn run_repl(ctx: &mut Context, timing: bool) {
    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut line = String::new();

    loop {
        let start = Instant::now();
        gc::collect();
        log_time_since(timing, start, "Garbage collection");

        print!("\nMysoreScript> ");
        if io::stdout().flush().is_err() {
            return;
        }

        line.clear();
        match reader.read_line(&mut line) {
            // EOF or an unreadable terminal ends the session.
            Ok(0) | Err(_) => {
                println!();
                return;
            }
            Ok(_) => {}
        }

        // An empty line exits REPL mode.
        if line.trim().is_empty() {
            return;
        }

        // Errors are reported by run_batch; the prompt always comes back.
        run_batch(&line, ctx, timing);
    }
}
