//! Command-line argument parsing.
//!
//! The flag set matches the original driver: `-h` help, `-i` REPL, `-m`
//! memory statistics on exit, `-t` timing, `-f FILE` execute a file. Flags
//! may be combined (`-it`).

use std::path::PathBuf;

/// Process exit codes (sysexits-style).
pub const EXIT_SUCCESS: u8 = 0;
/// Bad command line.
pub const EXIT_USAGE: u8 = 64;
/// The batch failed to parse.
pub const EXIT_SYNTAX: u8 = 65;
/// The input file could not be read.
pub const EXIT_NOINPUT: u8 = 66;
/// Execution hit a fatal runtime error.
pub const EXIT_RUNTIME: u8 = 70;

/// Parsed command-line options.
#[derive(Debug, Default)]
pub struct Args {
    /// Print usage and exit.
    pub help: bool,
    /// Enter REPL mode (after executing the file, if one was given).
    pub repl: bool,
    /// Report parse/execution timing to stderr.
    pub timing: bool,
    /// Report heap statistics on exit.
    pub memstats: bool,
    /// File to execute.
    pub file: Option<PathBuf>,
}

/// Parse the argument vector (without the program name).
pub fn parse_args(argv: &[String]) -> Result<Args, String> {
    let mut args = Args::default();
    let mut iter = argv.iter();
    while let Some(arg) = iter.next() {
        let Some(flags) = arg.strip_prefix('-') else {
            return Err(format!("unexpected argument '{arg}'"));
        };
        if flags.is_empty() {
            return Err("empty flag '-'".into());
        }
        let mut chars = flags.chars().peekable();
        while let Some(flag) = chars.next() {
            match flag {
                'h' => args.help = true,
                'i' => args.repl = true,
                't' => args.timing = true,
                'm' => args.memstats = true,
                'f' => {
                    // `-fFILE` or `-f FILE`.
                    let rest: String = chars.by_ref().collect();
                    let path = if rest.is_empty() {
                        iter.next()
                            .ok_or_else(|| "-f requires a file name".to_string())?
                            .clone()
                    } else {
                        rest
                    };
                    args.file = Some(PathBuf::from(path));
                }
                other => return Err(format!("unknown flag '-{other}'")),
            }
        }
    }
    Ok(args)
}

/// The usage message.
pub fn usage(program: &str) -> String {
    format!(
        "usage: {program} [-himt] [-f {{file name}}]\n\
         \x20-h          Display this help\n\
         \x20-i          Interpreter, enable REPL mode\n\
         \x20-m          Display memory usage stats on exit\n\
         \x20-t          Display timing information\n\
         \x20-f {{file}}   Load and execute file"
    )
}
