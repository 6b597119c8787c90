//! # MysoreScript Core
//!
//! Foundational types shared across the MysoreScript interpreter:
//!
//! - **Values**: the tagged pointer-sized word carrying small integers
//!   inline and object pointers otherwise
//! - **Selectors**: interned small-integer method-name identities
//! - **Spans**: byte-offset source ranges for diagnostics
//! - **Errors**: the unified error type and result alias

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod selector;
pub mod span;
pub mod value;

pub use error::{MysoreError, MysoreResult};
pub use selector::Selector;
pub use span::Span;
pub use value::Value;

/// Interpreter version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
