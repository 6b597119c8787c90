//! Error types for MysoreScript.
//!
//! Syntax errors are ordinary recoverable `Result`s reported by the parser.
//! The runtime errors here (unknown class, unknown selector, unknown
//! symbol, arity overflow) are fatal: the language has no recoverable error
//! channel, so the evaluator raises them as panics carrying a `MysoreError`
//! payload and the driver catches them at the execution-unit boundary.

use crate::span::Span;
use thiserror::Error;

/// The result type used throughout MysoreScript.
pub type MysoreResult<T> = Result<T, MysoreError>;

/// Every error condition the interpreter distinguishes.
#[derive(Error, Debug, Clone)]
pub enum MysoreError {
    /// Lexical or syntactic failure; the batch is rejected.
    #[error("syntax error: {message}")]
    Syntax {
        /// Error description.
        message: String,
        /// Source location.
        span: Span,
    },

    /// `new` or superclass lookup named a class that was never declared.
    #[error("unknown class '{name}'")]
    UnknownClass {
        /// The missing class name.
        name: String,
    },

    /// Method dispatch failed to find the selector anywhere in the chain.
    #[error("'{class}' does not respond to '{name}'")]
    UnknownSelector {
        /// The receiver's class name.
        class: String,
        /// The method name the selector was interned from.
        name: String,
    },

    /// A variable reference named a symbol with no storage.
    #[error("unknown symbol '{name}'")]
    UnknownSymbol {
        /// The unresolved name.
        name: String,
    },

    /// A closure or method was declared with more than ten parameters.
    #[error("'{name}' declares {arity} parameters; the limit is 10")]
    ArityOverflow {
        /// The closure or method name.
        name: String,
        /// The declared parameter count.
        arity: usize,
    },

    /// A defect in the interpreter itself.
    #[error("internal error: {message}")]
    Internal {
        /// Error description.
        message: String,
    },
}

impl MysoreError {
    /// Create a syntax error with a location.
    #[must_use]
    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        Self::Syntax {
            message: message.into(),
            span,
        }
    }

    /// Create an unknown-class error.
    #[must_use]
    pub fn unknown_class(name: impl Into<String>) -> Self {
        Self::UnknownClass { name: name.into() }
    }

    /// Create an unknown-selector error.
    #[must_use]
    pub fn unknown_selector(class: impl Into<String>, name: impl Into<String>) -> Self {
        Self::UnknownSelector {
            class: class.into(),
            name: name.into(),
        }
    }

    /// Create an unknown-symbol error.
    #[must_use]
    pub fn unknown_symbol(name: impl Into<String>) -> Self {
        Self::UnknownSymbol { name: name.into() }
    }

    /// Create an arity-overflow error.
    #[must_use]
    pub fn arity_overflow(name: impl Into<String>, arity: usize) -> Self {
        Self::ArityOverflow {
            name: name.into(),
            arity,
        }
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// The span attached to this error, if any.
    #[must_use]
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Syntax { span, .. } => Some(*span),
            _ => None,
        }
    }
}
