//! Knight - a tree-walking interpreter for the Knight expression language
//!
//! Knight programs are single expressions written in prefix form: every
//! construct is a literal, a global variable, or a function application
//! whose arity is fixed by its opcode. Parentheses and `:` are whitespace.
//!
//! ```text
//! ; = n 10
//! ; = sum 0
//! ; WHILE n
//!     ; = sum + sum n
//!       = n - n 1
//! OUTPUT sum
//! ```
//!
//! Keyword opcodes may be spelled as any run of uppercase letters starting
//! with the distinguishing one: `OUTPUT`, `OUT` and `O` are the same
//! function, and `T`, `TRU`, `TRUE` are all the true literal.
//!
//! ## Modules
//!
//! - `parser`: source text to value tree
//! - `ast`: the polymorphic value model and its coercions
//! - `builtinops`: the opcode registry with all built-in operations
//! - `evaluator`: variable interning and tree evaluation

use std::fmt;

/// Categorizes the different kinds of parsing errors.
#[derive(Debug, PartialEq, Clone)]
pub enum ParseErrorKind {
    /// Nothing but whitespace and comments before end of input
    EmptyProgram,
    /// Input ended where a function still required an argument
    MissingArgument,
    /// String literal with no closing delimiter
    UnterminatedString,
    /// Opcode character with no registered function
    UnknownFunction,
    /// Leading character not recognized by any parse rule
    InvalidSyntax,
    /// Implementation-imposed limit exceeded (integer literal overflow)
    ImplementationLimit,
}

/// A structured error providing detailed information about a parsing failure.
#[derive(Debug, PartialEq, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    /// Context snippet from the source showing where the error occurred (max 100 chars)
    pub context: Option<String>,
    /// The problematic token or character encountered, if identifiable
    pub found: Option<String>,
}

impl ParseError {
    /// Create a ParseError with all fields
    pub fn new(
        kind: ParseErrorKind,
        message: impl Into<String>,
        context: Option<String>,
        found: Option<String>,
    ) -> Self {
        ParseError {
            kind,
            message: message.into(),
            context,
            found,
        }
    }

    /// Create a simple ParseError with a kind and message but no context
    pub fn from_message(kind: ParseErrorKind, message: impl Into<String>) -> Self {
        Self::new(kind, message, None, None)
    }

    /// Create a ParseError with context extracted from the source at a given offset
    pub fn with_context(
        kind: ParseErrorKind,
        message: impl Into<String>,
        source: &str,
        error_offset: usize,
    ) -> Self {
        Self::with_context_and_found(kind, message, source, error_offset, None)
    }

    /// Create a ParseError with context and found token
    pub fn with_context_and_found(
        kind: ParseErrorKind,
        message: impl Into<String>,
        source: &str,
        error_offset: usize,
        found: Option<String>,
    ) -> Self {
        const MAX_CONTEXT: usize = 100;

        // Show some context before the error position as well
        let context_start = error_offset.saturating_sub(20);

        let context_str: String = source
            .chars()
            .skip(context_start)
            .take(MAX_CONTEXT)
            .collect();

        let mut display_context = String::new();
        if context_start > 0 {
            display_context.push_str("[...]");
        }
        display_context.push_str(&context_str);
        if context_start + context_str.len() < source.len() {
            display_context.push_str("[...]");
        }

        // Newlines are legal inside Knight string literals; keep the snippet on one line
        let display_context = display_context.replace('\n', "\\n").replace('\r', "");

        Self::new(kind, message, Some(display_context), found)
    }
}

/// Error types for the interpreter. Every error is fatal: the language has
/// no recovery primitive, so the first failure aborts the whole program.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    ParseError(ParseError),
    /// A variable was read before any `=` assigned it
    UnboundVariable(String),
    /// An operation was invoked on a value kind that does not support it
    TypeError(String),
    /// Division or modulo by zero, head/tail of empty, negative counts,
    /// integer overflow
    DomainError(String),
    /// A write to stdout or a child process failed (end of input on reads
    /// is not an error; `PROMPT` returns null instead)
    IoError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ParseError(e) => {
                write!(f, "ParseError: {}", e.message)?;
                if let Some(found) = &e.found {
                    write!(f, "\nFound: {found}")?;
                }
                if let Some(context) = &e.context {
                    write!(f, "\nContext: {context}")?;
                }
                Ok(())
            }
            Error::UnboundVariable(name) => write!(f, "Unbound variable: {name}"),
            Error::TypeError(msg) => write!(f, "Type error: {msg}"),
            Error::DomainError(msg) => write!(f, "Domain error: {msg}"),
            Error::IoError(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

pub mod ast;
pub mod builtinops;
pub mod evaluator;
pub mod parser;

use ast::Value;
use evaluator::Environment;

/// Parse a complete Knight program and evaluate it.
///
/// The program is a single expression; any text after it is ignored. The
/// environment persists across calls, which is what `EVAL` and interactive
/// use rely on.
pub fn run(source: &str, env: &mut Environment) -> Result<Value, Error> {
    let program = parser::parse_program(source, env)?;
    evaluator::eval(&program, env)
}
