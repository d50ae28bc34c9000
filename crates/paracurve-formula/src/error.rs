//! Formula error types

use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur while compiling or evaluating a formula
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// The formula text does not match the grammar
    #[error("Parse error at position {position}: {message}")]
    Parse { message: String, position: usize },

    /// A name that is neither bound, a constant, nor a registered function
    #[error("Unknown identifier: '{0}'")]
    UnknownIdentifier(String),

    /// Division by zero or a math domain/range violation
    #[error("Domain error in {context}: {message}")]
    Domain { context: String, message: String },

    /// Wrong number of arguments
    #[error("Wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArityMismatch {
        function: String,
        expected: String,
        actual: usize,
    },

    /// The instruction stream did not reduce to exactly one value
    #[error("Malformed instruction stream: {0}")]
    MalformedProgram(String),
}

/// Coarse classification of a [`FormulaError`]
///
/// Callers use this to tell "the text does not parse" apart from "the text
/// parses but cannot be evaluated with these bindings".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Parse,
    UnknownIdentifier,
    Domain,
    ArityMismatch,
}

impl FormulaError {
    pub(crate) fn parse(message: impl Into<String>, position: usize) -> Self {
        FormulaError::Parse {
            message: message.into(),
            position,
        }
    }

    pub(crate) fn domain(context: impl Into<String>, message: impl Into<String>) -> Self {
        FormulaError::Domain {
            context: context.into(),
            message: message.into(),
        }
    }

    /// The error category
    pub fn kind(&self) -> ErrorKind {
        match self {
            FormulaError::Parse { .. } | FormulaError::MalformedProgram(_) => ErrorKind::Parse,
            FormulaError::UnknownIdentifier(_) => ErrorKind::UnknownIdentifier,
            FormulaError::Domain { .. } => ErrorKind::Domain,
            FormulaError::ArityMismatch { .. } => ErrorKind::ArityMismatch,
        }
    }

    /// Whether the formula text itself failed to compile
    pub fn is_parse_error(&self) -> bool {
        self.kind() == ErrorKind::Parse
    }
}
