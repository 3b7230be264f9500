use thiserror::Error;

/// Typed errors produced while evaluating a program.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Undefined variable '{name}'")]
    UndefinedVariable { name: String },
    #[error("Undefined function '{name}'")]
    UndefinedFunction { name: String },
    #[error("Function '{name}' expected {expected} arguments, got {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Recursion limit of {limit} active calls exceeded")]
    RecursionLimitExceeded { limit: usize },
    #[error("Return outside of function")]
    ReturnOutsideFunction,
}
