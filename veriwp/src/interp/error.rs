//! Runtime errors for the interpreter

use std::fmt;

/// Runtime error during interpretation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Kinds of runtime errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UndefinedVariable,
    UndefinedFunction,
    TypeError,
    DivisionByZero,
    /// i64 overflow; the verifier reasons over unbounded integers
    Overflow,
    AssertionFailed,
    IndexOutOfBounds,
    /// Havoc, quantifiers and negative slice steps have no execution
    NotExecutable,
    /// A loop ran longer than the interpreter's iteration budget
    LoopLimit,
}

impl RuntimeError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        RuntimeError {
            kind,
            message: message.into(),
        }
    }

    pub fn undefined_variable(name: &str) -> Self {
        Self::new(ErrorKind::UndefinedVariable, format!("undefined variable: {name}"))
    }

    pub fn undefined_function(name: &str) -> Self {
        Self::new(ErrorKind::UndefinedFunction, format!("undefined function: {name}"))
    }

    pub fn type_error(expected: &str, got: &str) -> Self {
        Self::new(
            ErrorKind::TypeError,
            format!("type error: expected {expected}, got {got}"),
        )
    }

    pub fn division_by_zero() -> Self {
        Self::new(ErrorKind::DivisionByZero, "division by zero")
    }

    pub fn overflow(op: &str) -> Self {
        Self::new(ErrorKind::Overflow, format!("integer overflow in `{op}`"))
    }

    pub fn assertion_failed(cond: &str) -> Self {
        Self::new(ErrorKind::AssertionFailed, format!("assertion failed: {cond}"))
    }

    pub fn index_out_of_bounds(index: i64, len: usize) -> Self {
        Self::new(
            ErrorKind::IndexOutOfBounds,
            format!("index {index} out of bounds for length {len}"),
        )
    }

    pub fn not_executable(what: &str) -> Self {
        Self::new(ErrorKind::NotExecutable, format!("cannot execute {what}"))
    }

    pub fn loop_limit(limit: usize) -> Self {
        Self::new(
            ErrorKind::LoopLimit,
            format!("loop did not finish within {limit} iterations"),
        )
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Runtime error: {}", self.message)
    }
}

impl std::error::Error for RuntimeError {}

/// Result type for interpreter operations
pub type InterpResult<T> = Result<T, RuntimeError>;
