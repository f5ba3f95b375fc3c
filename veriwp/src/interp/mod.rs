//! Reference interpreter for the IR
//!
//! Runs IR over concrete values. Loops execute directly and
//! check their invariants on every iteration; `Havoc` and quantifiers have
//! no concrete meaning and are rejected. Tests use it to cross-check the WP
//! engine against actual executions.

mod env;
mod error;
mod eval;
mod value;

pub use env::Environment;
pub use error::{ErrorKind, InterpResult, RuntimeError};
pub use eval::{floor_div, floor_mod, Interpreter, Outcome, DEFAULT_LOOP_LIMIT};
pub use value::Value;
