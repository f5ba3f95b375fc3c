//! veriwp verifier library
//!
//! Checks `@verify`-annotated functions of a Python-subset host file against
//! their `requires`/`ensures` contracts by weakest-precondition calculus and Z3.

pub mod ast;
pub mod config;
pub mod error;
pub mod interp;
pub mod lexer;
pub mod parser;
pub mod smt;
pub mod source;
pub mod translate;
pub mod types;
pub mod util;
pub mod verify;
pub mod wp;

pub use ast::Span;
pub use error::{Result, VerifyError};

/// Stack growth parameters for deep expression trees
pub const STACK_RED_ZONE: usize = 128 * 1024; // 128KB remaining triggers growth
pub const STACK_GROW_SIZE: usize = 4 * 1024 * 1024; // Grow by 4MB each time
