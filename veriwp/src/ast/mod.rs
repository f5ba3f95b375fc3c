//! Verification IR: expressions, statements and types

mod expr;
mod fresh;
mod span;
mod stmt;
mod types;

pub use expr::*;
pub use fresh::*;
pub use span::*;
pub use stmt::*;
pub use types::*;
