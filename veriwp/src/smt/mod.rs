//! SMT-LIB encoding and solver drivers

mod encode;
mod model;
mod solver;
mod z3;

pub use encode::{declarations, len_function, preamble, symbol, Encoder, SmtSort, SYMBOL_PREFIX};
pub use model::Model;
pub use solver::{Declaration, SatResult, Solver, SolverError};
pub use z3::Z3Process;
