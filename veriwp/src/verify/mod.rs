//! Function verification
//!
//! - `session`: the pipeline for one function, from contract text to solver verdict
//! - `run`: scopes, run modes and reports

mod run;
mod session;

pub use run::{FunctionReport, FunctionStatus, RunMode, RunReport, SolverFactory, VerificationRun};
pub use session::FunctionSession;
