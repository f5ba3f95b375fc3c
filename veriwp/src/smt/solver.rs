//! Solver capability consumed by the verifier
//!
//! The discharge protocol only needs scoped assertions and a satisfiability
//! check, so any SMT-LIB speaking backend fits behind [`Solver`].

use thiserror::Error;

use super::encode::SmtSort;
use super::model::Model;

/// Result of `(check-sat)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SatResult {
    Sat,
    Unsat,
    /// Undecided, with the solver's reason
    Unknown(String),
}

/// Failures talking to the solver process (not verification outcomes)
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("failed to start solver `{path}`: {message}")]
    Spawn { path: String, message: String },

    #[error("solver I/O error: {0}")]
    Io(String),

    #[error("solver rejected `{command}`: {response}")]
    Rejected { command: String, response: String },

    #[error("unexpected solver output: {0}")]
    Unexpected(String),

    #[error("solver process exited")]
    Closed,
}

impl From<std::io::Error> for SolverError {
    fn from(err: std::io::Error) -> Self {
        SolverError::Io(err.to_string())
    }
}

/// Top-level SMT-LIB declaration sent before any obligation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    /// `(declare-const name sort)`
    Const { name: String, sort: SmtSort },
    /// `(declare-fun name (params) ret)`
    Fun {
        name: String,
        params: Vec<SmtSort>,
        ret: SmtSort,
    },
    /// `(define-fun name ((p sort) ...) ret body)`
    Define {
        name: String,
        params: Vec<(String, SmtSort)>,
        ret: SmtSort,
        body: String,
    },
    /// Background assertion that holds in every scope
    Axiom(String),
}

impl Declaration {
    pub fn to_smt(&self) -> String {
        match self {
            Declaration::Const { name, sort } => {
                format!("(declare-const {} {})", name, sort.to_smt())
            }
            Declaration::Fun { name, params, ret } => {
                let params: Vec<String> = params.iter().map(SmtSort::to_smt).collect();
                format!("(declare-fun {} ({}) {})", name, params.join(" "), ret.to_smt())
            }
            Declaration::Define {
                name,
                params,
                ret,
                body,
            } => {
                let params: Vec<String> = params
                    .iter()
                    .map(|(p, s)| format!("({} {})", p, s.to_smt()))
                    .collect();
                format!(
                    "(define-fun {} ({}) {} {})",
                    name,
                    params.join(" "),
                    ret.to_smt(),
                    body
                )
            }
            Declaration::Axiom(term) => format!("(assert {term})"),
        }
    }
}

/// Incremental solver context
pub trait Solver {
    fn declare(&mut self, decl: &Declaration) -> Result<(), SolverError>;
    fn push(&mut self) -> Result<(), SolverError>;
    fn pop(&mut self) -> Result<(), SolverError>;
    /// Assert an SMT-LIB term in the current scope
    fn add(&mut self, constraint: &str) -> Result<(), SolverError>;
    fn check(&mut self) -> Result<SatResult, SolverError>;
    /// Model of the last `Sat` check
    fn model(&mut self) -> Result<Model, SolverError>;
}

impl<S: Solver + ?Sized> Solver for Box<S> {
    fn declare(&mut self, decl: &Declaration) -> Result<(), SolverError> {
        (**self).declare(decl)
    }

    fn push(&mut self) -> Result<(), SolverError> {
        (**self).push()
    }

    fn pop(&mut self) -> Result<(), SolverError> {
        (**self).pop()
    }

    fn add(&mut self, constraint: &str) -> Result<(), SolverError> {
        (**self).add(constraint)
    }

    fn check(&mut self) -> Result<SatResult, SolverError> {
        (**self).check()
    }

    fn model(&mut self) -> Result<Model, SolverError> {
        (**self).model()
    }
}
