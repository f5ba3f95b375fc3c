//! Checking session of a single function
//!
//! A session runs the whole pipeline for one function: contract parsing,
//! translation, type checking, obligation generation and discharge. It owns
//! its fresh-name generator, so running it twice on the same function yields
//! the same obligations.

use tracing::{debug, info, trace};

use crate::ast::{Expr, FreshNames, Stmt, Type};
use crate::error::{Result, VerifyError};
use crate::parser::parse_assertion;
use crate::smt::{declarations, Encoder, SatResult, Solver};
use crate::source::SourceFunction;
use crate::translate::translate_function;
use crate::types::{TypeChecker, TypeEnv};
use crate::wp::{generate_obligations, Obligation};

/// Pipeline state of one function
pub struct FunctionSession<'f> {
    function: &'f SourceFunction,
    fresh: FreshNames,
    env: TypeEnv,
    ir: Option<Stmt>,
    obligations: Vec<Obligation>,
    dump_smt: bool,
}

impl<'f> FunctionSession<'f> {
    pub fn new(function: &'f SourceFunction) -> Self {
        Self {
            function,
            fresh: FreshNames::new(),
            env: TypeEnv::new(),
            ir: None,
            obligations: Vec::new(),
            dump_smt: false,
        }
    }

    /// Log every encoded obligation at debug level
    pub fn with_dump_smt(mut self, dump: bool) -> Self {
        self.dump_smt = dump;
        self
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }

    /// Desugared IR of the body, once prepared
    pub fn ir(&self) -> Option<&Stmt> {
        self.ir.as_ref()
    }

    pub fn env(&self) -> &TypeEnv {
        &self.env
    }

    pub fn obligations(&self) -> &[Obligation] {
        &self.obligations
    }

    fn parse_contract(&mut self, clauses: &[crate::ast::Spanned<String>]) -> Result<Vec<Expr>> {
        clauses
            .iter()
            .map(|c| parse_assertion(&c.node, &mut self.fresh).map_err(|e| e.offset(c.span.start)))
            .collect()
    }

    /// Everything up to the obligations; no solver is involved
    pub fn prepare(&mut self, builtins: &[String]) -> Result<&[Obligation]> {
        let function = self.function;
        if function.ret_ty.is_none() {
            return Err(VerifyError::MissingReturnType {
                function: function.name.clone(),
                span: Some(function.span),
            });
        }

        let mut requires = self.parse_contract(&function.requires)?;
        let mut ensures = self.parse_contract(&function.ensures)?;
        let mut ir = translate_function(&function.body, builtins, &mut self.fresh)?;
        debug!(function = %function.name, "translated IR:\n{ir}");

        let mut checker = TypeChecker::new();
        for (name, ty) in &function.params {
            checker.declare(name.clone(), ty.clone().unwrap_or(Type::Any));
        }
        checker
            .check_function(&mut requires, &mut ir, &mut ensures)
            .map_err(|e| e.or_span(function.span))?;
        self.env = checker.into_env();
        debug!(function = %function.name, env = ?self.env, "resolved types");

        self.obligations =
            generate_obligations(&requires, &ensures, &ir, &self.env, &mut self.fresh)?;
        self.ir = Some(ir);
        Ok(&self.obligations)
    }

    /// Check every obligation against `solver`, one push/check/pop each.
    ///
    /// Returns the number of obligations proven. The solver is dropped when
    /// the session is done with it.
    pub fn discharge<S: Solver>(&self, mut solver: S) -> Result<usize> {
        let name = &self.function.name;
        let mut encoder = Encoder::new(&self.env);
        let terms = self
            .obligations
            .iter()
            .map(|o| encoder.encode(&o.formula))
            .collect::<Result<Vec<_>>>()?;

        let formulas: Vec<&Expr> = self.obligations.iter().map(|o| &o.formula).collect();
        for decl in declarations(&self.env, &formulas)? {
            solver.declare(&decl)?;
        }

        for (obligation, term) in self.obligations.iter().zip(&terms) {
            if self.dump_smt {
                debug!(function = %name, kind = %obligation.kind, "(assert (not {term}))");
            }
            solver.push()?;
            solver.add(&format!("(not {term})"))?;
            let result = solver.check()?;
            trace!(function = %name, kind = %obligation.kind, ?result, "checked obligation");
            match result {
                SatResult::Unsat => solver.pop()?,
                SatResult::Sat => {
                    let model = solver.model()?;
                    solver.pop()?;
                    return Err(VerifyError::Violated {
                        function: name.clone(),
                        kind: obligation.kind,
                        obligation: obligation.formula.to_string(),
                        model,
                    });
                }
                SatResult::Unknown(reason) => {
                    solver.pop()?;
                    return Err(VerifyError::SolverUnknown {
                        function: name.clone(),
                        obligation: obligation.formula.to_string(),
                        reason,
                    });
                }
            }
        }

        info!(function = %name, obligations = terms.len(), "verified");
        Ok(terms.len())
    }
}
