//! Verification runs over the scopes of a host module

use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::VerifyConfig;
use crate::error::{Result, VerifyError};
use crate::smt::{Solver, SolverError, Z3Process};
use crate::source::{SourceFunction, SourceModule};

use super::session::FunctionSession;

/// What happens after a function fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunMode {
    /// The first failure ends the run as an error
    FailFast,
    /// Failures are recorded and the run continues
    Collect,
}

/// Final state of one function
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FunctionStatus {
    Verified,
    Violated,
    Unknown,
    /// Rejected before reaching the solver (parse, type, unsupported construct)
    Error,
}

/// Outcome of verifying one function
#[derive(Debug, Clone, Serialize)]
pub struct FunctionReport {
    pub name: String,
    pub scope: String,
    pub status: FunctionStatus,
    pub obligations_checked: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failing_obligation: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub counterexample: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub time_ms: u64,
}

impl FunctionReport {
    fn verified(name: &str, scope: &str, obligations_checked: usize, time_ms: u64) -> Self {
        Self {
            name: name.to_string(),
            scope: scope.to_string(),
            status: FunctionStatus::Verified,
            obligations_checked,
            failing_obligation: None,
            counterexample: Vec::new(),
            message: None,
            time_ms,
        }
    }

    /// Report for a function that did not verify
    fn failed(name: &str, scope: &str, err: &VerifyError, time_ms: u64) -> Self {
        let mut report = Self::verified(name, scope, 0, time_ms);
        report.message = Some(err.to_string());
        report.status = match err {
            VerifyError::Violated {
                obligation, model, ..
            } => {
                report.failing_obligation = Some(obligation.clone());
                report.counterexample = model.assignments.clone();
                FunctionStatus::Violated
            }
            VerifyError::SolverUnknown { obligation, .. } => {
                report.failing_obligation = Some(obligation.clone());
                FunctionStatus::Unknown
            }
            _ => FunctionStatus::Error,
        };
        report
    }

    pub fn is_verified(&self) -> bool {
        self.status == FunctionStatus::Verified
    }
}

impl std::fmt::Display for FunctionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let path = format!("{}::{}", self.scope, self.name);
        match self.status {
            FunctionStatus::Verified => write!(
                f,
                "✓ {path}: verified ({} obligation(s))",
                self.obligations_checked
            ),
            FunctionStatus::Violated => {
                write!(f, "✗ {path}: violated")?;
                if let Some(ob) = &self.failing_obligation {
                    write!(f, "\n  obligation: {ob}")?;
                }
                if !self.counterexample.is_empty() {
                    let cex: Vec<String> = self
                        .counterexample
                        .iter()
                        .map(|(n, v)| format!("{n} = {v}"))
                        .collect();
                    write!(f, "\n  counterexample: {}", cex.join(", "))?;
                }
                Ok(())
            }
            FunctionStatus::Unknown => write!(
                f,
                "? {path}: unknown\n  {}",
                self.message.as_deref().unwrap_or("")
            ),
            FunctionStatus::Error => write!(
                f,
                "! {path}: {}",
                self.message.as_deref().unwrap_or("error")
            ),
        }
    }
}

/// Per-function results of a run plus totals
#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    pub functions: Vec<FunctionReport>,
    pub verified_count: usize,
    pub violated_count: usize,
    pub unknown_count: usize,
    pub error_count: usize,
    pub total_time_ms: u64,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    fn compute_summary(&mut self) {
        self.verified_count = 0;
        self.violated_count = 0;
        self.unknown_count = 0;
        self.error_count = 0;
        self.total_time_ms = 0;

        for r in &self.functions {
            self.total_time_ms += r.time_ms;
            match r.status {
                FunctionStatus::Verified => self.verified_count += 1,
                FunctionStatus::Violated => self.violated_count += 1,
                FunctionStatus::Unknown => self.unknown_count += 1,
                FunctionStatus::Error => self.error_count += 1,
            }
        }
    }

    pub fn all_verified(&self) -> bool {
        self.functions.iter().all(FunctionReport::is_verified)
    }

    pub fn summary(&self) -> String {
        format!(
            "Verified: {}, Violated: {}, Unknown: {}, Errors: {} ({}ms)",
            self.verified_count,
            self.violated_count,
            self.unknown_count,
            self.error_count,
            self.total_time_ms,
        )
    }
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for func in &self.functions {
            writeln!(f, "{func}")?;
        }
        writeln!(f)?;
        if self.all_verified() {
            writeln!(f, "All {} function(s) verified successfully.", self.functions.len())
        } else {
            writeln!(f, "{}", self.summary())
        }
    }
}

/// Creates one solver context per function
pub type SolverFactory = Box<dyn FnMut() -> std::result::Result<Box<dyn Solver>, SolverError>>;

/// Verifies the functions of a module scope by scope
pub struct VerificationRun {
    module: SourceModule,
    mode: RunMode,
    builtins: Vec<String>,
    dump_smt: bool,
    factory: SolverFactory,
}

impl VerificationRun {
    /// Run backed by a Z3 process per function
    pub fn new(module: SourceModule, config: &VerifyConfig) -> Self {
        let path = config.z3_path.clone();
        let timeout = config.timeout_ms;
        Self {
            module,
            mode: config.run_mode(),
            builtins: config.builtins.clone(),
            dump_smt: config.dump_smt,
            factory: Box::new(move || {
                Z3Process::spawn(&path, timeout).map(|z3| Box::new(z3) as Box<dyn Solver>)
            }),
        }
    }

    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    /// Replace the solver backend
    pub fn with_solver_factory<F>(mut self, factory: F) -> Self
    where
        F: FnMut() -> std::result::Result<Box<dyn Solver>, SolverError> + 'static,
    {
        self.factory = Box::new(factory);
        self
    }

    pub fn module(&self) -> &SourceModule {
        &self.module
    }

    /// Verify all scopes in declaration order
    pub fn verify_all(&mut self) -> Result<RunReport> {
        let names: Vec<String> = self.module.scopes.iter().map(|s| s.name.clone()).collect();
        let mut report = RunReport::new();
        for name in names {
            self.run_scope(&name, &mut report)?;
        }
        report.compute_summary();
        Ok(report)
    }

    /// Verify a single scope by name
    pub fn verify_scope(&mut self, name: &str) -> Result<RunReport> {
        if self.module.scope(name).is_none() {
            let known: Vec<&str> = self.module.scopes.iter().map(|s| s.name.as_str()).collect();
            return Err(VerifyError::config_error(format!(
                "no scope named `{}`{}",
                name,
                crate::util::suggestion_for(name, known)
            )));
        }
        let mut report = RunReport::new();
        self.run_scope(name, &mut report)?;
        report.compute_summary();
        Ok(report)
    }

    fn run_scope(&mut self, name: &str, report: &mut RunReport) -> Result<()> {
        let Self {
            module,
            mode,
            builtins,
            dump_smt,
            factory,
        } = self;
        let Some(scope) = module.scope(name) else {
            return Ok(());
        };
        info!(scope = %name, functions = scope.functions.len(), "verifying scope");

        for function in &scope.functions {
            let start = Instant::now();
            let outcome = verify_function(function, builtins, *dump_smt, factory);
            let elapsed = start.elapsed().as_millis() as u64;
            match outcome {
                Ok(checked) => report.functions.push(FunctionReport::verified(
                    &function.name,
                    name,
                    checked,
                    elapsed,
                )),
                Err(err) if err.is_fatal() || *mode == RunMode::FailFast => return Err(err),
                Err(err) => {
                    warn!(scope = %name, function = %function.name, "{err}");
                    report
                        .functions
                        .push(FunctionReport::failed(&function.name, name, &err, elapsed));
                }
            }
        }
        Ok(())
    }
}

/// Prepare a session and discharge it on a fresh solver
fn verify_function(
    function: &SourceFunction,
    builtins: &[String],
    dump_smt: bool,
    factory: &mut SolverFactory,
) -> Result<usize> {
    let mut session = FunctionSession::new(function).with_dump_smt(dump_smt);
    session.prepare(builtins)?;
    let solver = factory()?;
    session.discharge(solver)
}
