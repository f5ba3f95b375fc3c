//! Weakest-precondition calculus and verification-condition assembly

use serde::Serialize;
use tracing::debug;

use crate::ast::{Expr, FreshNames, Stmt};
use crate::error::{Result, VerifyError};
use crate::types::TypeEnv;

/// Where an obligation comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ObligationKind {
    /// `requires ==> wp(body, ensures)`
    Precondition,
    /// Extra condition collected while computing the precondition
    SideCondition(usize),
}

impl std::fmt::Display for ObligationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObligationKind::Precondition => write!(f, "precondition"),
            ObligationKind::SideCondition(i) => write!(f, "side condition #{i}"),
        }
    }
}

/// Formula that must be valid for the function to meet its contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Obligation {
    pub kind: ObligationKind,
    pub formula: Expr,
}

/// Structural WP over loop-free IR
pub struct WpEngine<'a> {
    env: &'a TypeEnv,
    fresh: &'a mut FreshNames,
}

impl<'a> WpEngine<'a> {
    /// `env` supplies the types of havoced variables; `fresh` their new names
    pub fn new(env: &'a TypeEnv, fresh: &'a mut FreshNames) -> Self {
        Self { env, fresh }
    }

    /// `wp(stmt, post)` as a precondition and the side conditions, deduplicated
    /// in order of first appearance
    pub fn wp(&mut self, stmt: &Stmt, post: Expr) -> Result<(Expr, Vec<Expr>)> {
        stacker::maybe_grow(crate::STACK_RED_ZONE, crate::STACK_GROW_SIZE, || {
            self.wp_inner(stmt, post)
        })
    }

    fn wp_inner(&mut self, stmt: &Stmt, post: Expr) -> Result<(Expr, Vec<Expr>)> {
        match stmt {
            Stmt::Skip => Ok((post, Vec::new())),
            Stmt::Assign { var, expr } => Ok((post.substitute(var, expr), Vec::new())),
            Stmt::Assert(e) => Ok((Expr::and(post, e.clone()), Vec::new())),
            Stmt::Assume(e) => Ok((Expr::implies(e.clone(), post), Vec::new())),
            Stmt::Seq(first, second) => {
                let (mid, mut side) = self.wp(second, post)?;
                let (pre, first_side) = self.wp(first, mid)?;
                merge(&mut side, first_side);
                Ok((pre, side))
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let (then_pre, mut side) = self.wp(then_branch, post.clone())?;
                let (else_pre, else_side) = self.wp(else_branch, post)?;
                merge(&mut side, else_side);
                let pre = Expr::and(
                    Expr::implies(cond.clone(), then_pre),
                    Expr::implies(Expr::not(cond.clone()), else_pre),
                );
                Ok((pre, side))
            }
            Stmt::Havoc(var) => {
                let renamed = self.fresh.fresh(var);
                let ty = self.env.get(var).filter(|t| t.is_concrete()).cloned();
                let body = post.substitute(var, &Expr::Var(renamed.clone()));
                Ok((Expr::forall(renamed, ty, body), Vec::new()))
            }
            Stmt::While { .. } => Err(VerifyError::UndesugaredLoop),
        }
    }
}

fn merge(into: &mut Vec<Expr>, more: Vec<Expr>) {
    for e in more {
        if !into.contains(&e) {
            into.push(e);
        }
    }
}

/// Obligations of a function: `R ==> wp(body, E)` first, then each side condition.
///
/// Empty `requires`/`ensures` lists stand for `True`.
pub fn generate_obligations(
    requires: &[Expr],
    ensures: &[Expr],
    body: &Stmt,
    env: &TypeEnv,
    fresh: &mut FreshNames,
) -> Result<Vec<Obligation>> {
    let post = Expr::conjoin(ensures.iter().cloned());
    let (pre, side) = WpEngine::new(env, fresh).wp(body, post)?;
    let assumed = Expr::conjoin(requires.iter().cloned());

    let mut obligations = vec![Obligation {
        kind: ObligationKind::Precondition,
        formula: Expr::implies(assumed, pre),
    }];
    obligations.extend(side.into_iter().enumerate().map(|(i, formula)| Obligation {
        kind: ObligationKind::SideCondition(i),
        formula,
    }));
    debug!(count = obligations.len(), "generated obligations");
    Ok(obligations)
}
