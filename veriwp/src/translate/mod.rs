//! Translation of host statements into the verification IR
//!
//! Translation runs in two steps. [`Translator`] maps the host tree onto
//! `Stmt`, keeping loops as `While` nodes with their invariants attached.
//! [`desugar_loops`] then replaces every loop by straight-line code:
//!
//! ```text
//! Assert(I); Havoc(w1); ...; Havoc(wn); Assume(I);
//! If(C, Seq(S', Assert(I), Assume(False)), Skip)
//! ```
//!
//! where `I` is the conjunction of the invariants and `w1..wn` are the
//! variables the body writes, in order of first assignment.

use crate::ast::{Expr, FreshNames, Span, Spanned, Stmt};
use crate::error::{Result, VerifyError};
use crate::parser::parse_assertion;
use crate::source::{SourceExpr, SourceStmt};

/// Annotation call that adds an assumption at its position
pub const ASSUME: &str = "assume";
/// Annotation call that declares a loop invariant
pub const INVARIANT: &str = "invariant";
/// Built-in functions callable from code and assertions
pub const BUILTIN_FUNCTIONS: &[&str] = &["len"];
/// Internal functional array update produced for `xs[i] = e`
pub const STORE: &str = "store";

/// Host-to-IR statement translator
pub struct Translator<'a> {
    builtins: &'a [String],
    fresh: &'a mut FreshNames,
}

impl<'a> Translator<'a> {
    /// `builtins` is the whitelist of annotation calls (`assume`, `invariant`)
    pub fn new(builtins: &'a [String], fresh: &'a mut FreshNames) -> Self {
        Self { builtins, fresh }
    }

    fn is_annotation(&self, name: &str) -> bool {
        self.builtins.iter().any(|b| b == name)
    }

    /// Translate a statement list into a `Seq` chain
    pub fn translate_block(&mut self, stmts: &[Spanned<SourceStmt>]) -> Result<Stmt> {
        let translated = stmts
            .iter()
            .map(|s| self.translate_stmt(s))
            .collect::<Result<Vec<_>>>()?;
        Ok(Stmt::sequence(translated))
    }

    fn translate_stmt(&mut self, stmt: &Spanned<SourceStmt>) -> Result<Stmt> {
        match &stmt.node {
            SourceStmt::Pass | SourceStmt::Return(_) => Ok(Stmt::Skip),
            SourceStmt::Assign { target, value } => {
                let value = self.translate_expr(value)?;
                let (var, expr) = lower_assignment(target, value)?;
                Ok(Stmt::assign(var, expr))
            }
            SourceStmt::If { cond, body, orelse } => {
                let cond = self.translate_expr(cond)?;
                let then_branch = self.translate_block(body)?;
                let else_branch = self.translate_block(orelse)?;
                Ok(Stmt::if_(cond, then_branch, else_branch))
            }
            SourceStmt::While { cond, body } => {
                let cond = self.translate_expr(cond)?;
                let mut invariants = Vec::new();
                let mut rest = Vec::new();
                for s in body {
                    match self.annotation(s)? {
                        Some((name, text)) if name == INVARIANT => {
                            invariants.push(self.parse_annotation(text)?)
                        }
                        _ => rest.push(self.translate_stmt(s)?),
                    }
                }
                Ok(Stmt::While {
                    invariants,
                    cond,
                    body: Box::new(Stmt::sequence(rest)),
                })
            }
            SourceStmt::Assert(e) => Ok(Stmt::Assert(self.translate_expr(e)?)),
            SourceStmt::Expr(e) => match self.annotation(stmt)? {
                Some((name, text)) if name == ASSUME => Ok(Stmt::Assume(self.parse_annotation(text)?)),
                Some((name, _)) if name == INVARIANT => Err(VerifyError::unsupported_at(
                    "invariant(...) is only allowed directly inside a while loop",
                    stmt.span,
                )),
                Some((name, _)) => Err(VerifyError::unsupported_at(
                    format!("annotation `{name}` has no meaning in a function body"),
                    stmt.span,
                )),
                None => match &e.node {
                    SourceExpr::Call { func, .. } => Err(VerifyError::unsupported_at(
                        format!("call to `{}` is not supported", func.node),
                        e.span,
                    )),
                    _ => Err(VerifyError::unsupported_at(
                        "expression statement has no effect",
                        e.span,
                    )),
                },
            },
        }
    }

    /// Recognise `name("text")` where `name` is a whitelisted annotation
    fn annotation<'s>(
        &self,
        stmt: &'s Spanned<SourceStmt>,
    ) -> Result<Option<(&'s str, Spanned<&'s str>)>> {
        let SourceStmt::Expr(e) = &stmt.node else {
            return Ok(None);
        };
        let SourceExpr::Call { func, args } = &e.node else {
            return Ok(None);
        };
        if !self.is_annotation(&func.node) {
            return Ok(None);
        }
        match args.as_slice() {
            [Spanned {
                node: SourceExpr::Str(text),
                span,
            }] => Ok(Some((
                func.node.as_str(),
                Spanned::new(text.as_str(), Span::new(span.start + 1, span.end)),
            ))),
            _ => Err(VerifyError::parse(
                format!("{}() takes exactly one assertion string", func.node),
                e.span,
            )),
        }
    }

    fn parse_annotation(&mut self, text: Spanned<&str>) -> Result<Expr> {
        parse_assertion(text.node, self.fresh).map_err(|e| e.offset(text.span.start))
    }

    /// Translate a host expression
    pub fn translate_expr(&mut self, expr: &Spanned<SourceExpr>) -> Result<Expr> {
        stacker::maybe_grow(crate::STACK_RED_ZONE, crate::STACK_GROW_SIZE, || {
            self.translate_expr_inner(expr)
        })
    }

    fn translate_expr_inner(&mut self, expr: &Spanned<SourceExpr>) -> Result<Expr> {
        match &expr.node {
            SourceExpr::Name(name) => Ok(Expr::var(name.clone())),
            SourceExpr::Int(n) => Ok(Expr::int(*n)),
            SourceExpr::Bool(b) => Ok(Expr::bool(*b)),
            SourceExpr::Str(_) => Err(VerifyError::unsupported_at(
                "string literals are only allowed as annotation arguments",
                expr.span,
            )),
            SourceExpr::List(_) => Err(VerifyError::unsupported_at(
                "list literals are not supported",
                expr.span,
            )),
            SourceExpr::BinOp { left, op, right } => Ok(Expr::binop(
                self.translate_expr(left)?,
                *op,
                self.translate_expr(right)?,
            )),
            SourceExpr::UnaryOp { op, operand } => {
                Ok(Expr::unop(*op, self.translate_expr(operand)?))
            }
            SourceExpr::BoolOp { op, values } => {
                let values = values
                    .iter()
                    .map(|v| self.translate_expr(v))
                    .collect::<Result<Vec<_>>>()?;
                values
                    .into_iter()
                    .reduce(|l, r| Expr::binop(l, *op, r))
                    .ok_or_else(|| VerifyError::unsupported_at("empty boolean operation", expr.span))
            }
            SourceExpr::Compare { left, rest } => match rest.as_slice() {
                [(op, right)] => Ok(Expr::binop(
                    self.translate_expr(left)?,
                    *op,
                    self.translate_expr(right)?,
                )),
                _ => Err(VerifyError::unsupported_at(
                    "chained comparisons are not supported",
                    expr.span,
                )),
            },
            SourceExpr::Call { func, args } => {
                if !BUILTIN_FUNCTIONS.contains(&func.node.as_str()) {
                    return Err(VerifyError::unsupported_at(
                        format!("call to `{}` is not supported", func.node),
                        func.span,
                    ));
                }
                let args = args
                    .iter()
                    .map(|a| self.translate_expr(a))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Expr::call(func.node.clone(), args))
            }
            SourceExpr::Subscript { value, index } => Ok(Expr::subscript(
                self.translate_expr(value)?,
                self.translate_expr(index)?,
            )),
            SourceExpr::Slice { lower, upper, step } => {
                let lower = lower.as_deref().map(|e| self.translate_expr(e)).transpose()?;
                let upper = upper.as_deref().map(|e| self.translate_expr(e)).transpose()?;
                let step = step.as_deref().map(|e| self.translate_expr(e)).transpose()?;
                Ok(Expr::slice(lower, upper, step))
            }
        }
    }
}

/// `x = e` stays as is; `xs[i][j] = e` becomes `xs = store(xs, i, store(xs[i], j, e))`
fn lower_assignment(target: &Spanned<SourceExpr>, value: Expr) -> Result<(String, Expr)> {
    match &target.node {
        SourceExpr::Name(name) => Ok((name.clone(), value)),
        SourceExpr::Subscript { value: base, index } => {
            if matches!(index.node, SourceExpr::Slice { .. }) {
                return Err(VerifyError::unsupported_at(
                    "assignment to a slice is not supported",
                    target.span,
                ));
            }
            let base_expr = target_expr(base)?;
            let index = target_expr(index)?;
            lower_assignment(base, Expr::call(STORE, vec![base_expr, index, value]))
        }
        _ => Err(VerifyError::unsupported_at(
            "unsupported assignment target",
            target.span,
        )),
    }
}

/// Read-side translation of an assignment target
fn target_expr(expr: &Spanned<SourceExpr>) -> Result<Expr> {
    let mut fresh = FreshNames::new();
    Translator::new(&[], &mut fresh).translate_expr(expr)
}

/// Replace every `While` by its invariant-based straight-line encoding.
///
/// Each copy of the invariant is alpha-renamed again so that all
/// quantifier binders in the result stay unique.
pub fn desugar_loops(stmt: Stmt, fresh: &mut FreshNames) -> Stmt {
    match stmt {
        Stmt::While {
            invariants,
            cond,
            body,
        } => {
            let written = body.written_vars();
            let body = desugar_loops(*body, fresh);
            let invariant = |fresh: &mut FreshNames| {
                Expr::conjoin(invariants.iter().map(|i| fresh.alpha_rename(i)))
            };

            let mut stmts = vec![Stmt::Assert(invariant(fresh))];
            stmts.extend(written.into_iter().map(Stmt::Havoc));
            stmts.push(Stmt::Assume(invariant(fresh)));
            let taken = Stmt::sequence(vec![
                body,
                Stmt::Assert(invariant(fresh)),
                Stmt::Assume(Expr::bool(false)),
            ]);
            stmts.push(Stmt::if_(cond, taken, Stmt::Skip));
            Stmt::sequence(stmts)
        }
        Stmt::Seq(first, second) => Stmt::seq(
            desugar_loops(*first, fresh),
            desugar_loops(*second, fresh),
        ),
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => Stmt::if_(
            cond,
            desugar_loops(*then_branch, fresh),
            desugar_loops(*else_branch, fresh),
        ),
        other => other,
    }
}

/// Translate a function body and desugar its loops
pub fn translate_function(
    body: &[Spanned<SourceStmt>],
    builtins: &[String],
    fresh: &mut FreshNames,
) -> Result<Stmt> {
    let structured = Translator::new(builtins, fresh).translate_block(body)?;
    Ok(desugar_loops(structured, fresh))
}
