//! Fresh-name generation and alpha-renaming of quantifier binders

use super::Expr;

/// Monotonic generator of synthetic variable names.
///
/// Generated names have the form `base$N`. `$` never appears in a source
/// identifier, so they cannot clash with user variables. One generator is
/// owned by each function session.
#[derive(Debug, Default, Clone)]
pub struct FreshNames {
    counter: usize,
}

impl FreshNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next unused name derived from `base` (any previous suffix is dropped)
    pub fn fresh(&mut self, base: &str) -> String {
        self.counter += 1;
        let stem = base.split('$').next().unwrap_or(base);
        format!("{stem}${}", self.counter)
    }

    /// Give every quantifier binder in `expr` a name unique to its occurrence
    pub fn alpha_rename(&mut self, expr: &Expr) -> Expr {
        match expr {
            Expr::Var(_) | Expr::Literal(_) => expr.clone(),
            Expr::BinOp { left, op, right } => {
                Expr::binop(self.alpha_rename(left), *op, self.alpha_rename(right))
            }
            Expr::UnOp { op, operand } => Expr::unop(*op, self.alpha_rename(operand)),
            Expr::Subscript { base, index } => {
                Expr::subscript(self.alpha_rename(base), self.alpha_rename(index))
            }
            Expr::Slice { lower, upper, step } => Expr::Slice {
                lower: Box::new(self.alpha_rename(lower)),
                upper: upper.as_ref().map(|u| Box::new(self.alpha_rename(u))),
                step: Box::new(self.alpha_rename(step)),
            },
            Expr::FunctionCall { name, args } => Expr::call(
                name.clone(),
                args.iter().map(|a| self.alpha_rename(a)).collect(),
            ),
            Expr::Quantification { var, body, ty } => {
                let body = self.alpha_rename(body);
                let renamed = self.fresh(var);
                let body = body.substitute(var, &Expr::Var(renamed.clone()));
                Expr::forall(renamed, ty.clone(), body)
            }
        }
    }
}
