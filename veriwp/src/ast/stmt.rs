//! Statement IR nodes

use super::Expr;
use serde::{Deserialize, Serialize};

/// IR statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stmt {
    Skip,
    Assign {
        var: String,
        expr: Expr,
    },
    /// Always binary; use [`Stmt::sequence`] to build chains
    Seq(Box<Stmt>, Box<Stmt>),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Box<Stmt>,
    },
    Assume(Expr),
    Assert(Expr),
    /// Source loop; removed by desugaring before WP
    While {
        invariants: Vec<Expr>,
        cond: Expr,
        body: Box<Stmt>,
    },
    /// Nondeterministic overwrite of a variable
    Havoc(String),
}

impl Stmt {
    pub fn assign(var: impl Into<String>, expr: Expr) -> Self {
        Stmt::Assign {
            var: var.into(),
            expr,
        }
    }

    pub fn seq(first: Stmt, second: Stmt) -> Self {
        Stmt::Seq(Box::new(first), Box::new(second))
    }

    pub fn if_(cond: Expr, then_branch: Stmt, else_branch: Stmt) -> Self {
        Stmt::If {
            cond,
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        }
    }

    /// Fold statements into a left-nested `Seq` chain.
    ///
    /// An empty list is `Skip`; a single statement is padded to `Seq(s, Skip)`.
    pub fn sequence(stmts: impl IntoIterator<Item = Stmt>) -> Stmt {
        let mut iter = stmts.into_iter();
        let Some(first) = iter.next() else {
            return Stmt::Skip;
        };
        match iter.next() {
            None => Stmt::seq(first, Stmt::Skip),
            Some(second) => iter.fold(Stmt::seq(first, second), Stmt::seq),
        }
    }

    /// Leaves of a `Seq` chain in execution order
    pub fn flatten(&self) -> Vec<&Stmt> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into<'a>(&'a self, out: &mut Vec<&'a Stmt>) {
        match self {
            Stmt::Seq(first, second) => {
                first.flatten_into(out);
                second.flatten_into(out);
            }
            other => out.push(other),
        }
    }

    /// Variables assigned anywhere in the statement, in order of first assignment
    pub fn written_vars(&self) -> Vec<String> {
        let mut vars = Vec::new();
        self.collect_written(&mut vars);
        vars
    }

    fn collect_written(&self, out: &mut Vec<String>) {
        match self {
            Stmt::Assign { var, .. } | Stmt::Havoc(var) => {
                if !out.contains(var) {
                    out.push(var.clone());
                }
            }
            Stmt::Seq(first, second) => {
                first.collect_written(out);
                second.collect_written(out);
            }
            Stmt::If {
                then_branch,
                else_branch,
                ..
            } => {
                then_branch.collect_written(out);
                else_branch.collect_written(out);
            }
            Stmt::While { body, .. } => body.collect_written(out),
            Stmt::Skip | Stmt::Assume(_) | Stmt::Assert(_) => {}
        }
    }

    /// True if a `While` node occurs anywhere
    pub fn contains_loop(&self) -> bool {
        match self {
            Stmt::While { .. } => true,
            Stmt::Seq(first, second) => first.contains_loop() || second.contains_loop(),
            Stmt::If {
                then_branch,
                else_branch,
                ..
            } => then_branch.contains_loop() || else_branch.contains_loop(),
            _ => false,
        }
    }

    fn fmt_tree(&self, f: &mut std::fmt::Formatter<'_>, level: usize) -> std::fmt::Result {
        let pad = "    ".repeat(level);
        let inner = "    ".repeat(level + 1);
        match self {
            Stmt::Skip => writeln!(f, "{pad}Skip()"),
            Stmt::Havoc(var) => writeln!(f, "{pad}Havoc({var})"),
            Stmt::Assign { var, expr } => {
                writeln!(f, "{pad}Assign(")?;
                writeln!(f, "{inner}{var}")?;
                writeln!(f, "{inner}{expr}")?;
                writeln!(f, "{pad})")
            }
            Stmt::Assume(e) => writeln!(f, "{pad}Assume(\n{inner}{e}\n{pad})"),
            Stmt::Assert(e) => writeln!(f, "{pad}Assert(\n{inner}{e}\n{pad})"),
            Stmt::Seq(first, second) => {
                writeln!(f, "{pad}Seq(")?;
                first.fmt_tree(f, level + 1)?;
                second.fmt_tree(f, level + 1)?;
                writeln!(f, "{pad})")
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                writeln!(f, "{pad}If(")?;
                writeln!(f, "{inner}{cond}")?;
                then_branch.fmt_tree(f, level + 1)?;
                else_branch.fmt_tree(f, level + 1)?;
                writeln!(f, "{pad})")
            }
            Stmt::While {
                invariants,
                cond,
                body,
            } => {
                writeln!(f, "{pad}While(")?;
                writeln!(f, "{inner}{cond}")?;
                let invs: Vec<String> = invariants.iter().map(ToString::to_string).collect();
                writeln!(f, "{inner}Invariants: [{}]", invs.join(", "))?;
                body.fmt_tree(f, level + 1)?;
                writeln!(f, "{pad})")
            }
        }
    }
}

impl std::fmt::Display for Stmt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.fmt_tree(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Op;

    fn incr(var: &str) -> Stmt {
        Stmt::assign(var, Expr::binop(Expr::var(var), Op::Add, Expr::int(1)))
    }

    #[test]
    fn test_sequence_shapes() {
        assert_eq!(Stmt::sequence(vec![]), Stmt::Skip);
        assert_eq!(
            Stmt::sequence(vec![incr("x")]),
            Stmt::seq(incr("x"), Stmt::Skip)
        );
        let chain = Stmt::sequence(vec![incr("a"), incr("b"), incr("c")]);
        assert_eq!(
            chain,
            Stmt::seq(Stmt::seq(incr("a"), incr("b")), incr("c"))
        );
    }

    #[test]
    fn test_flatten_preserves_order() {
        let chain = Stmt::sequence(vec![incr("a"), incr("b"), incr("c")]);
        let leaves = chain.flatten();
        assert_eq!(leaves, vec![&incr("a"), &incr("b"), &incr("c")]);
    }

    #[test]
    fn test_written_vars_first_assignment_order() {
        let body = Stmt::sequence(vec![
            incr("x"),
            Stmt::if_(Expr::bool(true), incr("z"), incr("x")),
            Stmt::While {
                invariants: vec![],
                cond: Expr::bool(true),
                body: Box::new(incr("w")),
            },
            incr("y"),
        ]);
        assert_eq!(body.written_vars(), vec!["x", "z", "w", "y"]);
        assert!(body.contains_loop());
    }

    #[test]
    fn test_display_tree() {
        let s = Stmt::seq(incr("x"), Stmt::Havoc("y".into()));
        insta::assert_snapshot!(s.to_string(), @r"
        Seq(
            Assign(
                x
                (x + 1)
            )
            Havoc(y)
        )
        ");
    }
}
