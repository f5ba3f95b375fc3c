//! Expression IR nodes

use super::Type;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Op {
    // Arithmetic
    Add,
    Minus,
    Mult,
    IntDiv,
    Mod,
    Neg,
    // Comparison
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    // Boolean
    And,
    Or,
    Not,
    Implies,
    Iff,
}

/// Operand/result typing class of an operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpClass {
    /// int, int -> int
    Arith,
    /// int, int -> bool
    Comparison,
    /// bool, bool -> bool
    Boolean,
}

impl Op {
    pub fn class(self) -> OpClass {
        match self {
            Op::Add | Op::Minus | Op::Mult | Op::IntDiv | Op::Mod | Op::Neg => OpClass::Arith,
            Op::Eq | Op::Neq | Op::Lt | Op::Le | Op::Gt | Op::Ge => OpClass::Comparison,
            Op::And | Op::Or | Op::Not | Op::Implies | Op::Iff => OpClass::Boolean,
        }
    }

    pub fn is_unary(self) -> bool {
        matches!(self, Op::Neg | Op::Not)
    }

    /// Surface syntax of the operator
    pub fn symbol(self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Minus | Op::Neg => "-",
            Op::Mult => "*",
            Op::IntDiv => "//",
            Op::Mod => "%",
            Op::Eq => "==",
            Op::Neq => "!=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::And => "and",
            Op::Or => "or",
            Op::Not => "not",
            Op::Implies => "==>",
            Op::Iff => "<==>",
        }
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Literal payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Bool(bool),
}

/// IR expression
///
/// Trees are immutable once built, except for the type slot of a
/// `Quantification`, which the type checker fills in exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expr {
    Var(String),
    Literal(Value),
    BinOp {
        left: Box<Expr>,
        op: Op,
        right: Box<Expr>,
    },
    UnOp {
        op: Op,
        operand: Box<Expr>,
    },
    /// `base[index]`, where the index may be a `Slice`
    Subscript {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    /// `lower:upper:step`; missing bounds are filled in as `0` and `1`
    Slice {
        lower: Box<Expr>,
        upper: Option<Box<Expr>>,
        step: Box<Expr>,
    },
    /// Call of a whitelisted built-in
    FunctionCall { name: String, args: Vec<Expr> },
    /// Universal quantifier; the only binder in the IR
    Quantification {
        var: String,
        body: Box<Expr>,
        ty: Option<Type>,
    },
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    pub fn int(n: i64) -> Self {
        Expr::Literal(Value::Int(n))
    }

    pub fn bool(b: bool) -> Self {
        Expr::Literal(Value::Bool(b))
    }

    pub fn binop(left: Expr, op: Op, right: Expr) -> Self {
        Expr::BinOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn unop(op: Op, operand: Expr) -> Self {
        Expr::UnOp {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn not(operand: Expr) -> Self {
        Self::unop(Op::Not, operand)
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Self::binop(left, Op::And, right)
    }

    pub fn implies(left: Expr, right: Expr) -> Self {
        Self::binop(left, Op::Implies, right)
    }

    pub fn subscript(base: Expr, index: Expr) -> Self {
        Expr::Subscript {
            base: Box::new(base),
            index: Box::new(index),
        }
    }

    pub fn slice(lower: Option<Expr>, upper: Option<Expr>, step: Option<Expr>) -> Self {
        Expr::Slice {
            lower: Box::new(lower.unwrap_or(Expr::int(0))),
            upper: upper.map(Box::new),
            step: Box::new(step.unwrap_or(Expr::int(1))),
        }
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::FunctionCall {
            name: name.into(),
            args,
        }
    }

    pub fn forall(var: impl Into<String>, ty: Option<Type>, body: Expr) -> Self {
        Expr::Quantification {
            var: var.into(),
            body: Box::new(body),
            ty,
        }
    }

    /// `exists x :: P` is represented as `not (forall x :: not P)`
    pub fn exists(var: impl Into<String>, ty: Option<Type>, body: Expr) -> Self {
        Self::not(Self::forall(var, ty, Self::not(body)))
    }

    /// Left-nested conjunction; `True` for an empty list
    pub fn conjoin(exprs: impl IntoIterator<Item = Expr>) -> Self {
        exprs
            .into_iter()
            .reduce(Expr::and)
            .unwrap_or(Expr::bool(true))
    }

    /// Free variables, sorted by name
    pub fn free_vars(&self) -> BTreeSet<String> {
        let mut vars = BTreeSet::new();
        self.collect_free_vars(&mut vars);
        vars
    }

    fn collect_free_vars(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Var(name) => {
                out.insert(name.clone());
            }
            Expr::Literal(_) => {}
            Expr::BinOp { left, right, .. } => {
                left.collect_free_vars(out);
                right.collect_free_vars(out);
            }
            Expr::UnOp { operand, .. } => operand.collect_free_vars(out),
            Expr::Subscript { base, index } => {
                base.collect_free_vars(out);
                index.collect_free_vars(out);
            }
            Expr::Slice { lower, upper, step } => {
                lower.collect_free_vars(out);
                if let Some(upper) = upper {
                    upper.collect_free_vars(out);
                }
                step.collect_free_vars(out);
            }
            Expr::FunctionCall { args, .. } => {
                for arg in args {
                    arg.collect_free_vars(out);
                }
            }
            Expr::Quantification { var, body, .. } => {
                let mut inner = body.free_vars();
                inner.remove(var);
                out.extend(inner);
            }
        }
    }

    /// Capture-avoiding substitution of `replacement` for free occurrences of `var`
    pub fn substitute(&self, var: &str, replacement: &Expr) -> Expr {
        match self {
            Expr::Var(name) if name == var => replacement.clone(),
            Expr::Var(_) | Expr::Literal(_) => self.clone(),
            Expr::BinOp { left, op, right } => Expr::binop(
                left.substitute(var, replacement),
                *op,
                right.substitute(var, replacement),
            ),
            Expr::UnOp { op, operand } => Expr::unop(*op, operand.substitute(var, replacement)),
            Expr::Subscript { base, index } => Expr::subscript(
                base.substitute(var, replacement),
                index.substitute(var, replacement),
            ),
            Expr::Slice { lower, upper, step } => Expr::Slice {
                lower: Box::new(lower.substitute(var, replacement)),
                upper: upper
                    .as_ref()
                    .map(|u| Box::new(u.substitute(var, replacement))),
                step: Box::new(step.substitute(var, replacement)),
            },
            Expr::FunctionCall { name, args } => Expr::call(
                name.clone(),
                args.iter().map(|a| a.substitute(var, replacement)).collect(),
            ),
            Expr::Quantification { var: bound, body, ty } => {
                if bound == var {
                    return self.clone();
                }
                let replacement_vars = replacement.free_vars();
                if !replacement_vars.contains(bound) {
                    return Expr::forall(bound.clone(), ty.clone(), body.substitute(var, replacement));
                }
                // The binder would capture a variable of the replacement: rename it first.
                let body_vars = body.free_vars();
                let mut renamed = format!("{bound}'");
                while replacement_vars.contains(&renamed) || body_vars.contains(&renamed) {
                    renamed.push('\'');
                }
                let body = body.substitute(bound, &Expr::Var(renamed.clone()));
                Expr::forall(renamed, ty.clone(), body.substitute(var, replacement))
            }
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
        }
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Var(name) => write!(f, "{name}"),
            Expr::Literal(value) => write!(f, "{value}"),
            Expr::BinOp { left, op, right } => write!(f, "({left} {op} {right})"),
            Expr::UnOp { op: Op::Not, operand } => write!(f, "(not {operand})"),
            Expr::UnOp { op, operand } => write!(f, "({op}{operand})"),
            Expr::Subscript { base, index } => write!(f, "{base}[{index}]"),
            Expr::Slice { lower, upper, step } => {
                write!(f, "{lower}:")?;
                if let Some(upper) = upper {
                    write!(f, "{upper}")?;
                }
                write!(f, ":{step}")
            }
            Expr::FunctionCall { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Expr::Quantification { var, body, ty } => match ty {
                Some(ty) => write!(f, "(∀{var}: {ty}. {body})"),
                None => write!(f, "(∀{var}. {body})"),
            },
        }
    }
}
