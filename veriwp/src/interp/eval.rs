//! Expression evaluator and statement executor

use super::env::Environment;
use super::error::{InterpResult, RuntimeError};
use super::value::Value;
use crate::ast::{Expr, Op, Stmt};

/// Default iteration budget of a single loop
pub const DEFAULT_LOOP_LIMIT: usize = 100_000;

/// How execution of a statement ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Ran to completion
    Normal,
    /// Stopped at a false `assume`; the run has no successor state
    Blocked,
}

/// The interpreter
#[derive(Debug, Clone)]
pub struct Interpreter {
    loop_limit: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Interpreter {
            loop_limit: DEFAULT_LOOP_LIMIT,
        }
    }

    pub fn with_loop_limit(mut self, limit: usize) -> Self {
        self.loop_limit = limit;
        self
    }

    /// Evaluate an expression with automatic stack growth for deep nesting
    pub fn eval(&self, expr: &Expr, env: &Environment) -> InterpResult<Value> {
        stacker::maybe_grow(crate::STACK_RED_ZONE, crate::STACK_GROW_SIZE, || {
            self.eval_inner(expr, env)
        })
    }

    fn eval_inner(&self, expr: &Expr, env: &Environment) -> InterpResult<Value> {
        match expr {
            Expr::Literal(v) => Ok(Value::from(*v)),
            Expr::Var(name) => env
                .get(name)
                .cloned()
                .ok_or_else(|| RuntimeError::undefined_variable(name)),

            Expr::UnOp { op: Op::Not, operand } => {
                Ok(Value::Bool(!self.eval(operand, env)?.as_bool()?))
            }
            Expr::UnOp { op: Op::Neg, operand } => {
                let n = self.eval(operand, env)?.as_int()?;
                n.checked_neg()
                    .map(Value::Int)
                    .ok_or_else(|| RuntimeError::overflow("-"))
            }
            Expr::UnOp { op, .. } => Err(RuntimeError::type_error(
                "unary operator",
                op.symbol(),
            )),

            Expr::BinOp { left, op, right } => {
                // Short-circuit evaluation for logical operators
                match op {
                    Op::And => {
                        if !self.eval(left, env)?.as_bool()? {
                            return Ok(Value::Bool(false));
                        }
                        return Ok(Value::Bool(self.eval(right, env)?.as_bool()?));
                    }
                    Op::Or => {
                        if self.eval(left, env)?.as_bool()? {
                            return Ok(Value::Bool(true));
                        }
                        return Ok(Value::Bool(self.eval(right, env)?.as_bool()?));
                    }
                    Op::Implies => {
                        if !self.eval(left, env)?.as_bool()? {
                            return Ok(Value::Bool(true));
                        }
                        return Ok(Value::Bool(self.eval(right, env)?.as_bool()?));
                    }
                    _ => {}
                }
                let l = self.eval(left, env)?;
                let r = self.eval(right, env)?;
                eval_binary(*op, l, r)
            }

            Expr::Subscript { base, index } => {
                let base = self.eval(base, env)?;
                let items = base.as_array()?;
                if let Expr::Slice { lower, upper, step } = &**index {
                    let lower = self.eval(lower, env)?.as_int()?;
                    let upper = match upper {
                        Some(u) => Some(self.eval(u, env)?.as_int()?),
                        None => None,
                    };
                    let step = self.eval(step, env)?.as_int()?;
                    return slice(items, lower, upper, step);
                }
                let i = self.eval(index, env)?.as_int()?;
                let pos = position(i, items.len())?;
                Ok(items[pos].clone())
            }
            Expr::Slice { .. } => Err(RuntimeError::not_executable("a slice outside a subscript")),

            Expr::FunctionCall { name, args } => {
                let args = args
                    .iter()
                    .map(|a| self.eval(a, env))
                    .collect::<InterpResult<Vec<_>>>()?;
                call_builtin(name, &args)
            }

            Expr::Quantification { .. } => Err(RuntimeError::not_executable("a quantifier")),
        }
    }

    /// Execute a statement, updating `env` in place
    pub fn exec(&self, stmt: &Stmt, env: &mut Environment) -> InterpResult<Outcome> {
        stacker::maybe_grow(crate::STACK_RED_ZONE, crate::STACK_GROW_SIZE, || {
            self.exec_inner(stmt, env)
        })
    }

    fn exec_inner(&self, stmt: &Stmt, env: &mut Environment) -> InterpResult<Outcome> {
        match stmt {
            Stmt::Skip => Ok(Outcome::Normal),
            Stmt::Assign { var, expr } => {
                let value = self.eval(expr, env)?;
                env.define(var.clone(), value);
                Ok(Outcome::Normal)
            }
            Stmt::Seq(first, second) => match self.exec(first, env)? {
                Outcome::Normal => self.exec(second, env),
                Outcome::Blocked => Ok(Outcome::Blocked),
            },
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.eval(cond, env)?.as_bool()? {
                    self.exec(then_branch, env)
                } else {
                    self.exec(else_branch, env)
                }
            }
            Stmt::Assume(e) => Ok(if self.eval(e, env)?.as_bool()? {
                Outcome::Normal
            } else {
                Outcome::Blocked
            }),
            Stmt::Assert(e) => {
                if self.eval(e, env)?.as_bool()? {
                    Ok(Outcome::Normal)
                } else {
                    Err(RuntimeError::assertion_failed(&e.to_string()))
                }
            }
            Stmt::While {
                invariants,
                cond,
                body,
            } => {
                for _ in 0..=self.loop_limit {
                    for inv in invariants {
                        if !self.eval(inv, env)?.as_bool()? {
                            return Err(RuntimeError::assertion_failed(&inv.to_string()));
                        }
                    }
                    if !self.eval(cond, env)?.as_bool()? {
                        return Ok(Outcome::Normal);
                    }
                    if self.exec(body, env)? == Outcome::Blocked {
                        return Ok(Outcome::Blocked);
                    }
                }
                Err(RuntimeError::loop_limit(self.loop_limit))
            }
            Stmt::Havoc(var) => Err(RuntimeError::not_executable(&format!("havoc of `{var}`"))),
        }
    }
}

fn eval_binary(op: Op, left: Value, right: Value) -> InterpResult<Value> {
    match op {
        Op::Eq => Ok(Value::Bool(same_kind(&left, &right)? && left == right)),
        Op::Neq => Ok(Value::Bool(!(same_kind(&left, &right)? && left == right))),
        Op::Iff => Ok(Value::Bool(left.as_bool()? == right.as_bool()?)),
        _ => {
            let a = left.as_int()?;
            let b = right.as_int()?;
            match op {
                Op::Add => checked(a.checked_add(b), op),
                Op::Minus => checked(a.checked_sub(b), op),
                Op::Mult => checked(a.checked_mul(b), op),
                Op::IntDiv => floor_div(a, b).map(Value::Int),
                Op::Mod => floor_mod(a, b).map(Value::Int),
                Op::Lt => Ok(Value::Bool(a < b)),
                Op::Le => Ok(Value::Bool(a <= b)),
                Op::Gt => Ok(Value::Bool(a > b)),
                Op::Ge => Ok(Value::Bool(a >= b)),
                _ => Err(RuntimeError::type_error("binary operator", op.symbol())),
            }
        }
    }
}

fn same_kind(left: &Value, right: &Value) -> InterpResult<bool> {
    if std::mem::discriminant(left) == std::mem::discriminant(right) {
        Ok(true)
    } else {
        Err(RuntimeError::type_error(left.type_name(), right.type_name()))
    }
}

fn checked(result: Option<i64>, op: Op) -> InterpResult<Value> {
    result
        .map(Value::Int)
        .ok_or_else(|| RuntimeError::overflow(op.symbol()))
}

/// Quotient rounded toward negative infinity
pub fn floor_div(a: i64, b: i64) -> InterpResult<i64> {
    if b == 0 {
        return Err(RuntimeError::division_by_zero());
    }
    let q = a.checked_div(b).ok_or_else(|| RuntimeError::overflow("//"))?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        Ok(q - 1)
    } else {
        Ok(q)
    }
}

/// Remainder with the sign of the divisor
pub fn floor_mod(a: i64, b: i64) -> InterpResult<i64> {
    if b == 0 {
        return Err(RuntimeError::division_by_zero());
    }
    let r = a.checked_rem(b).ok_or_else(|| RuntimeError::overflow("%"))?;
    if r != 0 && ((r < 0) != (b < 0)) {
        Ok(r + b)
    } else {
        Ok(r)
    }
}

fn position(index: i64, len: usize) -> InterpResult<usize> {
    usize::try_from(index)
        .ok()
        .filter(|&i| i < len)
        .ok_or_else(|| RuntimeError::index_out_of_bounds(index, len))
}

fn slice(items: &[Value], lower: i64, upper: Option<i64>, step: i64) -> InterpResult<Value> {
    if step <= 0 {
        return Err(RuntimeError::not_executable("a slice with a non-positive step"));
    }
    let len = items.len();
    let lower = slice_bound(lower, len);
    let upper = upper.map_or(len, |u| slice_bound(u, len));
    let step = usize::try_from(step).map_err(|_| RuntimeError::overflow(":"))?;
    let picked = if lower < upper {
        items[lower..upper].iter().step_by(step).cloned().collect()
    } else {
        Vec::new()
    };
    Ok(Value::Array(picked))
}

/// Clamp a slice bound into `0..=len`; negative bounds count from the end
fn slice_bound(bound: i64, len: usize) -> usize {
    let len_i = i64::try_from(len).unwrap_or(i64::MAX);
    let b = if bound < 0 { bound.saturating_add(len_i) } else { bound };
    usize::try_from(b.clamp(0, len_i)).unwrap_or(len)
}

fn call_builtin(name: &str, args: &[Value]) -> InterpResult<Value> {
    match (name, args) {
        ("len", [array]) => {
            let n = array.as_array()?.len();
            i64::try_from(n)
                .map(Value::Int)
                .map_err(|_| RuntimeError::overflow("len"))
        }
        ("store", [array, index, value]) => {
            let mut items = array.as_array()?.to_vec();
            let pos = position(index.as_int()?, items.len())?;
            items[pos] = value.clone();
            Ok(Value::Array(items))
        }
        _ => Err(RuntimeError::undefined_function(name)),
    }
}
