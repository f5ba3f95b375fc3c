//! Type checking
//!
//! Bidirectional inference over the IR. Variables start out either with a
//! declared type or as [`Type::Any`]; checking an expression against an
//! expected type refines the `Any` parts of the variables it mentions.
//! Quantified variables without an annotation get their type read back from
//! the environment after their body has been checked.

use std::collections::BTreeMap;

use crate::ast::{Expr, Op, OpClass, Stmt, Type, Value};
use crate::error::{Result, VerifyError};
use crate::translate::STORE;
use crate::util::suggestion_for;

/// Variable name to type
pub type TypeEnv = BTreeMap<String, Type>;

/// Passes over a function before the environment must have settled
const MAX_PASSES: usize = 4;

/// Signature of a built-in function for the given array element type.
///
/// `len : (List[T]) -> int` and `store : (List[T], int, T) -> List[T]`.
pub fn builtin_signature(name: &str, elem: &Type) -> Option<Type> {
    let array = Type::array(elem.clone());
    match name {
        "len" => Some(Type::arrow(Type::Prod(vec![array]), Type::Int)),
        STORE => Some(Type::arrow(
            Type::Prod(vec![array.clone(), Type::Int, elem.clone()]),
            array,
        )),
        _ => None,
    }
}

const BUILTIN_NAMES: &[&str] = &["len", STORE];

/// Type checker with a single flat environment
#[derive(Debug, Default)]
pub struct TypeChecker {
    env: TypeEnv,
}

impl TypeChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_env(env: TypeEnv) -> Self {
        Self { env }
    }

    pub fn env(&self) -> &TypeEnv {
        &self.env
    }

    pub fn into_env(self) -> TypeEnv {
        self.env
    }

    /// Declare a variable, keeping an existing binding if it is already more precise
    pub fn declare(&mut self, name: impl Into<String>, ty: Type) {
        let name = name.into();
        let ty = match self.env.get(&name) {
            Some(cur) => cur.refine(&ty),
            None => ty,
        };
        self.env.insert(name, ty);
    }

    fn lookup(&self, name: &str) -> Result<Type> {
        self.env.get(name).cloned().ok_or_else(|| {
            VerifyError::type_error(format!(
                "undefined variable: `{}`{}",
                name,
                suggestion_for(name, self.env.keys().map(String::as_str))
            ))
        })
    }

    fn mismatch(expr: &Expr, expected: &Type, found: &Type) -> VerifyError {
        VerifyError::type_error(format!(
            "type mismatch in `{expr}`: expected `{expected}`, found `{found}`"
        ))
    }

    /// Infer the type of an expression
    pub fn infer(&mut self, expr: &mut Expr) -> Result<Type> {
        stacker::maybe_grow(crate::STACK_RED_ZONE, crate::STACK_GROW_SIZE, || {
            self.infer_inner(expr)
        })
    }

    fn infer_inner(&mut self, expr: &mut Expr) -> Result<Type> {
        match expr {
            Expr::Literal(Value::Int(_)) => Ok(Type::Int),
            Expr::Literal(Value::Bool(_)) => Ok(Type::Bool),
            Expr::Var(name) => self.lookup(name),

            Expr::BinOp { left, op, right } => {
                let (operand, result) = operator_types(*op);
                self.check(left, &operand)?;
                self.check(right, &operand)?;
                Ok(result)
            }

            Expr::UnOp { op, operand } => {
                let (expected, result) = operator_types(*op);
                self.check(operand, &expected)?;
                Ok(result)
            }

            Expr::Subscript { base, index } => {
                if matches!(**index, Expr::Slice { .. }) {
                    self.check(index, &Type::Slice)?;
                    self.check(base, &Type::array(Type::Any))?;
                    return self.infer(base);
                }
                self.check(index, &Type::Int)?;
                match self.infer(base)? {
                    Type::Array(elem) => Ok(*elem),
                    Type::Any => Ok(Type::Any),
                    other => Err(VerifyError::type_error(format!(
                        "cannot subscript `{base}` of type `{other}`"
                    ))),
                }
            }

            Expr::Slice { lower, upper, step } => {
                self.check(lower, &Type::Int)?;
                if let Some(upper) = upper {
                    self.check(upper, &Type::Int)?;
                }
                self.check(step, &Type::Int)?;
                Ok(Type::Slice)
            }

            Expr::FunctionCall { name, args } => self.infer_call(name, args),

            Expr::Quantification { var, body, ty } => {
                let shadowed = self.env.insert(var.clone(), ty.clone().unwrap_or(Type::Any));
                let checked = self.check(body, &Type::Bool);
                let resolved = self.env.remove(var.as_str());
                if let Some(prev) = shadowed {
                    self.env.insert(var.clone(), prev);
                }
                checked?;
                match resolved {
                    Some(t) if t.is_concrete() => {
                        *ty = Some(t);
                        Ok(Type::Bool)
                    }
                    _ => Err(VerifyError::type_error(format!(
                        "cannot infer the type of quantified variable `{var}`; add an annotation"
                    ))),
                }
            }
        }
    }

    fn infer_call(&mut self, name: &str, args: &mut [Expr]) -> Result<Type> {
        if builtin_signature(name, &Type::Any).is_none() {
            return Err(VerifyError::type_error(format!(
                "unknown function: `{}`{}",
                name,
                suggestion_for(name, BUILTIN_NAMES.iter().copied())
            )));
        }

        // Element type of the array argument decides the instance of the signature
        let mut elem = Type::Any;
        if let Some(first) = args.first_mut() {
            self.check(first, &Type::array(Type::Any))?;
            if let Type::Array(e) = self.infer(first)? {
                elem = *e;
            }
        }
        if name == STORE && !elem.is_concrete() && args.len() == 3 {
            let value = self.infer(&mut args[2])?;
            elem = elem.refine(&value);
        }

        let Some(Type::Arrow(domain, codomain)) = builtin_signature(name, &elem) else {
            return Err(VerifyError::type_error(format!("unknown function: `{name}`")));
        };
        let Type::Prod(params) = *domain else {
            return Err(VerifyError::type_error(format!("malformed signature for `{name}`")));
        };
        if params.len() != args.len() {
            return Err(VerifyError::type_error(format!(
                "`{}` takes {} argument(s) but {} were given",
                name,
                params.len(),
                args.len()
            )));
        }
        for (arg, param) in args.iter_mut().zip(&params) {
            self.check(arg, param)?;
        }
        Ok(*codomain)
    }

    /// Check an expression against an expected type, refining `Any`-typed variables
    pub fn check(&mut self, expr: &mut Expr, expected: &Type) -> Result<()> {
        match expr {
            Expr::Var(name) => {
                let name = name.clone();
                let current = self.lookup(&name)?;
                if !current.compatible(expected) {
                    return Err(Self::mismatch(expr, expected, &current));
                }
                self.env.insert(name, current.refine(expected));
                Ok(())
            }
            Expr::Subscript { base, index } if !matches!(**index, Expr::Slice { .. }) => {
                self.check(index, &Type::Int)?;
                self.check(base, &Type::array(expected.clone()))
            }
            _ => {
                let found = self.infer(expr)?;
                if found.compatible(expected) {
                    Ok(())
                } else {
                    Err(Self::mismatch(expr, expected, &found))
                }
            }
        }
    }

    /// Check a statement, binding assigned variables
    pub fn check_stmt(&mut self, stmt: &mut Stmt) -> Result<()> {
        match stmt {
            Stmt::Skip => Ok(()),
            Stmt::Assign { var, expr } => {
                let found = self.infer(expr)?;
                match self.env.get(var.as_str()).cloned() {
                    Some(current) if !current.compatible(&found) => {
                        Err(VerifyError::type_error(format!(
                            "type mutation: `{var}` has type `{current}` but is assigned `{expr}` of type `{found}`"
                        )))
                    }
                    Some(current) => {
                        let refined = current.refine(&found);
                        self.check(expr, &refined)?;
                        self.env.insert(var.clone(), refined);
                        Ok(())
                    }
                    None => {
                        self.env.insert(var.clone(), found);
                        Ok(())
                    }
                }
            }
            Stmt::Seq(first, second) => {
                self.check_stmt(first)?;
                self.check_stmt(second)
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.check(cond, &Type::Bool)?;
                self.check_stmt(then_branch)?;
                self.check_stmt(else_branch)
            }
            Stmt::Assume(e) | Stmt::Assert(e) => self.check(e, &Type::Bool),
            Stmt::While {
                invariants,
                cond,
                body,
            } => {
                for inv in invariants.iter_mut() {
                    self.check(inv, &Type::Bool)?;
                }
                self.check(cond, &Type::Bool)?;
                self.check_stmt(body)
            }
            Stmt::Havoc(var) => {
                self.env.entry(var.clone()).or_insert(Type::Any);
                Ok(())
            }
        }
    }

    /// Check a whole function: preconditions, body, postconditions.
    ///
    /// Repeats until no binding changes, since a later use can resolve the
    /// type of a variable mentioned earlier.
    pub fn check_function(
        &mut self,
        requires: &mut [Expr],
        body: &mut Stmt,
        ensures: &mut [Expr],
    ) -> Result<()> {
        for _ in 0..MAX_PASSES {
            let before = self.env.clone();
            for r in requires.iter_mut() {
                self.check(r, &Type::Bool)?;
            }
            self.check_stmt(body)?;
            for e in ensures.iter_mut() {
                self.check(e, &Type::Bool)?;
            }
            if self.env == before {
                break;
            }
        }
        Ok(())
    }
}

/// Operand and result type of an operator
fn operator_types(op: Op) -> (Type, Type) {
    match op.class() {
        OpClass::Arith => (Type::Int, Type::Int),
        OpClass::Comparison => (Type::Int, Type::Bool),
        OpClass::Boolean => (Type::Bool, Type::Bool),
    }
}
