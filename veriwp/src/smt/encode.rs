//! IR to SMT-LIB2 translation
//!
//! Every IR variable `x` becomes the constant `v_x`; the prefix keeps user
//! names apart from SMT-LIB reserved words and from the helper functions
//! declared here. Integer division and modulo follow floor semantics
//! (`//` and `%` as in the host language), defined on top of SMT-LIB's
//! Euclidean `div`/`mod` by `floor_div` and `floor_mod`.

use std::collections::BTreeSet;

use crate::ast::{Expr, Op, Type, Value};
use crate::error::{Result, VerifyError};
use crate::translate::STORE;
use crate::types::TypeEnv;

use super::solver::Declaration;

/// Prefix of every symbol standing for an IR variable
pub const SYMBOL_PREFIX: &str = "v_";

/// SMT-LIB2 sorts
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SmtSort {
    Int,
    Bool,
    /// (Array Index Element)
    Array(Box<SmtSort>, Box<SmtSort>),
}

impl SmtSort {
    /// Integer-indexed array of `elem`
    pub fn array(elem: SmtSort) -> Self {
        SmtSort::Array(Box::new(SmtSort::Int), Box::new(elem))
    }

    pub fn to_smt(&self) -> String {
        match self {
            SmtSort::Int => "Int".to_string(),
            SmtSort::Bool => "Bool".to_string(),
            SmtSort::Array(idx, elem) => format!("(Array {} {})", idx.to_smt(), elem.to_smt()),
        }
    }

    /// Identifier fragment naming the sort, used for per-sort helper functions
    fn mangle(&self) -> String {
        match self {
            SmtSort::Int => "Int".to_string(),
            SmtSort::Bool => "Bool".to_string(),
            SmtSort::Array(_, elem) => format!("Arr_{}", elem.mangle()),
        }
    }

    /// Sort of a fully resolved IR type
    pub fn from_type(ty: &Type) -> Result<SmtSort> {
        match ty {
            Type::Int => Ok(SmtSort::Int),
            Type::Bool => Ok(SmtSort::Bool),
            Type::Array(elem) => Ok(SmtSort::array(SmtSort::from_type(elem)?)),
            Type::Any => Err(VerifyError::type_error("unresolved type reached the encoder")),
            Type::Slice | Type::Arrow(..) | Type::Prod(_) => Err(VerifyError::unsupported(
                format!("values of type `{ty}` have no solver sort"),
            )),
        }
    }
}

fn is_simple_symbol_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "~!@$%^&*_-+=<>.?/".contains(c)
}

/// Solver symbol of an IR variable, `|quoted|` when the name needs it
pub fn symbol(name: &str) -> String {
    if name.chars().all(is_simple_symbol_char) {
        format!("{SYMBOL_PREFIX}{name}")
    } else {
        format!("|{SYMBOL_PREFIX}{name}|")
    }
}

/// Name of the length function for arrays of sort `array`
pub fn len_function(array: &SmtSort) -> String {
    match array {
        SmtSort::Array(_, elem) => format!("len_{}", elem.mangle()),
        other => format!("len_{}", other.mangle()),
    }
}

/// Floor division and modulo over SMT-LIB's Euclidean operators
pub fn preamble() -> Vec<Declaration> {
    let params = vec![("a".to_string(), SmtSort::Int), ("b".to_string(), SmtSort::Int)];
    vec![
        Declaration::Define {
            name: "floor_div".to_string(),
            params: params.clone(),
            ret: SmtSort::Int,
            body: "(ite (>= b 0) (div a b) (div (- a) (- b)))".to_string(),
        },
        Declaration::Define {
            name: "floor_mod".to_string(),
            params,
            ret: SmtSort::Int,
            body: "(ite (>= b 0) (mod a b) (- (mod (- a) (- b))))".to_string(),
        },
    ]
}

/// `len` and its axioms for one array sort
fn len_declarations(array: &SmtSort) -> Vec<Declaration> {
    let SmtSort::Array(_, elem) = array else {
        return Vec::new();
    };
    let len = len_function(array);
    let a = array.to_smt();
    let v = elem.to_smt();
    vec![
        Declaration::Fun {
            name: len.clone(),
            params: vec![array.clone()],
            ret: SmtSort::Int,
        },
        Declaration::Axiom(format!("(forall ((a {a})) (>= ({len} a) 0))")),
        Declaration::Axiom(format!(
            "(forall ((a {a}) (i Int) (v {v})) (= ({len} (store a i v)) ({len} a)))"
        )),
    ]
}

/// Everything to declare before checking `formulas`: the preamble, one
/// constant per free variable and `len` for every array sort in use.
///
/// A free variable must have a resolved type in `env`.
pub fn declarations(env: &TypeEnv, formulas: &[&Expr]) -> Result<Vec<Declaration>> {
    let mut free = BTreeSet::new();
    let mut sorts = BTreeSet::new();
    for formula in formulas {
        free.extend(formula.free_vars());
        collect_quantifier_sorts(formula, &mut sorts)?;
    }

    let mut consts = Vec::new();
    for name in &free {
        let ty = env.get(name).ok_or_else(|| {
            VerifyError::type_error(format!("undefined variable in obligation: `{name}`"))
        })?;
        if !ty.is_concrete() {
            return Err(VerifyError::type_error(format!(
                "cannot determine the type of `{name}`"
            )));
        }
        let sort = SmtSort::from_type(ty)?;
        collect_array_sorts(&sort, &mut sorts);
        consts.push(Declaration::Const {
            name: symbol(name),
            sort,
        });
    }

    let mut decls = preamble();
    decls.extend(consts);
    for sort in &sorts {
        decls.extend(len_declarations(sort));
    }
    Ok(decls)
}

fn collect_array_sorts(sort: &SmtSort, out: &mut BTreeSet<SmtSort>) {
    if let SmtSort::Array(_, elem) = sort {
        out.insert(sort.clone());
        collect_array_sorts(elem, out);
    }
}

fn collect_quantifier_sorts(expr: &Expr, out: &mut BTreeSet<SmtSort>) -> Result<()> {
    match expr {
        Expr::Var(_) | Expr::Literal(_) => Ok(()),
        Expr::BinOp { left, right, .. } => {
            collect_quantifier_sorts(left, out)?;
            collect_quantifier_sorts(right, out)
        }
        Expr::UnOp { operand, .. } => collect_quantifier_sorts(operand, out),
        Expr::Subscript { base, index } => {
            collect_quantifier_sorts(base, out)?;
            collect_quantifier_sorts(index, out)
        }
        Expr::Slice { lower, upper, step } => {
            collect_quantifier_sorts(lower, out)?;
            if let Some(upper) = upper {
                collect_quantifier_sorts(upper, out)?;
            }
            collect_quantifier_sorts(step, out)
        }
        Expr::FunctionCall { args, .. } => {
            args.iter().try_for_each(|a| collect_quantifier_sorts(a, out))
        }
        Expr::Quantification { body, ty, .. } => {
            if let Some(ty) = ty {
                collect_array_sorts(&SmtSort::from_type(ty)?, out);
            }
            collect_quantifier_sorts(body, out)
        }
    }
}

/// Structural translation of IR expressions
pub struct Encoder<'a> {
    env: &'a TypeEnv,
    /// Quantifier binders currently in scope, innermost last
    bound: Vec<(String, Type)>,
}

impl<'a> Encoder<'a> {
    pub fn new(env: &'a TypeEnv) -> Self {
        Self {
            env,
            bound: Vec::new(),
        }
    }

    fn var_type(&self, name: &str) -> Result<Type> {
        self.bound
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t.clone())
            .or_else(|| self.env.get(name).cloned())
            .ok_or_else(|| VerifyError::type_error(format!("undefined variable: `{name}`")))
    }

    /// Type of an already checked expression
    pub fn type_of(&self, expr: &Expr) -> Result<Type> {
        match expr {
            Expr::Var(name) => self.var_type(name),
            Expr::Literal(Value::Int(_)) => Ok(Type::Int),
            Expr::Literal(Value::Bool(_)) => Ok(Type::Bool),
            Expr::BinOp { op, .. } | Expr::UnOp { op, .. } => Ok(match op {
                Op::Add | Op::Minus | Op::Mult | Op::IntDiv | Op::Mod | Op::Neg => Type::Int,
                _ => Type::Bool,
            }),
            Expr::Subscript { base, .. } => match self.type_of(base)? {
                Type::Array(elem) => Ok(*elem),
                other => Err(VerifyError::type_error(format!(
                    "cannot subscript a value of type `{other}`"
                ))),
            },
            Expr::Slice { .. } => Ok(Type::Slice),
            Expr::FunctionCall { name, args } => match (name.as_str(), args.first()) {
                ("len", _) => Ok(Type::Int),
                (STORE, Some(array)) => self.type_of(array),
                _ => Err(VerifyError::unsupported(format!("function `{name}`"))),
            },
            Expr::Quantification { .. } => Ok(Type::Bool),
        }
    }

    /// Translate an expression to an SMT-LIB term
    pub fn encode(&mut self, expr: &Expr) -> Result<String> {
        stacker::maybe_grow(crate::STACK_RED_ZONE, crate::STACK_GROW_SIZE, || {
            self.encode_inner(expr)
        })
    }

    fn encode_inner(&mut self, expr: &Expr) -> Result<String> {
        match expr {
            Expr::Var(name) => Ok(symbol(name)),
            Expr::Literal(Value::Int(n)) if *n < 0 => Ok(format!("(- {})", n.unsigned_abs())),
            Expr::Literal(Value::Int(n)) => Ok(n.to_string()),
            Expr::Literal(Value::Bool(b)) => Ok(b.to_string()),

            Expr::BinOp { left, op, right } => {
                let l = self.encode(left)?;
                let r = self.encode(right)?;
                Ok(match op {
                    Op::Neq => format!("(not (= {l} {r}))"),
                    op => format!("({} {l} {r})", binop_symbol(*op)),
                })
            }

            Expr::UnOp { op: Op::Not, operand } => Ok(format!("(not {})", self.encode(operand)?)),
            Expr::UnOp { operand, .. } => Ok(format!("(- {})", self.encode(operand)?)),

            Expr::Subscript { base, index } => {
                if matches!(**index, Expr::Slice { .. }) {
                    return Err(VerifyError::unsupported(format!(
                        "slices cannot be encoded for the solver: `{expr}`"
                    )));
                }
                Ok(format!("(select {} {})", self.encode(base)?, self.encode(index)?))
            }

            Expr::Slice { .. } => Err(VerifyError::unsupported(format!(
                "slices cannot be encoded for the solver: `{expr}`"
            ))),

            Expr::FunctionCall { name, args } => {
                let encoded = args
                    .iter()
                    .map(|a| self.encode(a))
                    .collect::<Result<Vec<_>>>()?;
                match (name.as_str(), args.as_slice()) {
                    ("len", [array]) => {
                        let sort = SmtSort::from_type(&self.type_of(array)?)?;
                        Ok(format!("({} {})", len_function(&sort), encoded[0]))
                    }
                    (STORE, [_, _, _]) => Ok(format!("(store {})", encoded.join(" "))),
                    _ => Err(VerifyError::unsupported(format!(
                        "call to `{name}` with {} argument(s)",
                        args.len()
                    ))),
                }
            }

            Expr::Quantification { var, body, ty } => {
                let Some(ty) = ty else {
                    return Err(VerifyError::type_error(format!(
                        "quantified variable `{var}` has no resolved type"
                    )));
                };
                let sort = SmtSort::from_type(ty)?;
                self.bound.push((var.clone(), ty.clone()));
                let body = self.encode(body);
                self.bound.pop();
                Ok(format!("(forall (({} {})) {})", symbol(var), sort.to_smt(), body?))
            }
        }
    }
}

fn binop_symbol(op: Op) -> &'static str {
    match op {
        Op::Add => "+",
        Op::Minus | Op::Neg => "-",
        Op::Mult => "*",
        Op::IntDiv => "floor_div",
        Op::Mod => "floor_mod",
        Op::Eq | Op::Iff => "=",
        Op::Neq => "distinct",
        Op::Lt => "<",
        Op::Le => "<=",
        Op::Gt => ">",
        Op::Ge => ">=",
        Op::And => "and",
        Op::Or => "or",
        Op::Not => "not",
        Op::Implies => "=>",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::FreshNames;
    use crate::parser::parse_assertion;
    use crate::types::TypeChecker;

    fn env() -> TypeEnv {
        TypeEnv::from([
            ("x".to_string(), Type::Int),
            ("p".to_string(), Type::Bool),
            ("xs".to_string(), Type::array(Type::Int)),
        ])
    }

    /// Parse, type check and encode
    fn encode(text: &str) -> Result<String> {
        let mut e = parse_assertion(text, &mut FreshNames::new())?;
        let mut tc = TypeChecker::with_env(env());
        tc.infer(&mut e)?;
        Encoder::new(&env()).encode(&e)
    }

    #[test]
    fn test_sorts() {
        assert_eq!(SmtSort::from_type(&Type::array(Type::Bool)).unwrap().to_smt(), "(Array Int Bool)");
        assert!(SmtSort::from_type(&Type::Any).is_err());
        assert!(SmtSort::from_type(&Type::Slice).is_err());
    }

    #[test]
    fn test_symbols() {
        assert_eq!(symbol("x"), "v_x");
        assert_eq!(symbol("x$3"), "v_x$3");
        assert_eq!(symbol("y'"), "|v_y'|");
    }

    #[test]
    fn test_operators() {
        assert_eq!(encode("x + 1 > -2").unwrap(), "(> (+ v_x 1) (- 2))");
        assert_eq!(encode("x != 0").unwrap(), "(not (= v_x 0))");
        assert_eq!(encode("p <==> x == 0").unwrap(), "(= v_p (= v_x 0))");
        assert_eq!(encode("p ==> not p").unwrap(), "(=> v_p (not v_p))");
        assert_eq!(encode("x // 2 == x % 2").unwrap(), "(= (floor_div v_x 2) (floor_mod v_x 2))");
        assert_eq!(encode("-x < 0").unwrap(), "(< (- v_x) 0)");
    }

    #[test]
    fn test_arrays() {
        assert_eq!(encode("len(xs) > 0").unwrap(), "(> (len_Int v_xs) 0)");
        assert_eq!(encode("xs[0] == 1").unwrap(), "(= (select v_xs 0) 1)");
        let stored = Expr::call(STORE, vec![Expr::var("xs"), Expr::int(0), Expr::int(5)]);
        assert_eq!(
            Encoder::new(&env()).encode(&stored).unwrap(),
            "(store v_xs 0 5)"
        );
    }

    #[test]
    fn test_quantifier() {
        assert_eq!(
            encode("forall y :: y > x").unwrap(),
            "(forall ((v_y$1 Int)) (> v_y$1 v_x))"
        );
        let untyped = Expr::forall("k", None, Expr::bool(true));
        let err = Encoder::new(&env()).encode(&untyped).unwrap_err();
        assert!(matches!(err, VerifyError::Type { .. }));
    }

    #[test]
    fn test_slices_are_rejected() {
        let err = encode("len(xs[1:]) > 0").unwrap_err();
        assert!(matches!(err, VerifyError::Unsupported { .. }));
    }

    #[test]
    fn test_declarations() {
        let f = parse_assertion("len(xs) > x", &mut FreshNames::new()).unwrap();
        let decls = declarations(&env(), &[&f]).unwrap();
        let text: Vec<String> = decls.iter().map(Declaration::to_smt).collect();
        assert!(text[0].starts_with("(define-fun floor_div"));
        assert!(text.contains(&"(declare-const v_x Int)".to_string()));
        assert!(text.contains(&"(declare-const v_xs (Array Int Int))".to_string()));
        assert!(text.contains(&"(declare-fun len_Int ((Array Int Int)) Int)".to_string()));
        assert!(!text.iter().any(|t| t.contains("v_p")));
    }

    #[test]
    fn test_declarations_reject_unresolved() {
        let env = TypeEnv::from([("q".to_string(), Type::Any)]);
        let f = Expr::var("q");
        assert!(declarations(&env, &[&f]).is_err());
        assert!(declarations(&TypeEnv::new(), &[&f]).is_err());
    }
}
