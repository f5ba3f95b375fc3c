//! Types of the verification IR

use serde::{Deserialize, Serialize};

/// Type of an IR expression or variable
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// Mathematical integer
    Int,
    /// Boolean
    Bool,
    /// Integer-indexed array of the element type
    Array(Box<Type>),
    /// Slice `lo:hi:step` used as a subscript
    Slice,
    /// Function type (built-ins only)
    Arrow(Box<Type>, Box<Type>),
    /// Product of argument types
    Prod(Vec<Type>),
    /// Not yet resolved; only legal while inference is running
    Any,
}

impl Type {
    pub fn array(elem: Type) -> Self {
        Type::Array(Box::new(elem))
    }

    pub fn arrow(domain: Type, codomain: Type) -> Self {
        Type::Arrow(Box::new(domain), Box::new(codomain))
    }

    /// True when no `Any` occurs anywhere inside the type
    pub fn is_concrete(&self) -> bool {
        match self {
            Type::Int | Type::Bool | Type::Slice => true,
            Type::Any => false,
            Type::Array(elem) => elem.is_concrete(),
            Type::Arrow(a, b) => a.is_concrete() && b.is_concrete(),
            Type::Prod(tys) => tys.iter().all(Type::is_concrete),
        }
    }

    /// Structural compatibility where `Any` matches anything
    pub fn compatible(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Any, _) | (_, Type::Any) => true,
            (Type::Array(a), Type::Array(b)) => a.compatible(b),
            (Type::Arrow(a1, b1), Type::Arrow(a2, b2)) => a1.compatible(a2) && b1.compatible(b2),
            (Type::Prod(xs), Type::Prod(ys)) => {
                xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| x.compatible(y))
            }
            (a, b) => a == b,
        }
    }

    /// Combine two compatible types, keeping the more resolved parts of each
    pub fn refine(&self, other: &Type) -> Type {
        match (self, other) {
            (Type::Any, t) | (t, Type::Any) => t.clone(),
            (Type::Array(a), Type::Array(b)) => Type::array(a.refine(b)),
            (Type::Arrow(a1, b1), Type::Arrow(a2, b2)) => Type::arrow(a1.refine(a2), b1.refine(b2)),
            (Type::Prod(xs), Type::Prod(ys)) if xs.len() == ys.len() => {
                Type::Prod(xs.iter().zip(ys).map(|(x, y)| x.refine(y)).collect())
            }
            (a, _) => a.clone(),
        }
    }

    /// Resolve a host-syntax annotation such as `int` or `List[bool]`
    pub fn from_annotation(name: &str, args: &[Type]) -> Option<Type> {
        match (name, args) {
            ("int", []) => Some(Type::Int),
            ("bool", []) => Some(Type::Bool),
            ("List" | "list", [elem]) => Some(Type::array(elem.clone())),
            ("List" | "list", []) => Some(Type::array(Type::Any)),
            _ => None,
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Bool => write!(f, "bool"),
            Type::Array(elem) => write!(f, "List[{elem}]"),
            Type::Slice => write!(f, "slice"),
            Type::Arrow(a, b) => write!(f, "{a} -> {b}"),
            Type::Prod(tys) => {
                write!(f, "(")?;
                for (i, ty) in tys.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{ty}")?;
                }
                write!(f, ")")
            }
            Type::Any => write!(f, "?"),
        }
    }
}
