//! Runtime values for the interpreter

use std::fmt;

use super::error::{InterpResult, RuntimeError};

/// Runtime value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Array(Vec<Value>),
}

impl Value {
    /// Get type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
            Value::Array(_) => "list",
        }
    }

    pub fn as_int(&self) -> InterpResult<i64> {
        match self {
            Value::Int(n) => Ok(*n),
            other => Err(RuntimeError::type_error("int", other.type_name())),
        }
    }

    pub fn as_bool(&self) -> InterpResult<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(RuntimeError::type_error("bool", other.type_name())),
        }
    }

    pub fn as_array(&self) -> InterpResult<&[Value]> {
        match self {
            Value::Array(items) => Ok(items),
            other => Err(RuntimeError::type_error("list", other.type_name())),
        }
    }

    pub fn int_array(items: impl IntoIterator<Item = i64>) -> Self {
        Value::Array(items.into_iter().map(Value::Int).collect())
    }
}

impl From<crate::ast::Value> for Value {
    fn from(v: crate::ast::Value) -> Self {
        match v {
            crate::ast::Value::Int(n) => Value::Int(n),
            crate::ast::Value::Bool(b) => Value::Bool(b),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
        }
    }
}
