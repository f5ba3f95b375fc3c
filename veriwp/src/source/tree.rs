//! Syntax tree of the host language (Python subset)

use crate::ast::{Op, Span, Spanned, Type};
use crate::error::{Result, VerifyError};
use serde::{Deserialize, Serialize};

/// Type annotation as written, e.g. `List[int]` or `None`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeAnnotation {
    pub name: String,
    pub args: Vec<TypeAnnotation>,
    pub span: Span,
}

impl TypeAnnotation {
    /// Resolve to an IR type; `None` and unknown names are rejected
    pub fn resolve(&self) -> Result<Type> {
        let args = self
            .args
            .iter()
            .map(TypeAnnotation::resolve)
            .collect::<Result<Vec<_>>>()?;
        Type::from_annotation(&self.name, &args).ok_or_else(|| {
            VerifyError::type_error_at(format!("unsupported type annotation `{self}`"), self.span)
        })
    }
}

impl std::fmt::Display for TypeAnnotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.args.is_empty() {
            let args: Vec<String> = self.args.iter().map(ToString::to_string).collect();
            write!(f, "[{}]", args.join(", "))?;
        }
        Ok(())
    }
}

/// Host expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SourceExpr {
    Name(String),
    Int(i64),
    Bool(bool),
    Str(String),
    BinOp {
        left: Box<Spanned<SourceExpr>>,
        op: Op,
        right: Box<Spanned<SourceExpr>>,
    },
    UnaryOp {
        op: Op,
        operand: Box<Spanned<SourceExpr>>,
    },
    /// `and`/`or` with all operands of a chain, as in Python
    BoolOp {
        op: Op,
        values: Vec<Spanned<SourceExpr>>,
    },
    /// Comparison chain `a < b <= c`
    Compare {
        left: Box<Spanned<SourceExpr>>,
        rest: Vec<(Op, Spanned<SourceExpr>)>,
    },
    Call {
        func: Spanned<String>,
        args: Vec<Spanned<SourceExpr>>,
    },
    Subscript {
        value: Box<Spanned<SourceExpr>>,
        index: Box<Spanned<SourceExpr>>,
    },
    Slice {
        lower: Option<Box<Spanned<SourceExpr>>>,
        upper: Option<Box<Spanned<SourceExpr>>>,
        step: Option<Box<Spanned<SourceExpr>>>,
    },
    List(Vec<Spanned<SourceExpr>>),
}

/// Host statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SourceStmt {
    Assign {
        target: Spanned<SourceExpr>,
        value: Spanned<SourceExpr>,
    },
    /// `elif` chains are nested in `orelse`
    If {
        cond: Spanned<SourceExpr>,
        body: Vec<Spanned<SourceStmt>>,
        orelse: Vec<Spanned<SourceStmt>>,
    },
    While {
        cond: Spanned<SourceExpr>,
        body: Vec<Spanned<SourceStmt>>,
    },
    Return(Option<Spanned<SourceExpr>>),
    Pass,
    Assert(Spanned<SourceExpr>),
    Expr(Spanned<SourceExpr>),
}

/// `@name(key=value, ...)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decorator {
    pub name: Spanned<String>,
    pub kwargs: Vec<(Spanned<String>, Spanned<SourceExpr>)>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: Spanned<String>,
    pub ty: Option<TypeAnnotation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub decorators: Vec<Decorator>,
    pub name: Spanned<String>,
    pub params: Vec<Param>,
    pub ret: Option<TypeAnnotation>,
    pub body: Vec<Spanned<SourceStmt>>,
    pub span: Span,
}

/// Top-level item of a host module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SourceItem {
    Function(FunctionDef),
    Stmt(Spanned<SourceStmt>),
}
