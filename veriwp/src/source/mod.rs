//! Host front-end: turns a parsed module into scopes of annotated functions

mod tree;

pub use tree::*;

use crate::ast::{Span, Spanned, Type};
use crate::error::{Result, VerifyError};
use crate::parser;
use serde::Serialize;
use tracing::debug;

/// Decorator that marks a function for verification
pub const VERIFY_DECORATOR: &str = "verify";

/// Top-level call that opens a new scope
pub const SCOPE_CALL: &str = "scope";

/// A function ready for verification, with its contract still as text
#[derive(Debug, Clone, Serialize)]
pub struct SourceFunction {
    pub name: String,
    pub params: Vec<(String, Option<Type>)>,
    /// Declared return annotation; verification refuses functions without one
    pub ret_ty: Option<TypeAnnotation>,
    pub requires: Vec<Spanned<String>>,
    pub ensures: Vec<Spanned<String>>,
    pub body: Vec<Spanned<SourceStmt>>,
    pub span: Span,
}

/// Named group of functions verified together
#[derive(Debug, Clone, Serialize)]
pub struct SourceScope {
    pub name: String,
    pub functions: Vec<SourceFunction>,
}

/// All scopes of a host file in declaration order
#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceModule {
    pub scopes: Vec<SourceScope>,
}

impl SourceModule {
    pub fn scope(&self, name: &str) -> Option<&SourceScope> {
        self.scopes.iter().find(|s| s.name == name)
    }

    pub fn function_count(&self) -> usize {
        self.scopes.iter().map(|s| s.functions.len()).sum()
    }
}

/// Parse a host file and group its verified functions into scopes.
///
/// Functions declared before any `scope("...")` call land in `default_scope`.
pub fn load_module(source: &str, default_scope: &str) -> Result<SourceModule> {
    let items = parser::parse_module(source)?;
    let mut scopes = vec![SourceScope {
        name: default_scope.to_string(),
        functions: Vec::new(),
    }];

    for item in items {
        match item {
            SourceItem::Function(def) => {
                if let Some(function) = lower_function(def)? {
                    if let Some(scope) = scopes.last_mut() {
                        scope.functions.push(function);
                    }
                }
            }
            SourceItem::Stmt(stmt) => {
                let name = scope_call(&stmt)?;
                if scopes.iter().any(|s| s.name == name) {
                    return Err(VerifyError::parse(
                        format!("scope `{name}` is declared twice"),
                        stmt.span,
                    ));
                }
                debug!(scope = %name, "opening scope");
                scopes.push(SourceScope {
                    name,
                    functions: Vec::new(),
                });
            }
        }
    }

    // The implicit scope only survives when it holds something
    if scopes.first().is_some_and(|s| s.functions.is_empty()) && scopes.len() > 1 {
        scopes.remove(0);
    }

    Ok(SourceModule { scopes })
}

/// Name from a top-level `scope("name")` statement
fn scope_call(stmt: &Spanned<SourceStmt>) -> Result<String> {
    if let SourceStmt::Expr(expr) = &stmt.node
        && let SourceExpr::Call { func, args } = &expr.node
        && func.node == SCOPE_CALL
    {
        return match args.as_slice() {
            [Spanned {
                node: SourceExpr::Str(name),
                ..
            }] => Ok(name.clone()),
            _ => Err(VerifyError::parse(
                "scope() takes exactly one string argument",
                expr.span,
            )),
        };
    }
    Err(VerifyError::unsupported_at(
        "only function definitions and scope(...) calls are allowed at top level",
        stmt.span,
    ))
}

fn lower_function(def: FunctionDef) -> Result<Option<SourceFunction>> {
    let mut verify = None;
    for decorator in &def.decorators {
        if decorator.name.node == VERIFY_DECORATOR {
            verify = Some(decorator);
        } else {
            return Err(VerifyError::unsupported_at(
                format!("unknown decorator `@{}`", decorator.name.node),
                decorator.span,
            ));
        }
    }
    let Some(verify) = verify else {
        debug!(function = %def.name.node, "skipping function without @verify");
        return Ok(None);
    };

    let mut requires = Vec::new();
    let mut ensures = Vec::new();
    for (key, value) in &verify.kwargs {
        let target = match key.node.as_str() {
            "requires" => &mut requires,
            "ensures" => &mut ensures,
            other => {
                return Err(VerifyError::unsupported_at(
                    format!("unknown @verify argument `{other}`"),
                    key.span,
                ));
            }
        };
        target.extend(contract_strings(value)?);
    }

    let params = def
        .params
        .iter()
        .map(|p| {
            let ty = p.ty.as_ref().map(TypeAnnotation::resolve).transpose()?;
            Ok((p.name.node.clone(), ty))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(SourceFunction {
        name: def.name.node,
        params,
        ret_ty: def.ret,
        requires,
        ensures,
        body: def.body,
        span: def.span,
    }))
}

/// Assertion strings of a `requires=[...]`/`ensures=[...]` list.
///
/// Each span points just past the opening quote, so assertion-relative error
/// spans can be shifted into the host file.
fn contract_strings(value: &Spanned<SourceExpr>) -> Result<Vec<Spanned<String>>> {
    let SourceExpr::List(items) = &value.node else {
        return Err(VerifyError::parse(
            "contract must be a list of assertion strings",
            value.span,
        ));
    };
    items
        .iter()
        .map(|item| match &item.node {
            SourceExpr::Str(text) => Ok(Spanned::new(
                text.clone(),
                Span::new(item.span.start + 1, item.span.end.saturating_sub(1)),
            )),
            _ => Err(VerifyError::parse(
                "contract entries must be string literals",
                item.span,
            )),
        })
        .collect()
}
