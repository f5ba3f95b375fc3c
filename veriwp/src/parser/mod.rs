//! Parser implementation using lalrpop

use crate::ast::{Expr, FreshNames, Span};
use crate::error::{Result, VerifyError};
use crate::lexer::{self, Token};
use crate::source::SourceItem;
use tracing::trace;

#[cfg(test)]
mod tests;

lalrpop_util::lalrpop_mod!(
    #[allow(clippy::all)]
    grammar,
    "/parser/grammar.rs"
);

type GrammarError = lalrpop_util::ParseError<usize, Token, VerifyError>;

fn convert_error(e: GrammarError) -> VerifyError {
    let span = match &e {
        lalrpop_util::ParseError::InvalidToken { location } => Span::new(*location, *location + 1),
        lalrpop_util::ParseError::UnrecognizedEof { location, .. } => Span::point(*location),
        lalrpop_util::ParseError::UnrecognizedToken { token, .. } => Span::new(token.0, token.2),
        lalrpop_util::ParseError::ExtraToken { token } => Span::new(token.0, token.2),
        lalrpop_util::ParseError::User { .. } => Span::default(),
    };
    match e {
        lalrpop_util::ParseError::User { error } => error,
        other => VerifyError::parse(format!("{other}"), span),
    }
}

fn token_stream(tokens: Vec<(Token, Span)>) -> impl Iterator<Item = (usize, Token, usize)> {
    tokens
        .into_iter()
        .map(|(tok, span)| (span.start, tok, span.end))
}

/// Parse assertion text into an expression.
///
/// Every quantifier binder is renamed to a fresh name from `fresh`, so no
/// two quantifiers produced through the same generator share a bound name.
pub fn parse_assertion(text: &str, fresh: &mut FreshNames) -> Result<Expr> {
    let tokens = lexer::tokenize(text)?;
    let expr = grammar::AssertionParser::new()
        .parse(token_stream(tokens))
        .map_err(convert_error)?;
    let expr = fresh.alpha_rename(&expr);
    trace!(%text, %expr, "parsed assertion");
    Ok(expr)
}

/// Parse a host module into its top-level items
pub fn parse_module(source: &str) -> Result<Vec<SourceItem>> {
    let tokens = lexer::tokenize_module(source)?;
    grammar::ModuleParser::new()
        .parse(token_stream(tokens))
        .map_err(convert_error)
}
