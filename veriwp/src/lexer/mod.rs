//! Lexer implementation using logos

mod token;

pub use token::Token;

use crate::ast::Span;
use crate::error::{Result, VerifyError};
use logos::Logos;

/// Tokenize assertion text (no layout tokens)
pub fn tokenize(source: &str) -> Result<Vec<(Token, Span)>> {
    lex_fragment(source, 0)
}

fn lex_fragment(source: &str, base: usize) -> Result<Vec<(Token, Span)>> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        let span = Span::new(base + lexer.span().start, base + lexer.span().end);
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(_) => {
                return Err(VerifyError::lexer(
                    format!("unexpected character: {:?}", lexer.slice()),
                    span,
                ));
            }
        }
    }

    Ok(tokens)
}

/// Tokenize a host source file, inserting `Newline`, `Indent` and `Dedent`.
///
/// Blank and comment-only lines produce nothing. Inside open brackets a line
/// break is a continuation and indentation is ignored.
pub fn tokenize_module(source: &str) -> Result<Vec<(Token, Span)>> {
    let mut tokens = Vec::new();
    let mut indents: Vec<usize> = vec![0];
    let mut depth = 0usize;
    let mut line_start = 0usize;

    for line in source.split_inclusive('\n') {
        let start = line_start;
        line_start += line.len();
        let content = line.trim_end_matches(['\n', '\r']);

        let line_tokens = lex_fragment(content, start)?;
        if line_tokens.is_empty() {
            continue;
        }

        if depth == 0 {
            let leading = &content[..content.len() - content.trim_start().len()];
            let width = indent_width(leading);
            let leading = leading.len();
            let top = indents.last().copied().unwrap_or(0);
            if width > top {
                indents.push(width);
                tokens.push((Token::Indent, Span::new(start, start + leading)));
            } else if width < top {
                while indents.last().is_some_and(|&level| width < level) {
                    indents.pop();
                    tokens.push((Token::Dedent, Span::point(start + leading)));
                }
                if indents.last().copied() != Some(width) {
                    return Err(VerifyError::lexer(
                        "unindent does not match any outer indentation level",
                        Span::new(start, start + leading),
                    ));
                }
            }
        }

        for (token, span) in line_tokens {
            if token.opens_bracket() {
                depth += 1;
            } else if token.closes_bracket() {
                depth = depth.saturating_sub(1);
            }
            tokens.push((token, span));
        }

        if depth == 0 {
            tokens.push((Token::Newline, Span::point(start + content.len())));
        }
    }

    if depth > 0 {
        return Err(VerifyError::lexer(
            "unexpected end of file inside brackets",
            Span::point(source.len()),
        ));
    }
    while indents.len() > 1 {
        indents.pop();
        tokens.push((Token::Dedent, Span::point(source.len())));
    }

    Ok(tokens)
}

/// Column reached by a run of leading whitespace; tabs advance to the next multiple of 8
fn indent_width(leading: &str) -> usize {
    leading.chars().fold(0, |col, c| match c {
        '\t' => (col / TAB_SIZE + 1) * TAB_SIZE,
        _ => col + 1,
    })
}

const TAB_SIZE: usize = 8;
