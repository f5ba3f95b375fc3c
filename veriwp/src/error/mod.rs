//! Error types and reporting

use crate::ast::Span;
use crate::smt::{Model, SolverError};
use crate::wp::ObligationKind;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, VerifyError>;

/// Verification error
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("Lexer error at {span}: {message}")]
    Lexer { message: String, span: Span },

    /// Malformed assertion text or host source
    #[error("Parse error: {message}")]
    Parse { message: String, span: Option<Span> },

    /// Type mismatch, unknown identifier or unresolvable quantified variable
    #[error("Type error: {message}")]
    Type { message: String, span: Option<Span> },

    /// Source construct the translator or encoder does not handle
    #[error("Unsupported construct: {message}")]
    Unsupported { message: String, span: Option<Span> },

    /// A `While` reached the WP engine without being desugared
    #[error("Unsupported construct: while loop reached the WP engine undesugared")]
    UndesugaredLoop,

    #[error("function `{function}` has no declared return type")]
    MissingReturnType { function: String, span: Option<Span> },

    /// Negation of an obligation is satisfiable
    #[error("Verification violated in `{function}` ({kind}): {obligation}\ncounterexample: {model}")]
    Violated {
        function: String,
        kind: ObligationKind,
        obligation: String,
        model: Model,
    },

    /// Solver could not decide an obligation
    #[error("Solver returned unknown in `{function}` ({reason}): {obligation}")]
    SolverUnknown {
        function: String,
        obligation: String,
        reason: String,
    },

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error("IO error: {message}")]
    Io { message: String },

    #[error("Config error: {message}")]
    Config { message: String },
}

impl VerifyError {
    pub fn lexer(message: impl Into<String>, span: Span) -> Self {
        Self::Lexer {
            message: message.into(),
            span,
        }
    }

    pub fn parse(message: impl Into<String>, span: Span) -> Self {
        Self::Parse {
            message: message.into(),
            span: Some(span),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::Type {
            message: message.into(),
            span: None,
        }
    }

    pub fn type_error_at(message: impl Into<String>, span: Span) -> Self {
        Self::Type {
            message: message.into(),
            span: Some(span),
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
            span: None,
        }
    }

    pub fn unsupported_at(message: impl Into<String>, span: Span) -> Self {
        Self::Unsupported {
            message: message.into(),
            span: Some(span),
        }
    }

    pub fn io_error(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Shift the span by `offset`.
    ///
    /// Assertions are parsed out of string literals, so their spans start at
    /// zero and have to be moved to the literal's position in the host file.
    pub fn offset(self, offset: usize) -> Self {
        match self {
            Self::Lexer { message, span } => Self::Lexer {
                message,
                span: span.offset(offset),
            },
            Self::Parse { message, span } => Self::Parse {
                message,
                span: span.map(|s| s.offset(offset)),
            },
            Self::Type { message, span } => Self::Type {
                message,
                span: span.map(|s| s.offset(offset)),
            },
            Self::Unsupported { message, span } => Self::Unsupported {
                message,
                span: span.map(|s| s.offset(offset)),
            },
            other => other,
        }
    }

    /// Attach `span` to an error that has none yet
    pub fn or_span(self, span: Span) -> Self {
        match self {
            Self::Parse { message, span: None } => Self::Parse {
                message,
                span: Some(span),
            },
            Self::Type { message, span: None } => Self::Type {
                message,
                span: Some(span),
            },
            Self::Unsupported { message, span: None } => Self::Unsupported {
                message,
                span: Some(span),
            },
            other => other,
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Lexer { span, .. } => Some(*span),
            Self::Parse { span, .. }
            | Self::Type { span, .. }
            | Self::Unsupported { span, .. }
            | Self::MissingReturnType { span, .. } => *span,
            Self::UndesugaredLoop
            | Self::Violated { .. }
            | Self::SolverUnknown { .. }
            | Self::Solver(_)
            | Self::Io { .. }
            | Self::Config { .. } => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Lexer { message, .. }
            | Self::Parse { message, .. }
            | Self::Type { message, .. }
            | Self::Unsupported { message, .. }
            | Self::Io { message }
            | Self::Config { message } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Short category label used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Lexer { .. } => "Lexer",
            Self::Parse { .. } => "Parse",
            Self::Type { .. } => "Type",
            Self::Unsupported { .. } | Self::UndesugaredLoop => "Unsupported",
            Self::MissingReturnType { .. } => "Signature",
            Self::Violated { .. } => "Verification",
            Self::SolverUnknown { .. } | Self::Solver(_) => "Solver",
            Self::Io { .. } => "IO",
            Self::Config { .. } => "Config",
        }
    }

    /// Obligation outcome rather than a malformed input
    pub fn is_verification_failure(&self) -> bool {
        matches!(self, Self::Violated { .. } | Self::SolverUnknown { .. })
    }

    /// Errors that abort a run regardless of run mode
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UndesugaredLoop | Self::Solver(_) | Self::Io { .. } | Self::Config { .. }
        )
    }
}

impl From<std::io::Error> for VerifyError {
    fn from(err: std::io::Error) -> Self {
        Self::io_error(err.to_string())
    }
}

/// Report error with ariadne
pub fn report_error(filename: &str, source: &str, error: &VerifyError) -> std::io::Result<()> {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let kind = error.kind();

    if let Some(span) = error.span() {
        let end = span.end.max(span.start + 1).min(source.len().max(1));
        let start = span.start.min(end);
        Report::build(ReportKind::Error, (filename, start..end))
            .with_message(format!("{kind} error"))
            .with_label(
                Label::new((filename, start..end))
                    .with_message(error.message())
                    .with_color(Color::Red),
            )
            .finish()
            .eprint((filename, Source::from(source)))
    } else {
        // Errors without span (solver outcomes, IO, config)
        Report::build(ReportKind::Error, (filename, 0..0))
            .with_message(format!("{kind} error: {}", error.message()))
            .finish()
            .eprint((filename, Source::from(source)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_moves_spans() {
        let err = VerifyError::parse("bad", Span::new(1, 2)).offset(10);
        assert_eq!(err.span(), Some(Span::new(11, 12)));
        assert_eq!(err.kind(), "Parse");
    }

    #[test]
    fn test_or_span_keeps_existing() {
        let err = VerifyError::type_error_at("x", Span::new(1, 2)).or_span(Span::new(5, 6));
        assert_eq!(err.span(), Some(Span::new(1, 2)));
        let err = VerifyError::unsupported("y").or_span(Span::new(5, 6));
        assert_eq!(err.span(), Some(Span::new(5, 6)));
    }

    #[test]
    fn test_fatality() {
        assert!(VerifyError::UndesugaredLoop.is_fatal());
        assert!(!VerifyError::type_error("t").is_fatal());
        assert!(!VerifyError::type_error("t").is_verification_failure());
    }
}
