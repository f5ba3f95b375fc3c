//! Source location tracking

use serde::{Deserialize, Serialize};

/// A byte range in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Zero-width span at `offset`
    pub fn point(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Shift both ends by `offset` (assertion strings embedded in a host file)
    pub fn offset(self, offset: usize) -> Span {
        Span::new(self.start + offset, self.end + offset)
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

impl From<Span> for std::ops::Range<usize> {
    fn from(span: Span) -> Self {
        span.start..span.end
    }
}

impl From<std::ops::Range<usize>> for Span {
    fn from(range: std::ops::Range<usize>) -> Self {
        Span::new(range.start, range.end)
    }
}

/// A value with source location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Spanned<U> {
        Spanned {
            node: f(self.node),
            span: self.span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_merge_is_order_independent() {
        let a = Span::new(10, 20);
        let b = Span::new(0, 5);
        assert_eq!(a.merge(b), Span::new(0, 20));
        assert_eq!(b.merge(a), Span::new(0, 20));
    }

    #[test]
    fn test_span_offset() {
        assert_eq!(Span::new(2, 4).offset(10), Span::new(12, 14));
    }

    #[test]
    fn test_span_range_conversion() {
        let range: std::ops::Range<usize> = Span::new(3, 9).into();
        assert_eq!(range, 3..9);
        assert_eq!(Span::from(1..2), Span::new(1, 2));
    }

    #[test]
    fn test_spanned_map_keeps_span() {
        let s = Spanned::new(21, Span::new(1, 3)).map(|n| n * 2);
        assert_eq!(s.node, 42);
        assert_eq!(s.span, Span::new(1, 3));
    }
}
