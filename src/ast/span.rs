//! Source positions: byte spans and spanned values.

use std::ops::Range;

/// A byte range in the query text.
pub type Span = Range<usize>;

/// A value paired with the place it was read from.
///
/// Path segments use this so a problem can point at one segment of
/// `e.address.city` rather than the whole path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }

    /// Maps the inner value while preserving the span.
    pub fn map<U, F>(self, f: F) -> Spanned<U>
    where
        F: FnOnce(T) -> U,
    {
        Spanned {
            node: f(self.node),
            span: self.span,
        }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}

impl<T> AsRef<T> for Spanned<T> {
    fn as_ref(&self) -> &T {
        &self.node
    }
}

/// Returns the smallest span covering both `start` and `end`.
pub fn cover(start: &Span, end: &Span) -> Span {
    start.start.min(end.start)..start.end.max(end.end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cover_is_order_independent() {
        assert_eq!(cover(&(3..5), &(10..12)), 3..12);
        assert_eq!(cover(&(10..12), &(3..5)), 3..12);
        assert_eq!(cover(&(4..4), &(4..4)), 4..4);
    }

    #[test]
    fn spanned_map_keeps_span() {
        let segment = Spanned::new("city", 10..14);
        let upper = segment.map(str::to_uppercase);
        assert_eq!(upper.node, "CITY");
        assert_eq!(upper.span(), &(10..14));
        assert_eq!(upper.as_ref(), "CITY");
    }
}
