//! Byte spans over query text.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A half-open byte range into query text.
///
/// Spans originate as lexer token extents and travel with syntax nodes
/// and supplied values. The zero span marks a slot a node does not
/// fill, such as the alias of an unaliased field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Span {
    /// First byte covered.
    pub start: u32,
    /// One past the last byte covered.
    pub end: u32,
}

impl Span {
    #[must_use]
    #[inline]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// A zero-width span, as produced for the EOF token.
    #[must_use]
    #[inline]
    pub const fn empty(at: u32) -> Self {
        Self { start: at, end: at }
    }

    #[must_use]
    #[inline]
    pub const fn len(self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// The span as a range suitable for slicing source text.
    #[must_use]
    pub fn as_range(self) -> std::ops::Range<usize> {
        self.start as usize..self.end as usize
    }
}

impl From<Span> for miette::SourceSpan {
    fn from(span: Span) -> Self {
        (span.start as usize, span.len() as usize).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_range_slices_text() {
        let text = "query { dog }";
        let span = Span::new(8, 11);
        assert_eq!(&text[span.as_range()], "dog");
    }

    #[test]
    fn test_zero_width_span() {
        let span = Span::empty(4);
        assert!(span.is_empty());
        assert_eq!(span.len(), 0);
        assert_eq!(span.as_range(), 4..4);
    }

    #[test]
    fn test_inverted_span_has_no_length() {
        assert_eq!(Span::new(9, 3).len(), 0);
    }
}
