//! Source text access and location tracking.

use crate::span::Span;
use memchr::memchr_iter;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An immutable snapshot of a position in source text.
///
/// Many nodes and messages share one location; it is never mutated after
/// creation. [`SourceLocation::NONE`] represents the absence of a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SourceLocation {
    /// Absolute byte offset into the source.
    pub absolute: u32,
    /// 1-based line number. Zero means "no location".
    pub line: u32,
    /// 1-based column within the line.
    pub column: u32,
    /// Span of the full line containing this location.
    pub line_span: Span,
}

impl SourceLocation {
    /// The singleton "no location" value.
    pub const NONE: SourceLocation = SourceLocation {
        absolute: 0,
        line: 0,
        column: 0,
        line_span: Span::empty(0),
    };

    /// Returns true if this is the "no location" value.
    #[must_use]
    #[inline]
    pub const fn is_none(&self) -> bool {
        self.line == 0
    }
}

impl Default for SourceLocation {
    fn default() -> Self {
        Self::NONE
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_none() {
            write!(f, "<unknown>")
        } else {
            write!(f, "{}:{}", self.line, self.column)
        }
    }
}

/// Wraps raw query text, offering slice access and location lookup.
///
/// Line starts are indexed once up front so that turning a byte offset into
/// a (line, column) pair is a binary search, not a rescan.
#[derive(Debug, Clone)]
pub struct SourceText {
    text: String,
    line_starts: Vec<u32>,
}

impl SourceText {
    /// Creates a source text wrapper, indexing line starts.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut line_starts = Vec::with_capacity(16);
        line_starts.push(0);
        for nl in memchr_iter(b'\n', text.as_bytes()) {
            line_starts.push(nl as u32 + 1);
        }
        Self { text, line_starts }
    }

    /// Returns the full text.
    #[must_use]
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Returns the length of the source in bytes.
    #[must_use]
    #[inline]
    pub fn len(&self) -> u32 {
        self.text.len() as u32
    }

    /// Returns true if the source is empty.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Returns the text covered by a span.
    #[must_use]
    pub fn slice(&self, span: Span) -> &str {
        &self.text[span.as_range()]
    }

    /// Returns the number of lines.
    #[must_use]
    pub fn line_count(&self) -> u32 {
        self.line_starts.len() as u32
    }

    /// Returns the text of a 1-based line, without its trailing newline.
    #[must_use]
    pub fn line_text(&self, line: u32) -> &str {
        self.slice(self.line_span(line))
    }

    /// Builds a location snapshot for a byte offset.
    #[must_use]
    pub fn location(&self, offset: u32) -> SourceLocation {
        let offset = offset.min(self.len());
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let line = line_idx as u32 + 1;
        SourceLocation {
            absolute: offset,
            line,
            column: offset - self.line_starts[line_idx] + 1,
            line_span: self.line_span(line),
        }
    }

    fn line_span(&self, line: u32) -> Span {
        let idx = (line.max(1) - 1) as usize;
        let start = self.line_starts[idx];
        let end = self
            .line_starts
            .get(idx + 1)
            .map_or(self.len(), |next| next.saturating_sub(1));
        Span::new(start, end)
    }
}
