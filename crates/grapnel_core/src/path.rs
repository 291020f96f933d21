//! Response paths for spec-compliant error reporting.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A segment of a response path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(untagged))]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

/// An ordered sequence of path segments accumulated while walking a
/// document, used to build error paths.
///
/// Paths are cloned and extended, never shared mutably.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct SourcePath {
    segments: Vec<PathSegment>,
}

impl SourcePath {
    /// Creates an empty path.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the segments in order.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Returns true if the path has no segments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Appends a field segment.
    pub fn push_field(&mut self, name: impl Into<String>) {
        self.segments.push(PathSegment::Field(name.into()));
    }

    /// Appends an array index segment.
    pub fn push_index(&mut self, index: usize) {
        self.segments.push(PathSegment::Index(index));
    }

    /// Returns a new path extended by a field segment.
    #[must_use]
    pub fn with_field(&self, name: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.push_field(name);
        next
    }

    /// Returns the parent path: trailing indices are stripped, then the
    /// closest field segment.
    #[must_use]
    pub fn parent(&self) -> Self {
        let mut segments = self.segments.clone();
        while matches!(segments.last(), Some(PathSegment::Index(_))) {
            segments.pop();
        }
        segments.pop();
        Self { segments }
    }

    /// Renders the path in dot notation: `user.friends[0].name`.
    #[must_use]
    pub fn to_dot_string(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                PathSegment::Field(name) => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(name);
                }
                PathSegment::Index(i) => {
                    out.push('[');
                    out.push_str(&i.to_string());
                    out.push(']');
                }
            }
        }
        out
    }

    /// Renders the path in JSON-array notation: `["user","friends",0,"name"]`.
    #[must_use]
    pub fn to_json_string(&self) -> String {
        let mut out = String::from("[");
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            match segment {
                PathSegment::Field(name) => {
                    out.push('"');
                    out.push_str(name);
                    out.push('"');
                }
                PathSegment::Index(idx) => out.push_str(&idx.to_string()),
            }
        }
        out.push(']');
        out
    }
}

impl std::fmt::Display for SourcePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_dot_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SourcePath {
        let mut path = SourcePath::new();
        path.push_field("user");
        path.push_field("friends");
        path.push_index(0);
        path.push_field("name");
        path
    }

    #[test]
    fn test_dot_notation() {
        assert_eq!(sample().to_dot_string(), "user.friends[0].name");
    }

    #[test]
    fn test_json_notation() {
        assert_eq!(sample().to_json_string(), r#"["user","friends",0,"name"]"#);
    }

    #[test]
    fn test_parent_strips_trailing_indices() {
        let mut path = SourcePath::new();
        path.push_field("user");
        path.push_field("friends");
        path.push_index(0);
        path.push_index(1);

        let parent = path.parent();
        assert_eq!(parent.to_dot_string(), "user");
    }

    #[test]
    fn test_parent_of_empty() {
        assert!(SourcePath::new().parent().is_empty());
    }

    #[test]
    fn test_with_field_does_not_mutate() {
        let base = SourcePath::new().with_field("a");
        let extended = base.with_field("b");
        assert_eq!(base.to_dot_string(), "a");
        assert_eq!(extended.to_dot_string(), "a.b");
    }
}
