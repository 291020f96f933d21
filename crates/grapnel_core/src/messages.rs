//! Validation/error message accumulation.

use crate::path::SourcePath;
use crate::source::SourceLocation;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Message severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Severity {
    /// A violation that makes the document ineligible for execution.
    Error,
    /// A problem that does not block execution.
    Warning,
    /// An informational message.
    Info,
}

/// A single validation or error message.
///
/// Each message carries a stable error code (a GraphQL specification
/// section number) so transports can map it without parsing the text.
///
/// Serialize-only: the static code table cannot be rebuilt from wire
/// data.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Message {
    /// Severity level.
    pub severity: Severity,
    /// Stable error code.
    pub code: &'static str,
    /// Human-readable text.
    pub text: String,
    /// Source location, if known.
    pub location: Option<SourceLocation>,
    /// Response path, if known.
    pub path: Option<SourcePath>,
}

impl Message {
    /// Creates a new error message.
    pub fn error(code: &'static str, text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            text: text.into(),
            location: None,
            path: None,
        }
    }

    /// Creates a new warning message.
    pub fn warning(code: &'static str, text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            text: text.into(),
            location: None,
            path: None,
        }
    }

    /// Attaches a source location.
    #[must_use]
    pub fn at(mut self, location: SourceLocation) -> Self {
        if !location.is_none() {
            self.location = Some(location);
        }
        self
    }

    /// Attaches a response path.
    #[must_use]
    pub fn with_path(mut self, path: SourcePath) -> Self {
        self.path = Some(path);
        self
    }
}

/// An append-only, ordered collection of messages.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MessageBag {
    messages: Vec<Message>,
}

impl MessageBag {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message.
    pub fn add(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Appends an error message at a location.
    pub fn error(&mut self, code: &'static str, text: impl Into<String>, location: SourceLocation) {
        self.add(Message::error(code, text).at(location));
    }

    /// Appends a warning message at a location.
    pub fn warning(
        &mut self,
        code: &'static str,
        text: impl Into<String>,
        location: SourceLocation,
    ) {
        self.add(Message::warning(code, text).at(location));
    }

    /// Moves all messages from another bag into this one.
    pub fn merge(&mut self, other: MessageBag) {
        self.messages.extend(other.messages);
    }

    /// Returns true if any message is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|m| m.severity == Severity::Error)
    }

    /// Returns the number of errors.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.severity == Severity::Error)
            .count()
    }

    /// Returns an iterator over all messages in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// Returns an iterator over errors.
    pub fn errors(&self) -> impl Iterator<Item = &Message> {
        self.messages
            .iter()
            .filter(|m| m.severity == Severity::Error)
    }

    /// Returns true if there are no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns the number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }
}

impl IntoIterator for MessageBag {
    type Item = Message;
    type IntoIter = std::vec::IntoIter<Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}

/// Stable error codes, keyed by GraphQL October 2021 specification
/// section numbers.
pub mod codes {
    pub const ROOT_OPERATION_TYPES: &str = "3.2.1";
    pub const OPERATION_NAME_UNIQUENESS: &str = "5.2.1.1";
    pub const LONE_ANONYMOUS_OPERATION: &str = "5.2.2.1";
    pub const FIELD_SELECTIONS: &str = "5.3.1";
    pub const LEAF_FIELD_SELECTIONS: &str = "5.3.3";
    pub const ARGUMENT_NAMES: &str = "5.4.1";
    pub const ARGUMENT_UNIQUENESS: &str = "5.4.2";
    pub const REQUIRED_ARGUMENTS: &str = "5.4.2.1";
    pub const FRAGMENT_NAME_UNIQUENESS: &str = "5.5.1.1";
    pub const FRAGMENT_TYPE_EXISTENCE: &str = "5.5.1.2";
    pub const FRAGMENTS_ON_COMPOSITE_TYPES: &str = "5.5.1.3";
    pub const FRAGMENTS_MUST_BE_USED: &str = "5.5.1.4";
    pub const FRAGMENT_SPREAD_TARGET_DEFINED: &str = "5.5.2.1";
    pub const FRAGMENT_SPREADS_MUST_NOT_FORM_CYCLES: &str = "5.5.2.2";
    pub const FRAGMENT_SPREAD_IS_POSSIBLE: &str = "5.5.2.3";
    pub const VALUES_OF_CORRECT_TYPE: &str = "5.6.1";
    pub const INPUT_OBJECT_FIELD_NAMES: &str = "5.6.2";
    pub const INPUT_OBJECT_FIELD_UNIQUENESS: &str = "5.6.3";
    pub const INPUT_OBJECT_REQUIRED_FIELDS: &str = "5.6.4";
    pub const DIRECTIVES_ARE_DEFINED: &str = "5.7.1";
    pub const VARIABLE_UNIQUENESS: &str = "5.8.1";
    pub const VARIABLES_ARE_INPUT_TYPES: &str = "5.8.2";
    pub const ALL_VARIABLE_USES_DEFINED: &str = "5.8.3";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_bag() {
        let mut bag = MessageBag::new();
        bag.error(codes::FIELD_SELECTIONS, "no such field", SourceLocation::NONE);

        assert!(bag.has_errors());
        assert_eq!(bag.error_count(), 1);
        assert_eq!(bag.iter().next().unwrap().code, "5.3.1");
    }

    #[test]
    fn test_none_location_not_attached() {
        let msg = Message::error(codes::FIELD_SELECTIONS, "x").at(SourceLocation::NONE);
        assert!(msg.location.is_none());
    }

    #[test]
    fn test_merge_preserves_order() {
        let mut a = MessageBag::new();
        a.error(codes::ARGUMENT_NAMES, "first", SourceLocation::NONE);
        let mut b = MessageBag::new();
        b.warning(codes::ARGUMENT_UNIQUENESS, "second", SourceLocation::NONE);

        a.merge(b);
        let codes: Vec<_> = a.iter().map(|m| m.code).collect();
        assert_eq!(codes, vec!["5.4.1", "5.4.2"]);
        assert_eq!(a.error_count(), 1);
    }
}
