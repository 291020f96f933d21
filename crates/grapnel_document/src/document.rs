//! The constructed document: operations, fragments, and their parts.

use crate::part::{Part, PartArena, PartId, PartKind};
use grapnel_core::{MessageBag, SourcePath};
use indexmap::IndexMap;

/// A constructed query document.
///
/// Construction always produces a document; callers inspect
/// [`Document::messages`] to learn whether it is eligible for planning.
/// The anonymous shorthand operation is keyed by the empty string.
#[derive(Debug, Default)]
pub struct Document {
    /// All parts, owned by the document.
    pub parts: PartArena,
    /// Operations by name, in declaration order.
    pub operations: IndexMap<String, PartId>,
    /// Fragment definitions by name, in declaration order. Duplicate
    /// definitions are all retained so validation can report them.
    pub fragments: IndexMap<String, Vec<PartId>>,
    /// Messages accumulated during construction.
    pub messages: MessageBag,
}

impl Document {
    /// Selects an operation for execution.
    ///
    /// With a name, looks it up directly. Without one, returns the sole
    /// operation if exactly one exists.
    #[must_use]
    pub fn operation(&self, name: Option<&str>) -> Option<PartId> {
        match name {
            Some(name) => self.operations.get(name).copied(),
            None if self.operations.len() == 1 => {
                self.operations.values().next().copied()
            }
            None => None,
        }
    }

    /// The first definition of a named fragment.
    #[must_use]
    pub fn fragment(&self, name: &str) -> Option<PartId> {
        self.fragments.get(name).and_then(|defs| defs.first()).copied()
    }

    /// Builds the response path leading to a part by walking its parent
    /// chain and collecting field response keys.
    #[must_use]
    pub fn path_of(&self, id: PartId) -> SourcePath {
        let mut keys = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let part = self.parts.get(current);
            if let Some(key) = part.response_key() {
                keys.push(key.to_string());
            }
            cursor = part.parent;
        }

        let mut path = SourcePath::default();
        for key in keys.into_iter().rev() {
            path.push_field(key);
        }
        path
    }

    /// A part by id.
    #[must_use]
    pub fn part(&self, id: PartId) -> &Part {
        self.parts.get(id)
    }

    /// Child parts of a part that are selections (fields, spreads,
    /// inline fragments), in declaration order.
    pub fn selections(&self, id: PartId) -> impl Iterator<Item = PartId> + '_ {
        self.parts
            .get(id)
            .children
            .iter()
            .copied()
            .filter(move |&c| self.parts.get(c).is_selection())
    }

    /// Child parts of a part that are supplied arguments.
    pub fn arguments(&self, id: PartId) -> impl Iterator<Item = PartId> + '_ {
        self.parts
            .get(id)
            .children
            .iter()
            .copied()
            .filter(move |&c| matches!(self.parts.get(c).kind, PartKind::Argument { .. }))
    }

    /// Child parts of a part that are directive applications.
    pub fn directives(&self, id: PartId) -> impl Iterator<Item = PartId> + '_ {
        self.parts
            .get(id)
            .children
            .iter()
            .copied()
            .filter(move |&c| matches!(self.parts.get(c).kind, PartKind::Directive { .. }))
    }

    /// Variable definitions declared by an operation.
    pub fn variable_defs(&self, operation: PartId) -> impl Iterator<Item = PartId> + '_ {
        self.parts
            .get(operation)
            .children
            .iter()
            .copied()
            .filter(move |&c| matches!(self.parts.get(c).kind, PartKind::VariableDef { .. }))
    }
}
