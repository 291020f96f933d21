//! Document parts and their arena.
//!
//! Parts are the constructed, schema-linked counterpart of syntax nodes.
//! They live in one flat arena owned by the document; ids index into it
//! and double as stable keys for the validation rule engine.

use crate::value::SuppliedValue;
use grapnel_core::SourceLocation;
use grapnel_schema::{OperationKind, TypeExpr};

/// Identifies a part within one [`PartArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartId(u32);

impl PartId {
    #[must_use]
    pub const fn from_raw(value: u32) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self.0
    }
}

/// What a part is, with its kind-specific payload.
#[derive(Debug, Clone)]
pub enum PartKind {
    /// An executable operation. An empty name marks the anonymous
    /// shorthand operation.
    Operation { kind: OperationKind, name: String },
    /// A variable declared in an operation signature.
    VariableDef {
        name: String,
        ty: TypeExpr,
        default: Option<SuppliedValue>,
    },
    /// A field selection.
    Field { name: String, alias: Option<String> },
    /// A supplied argument on a field or directive.
    Argument { name: String, value: SuppliedValue },
    /// A directive application.
    Directive { name: String },
    /// A named fragment definition.
    NamedFragment {
        name: String,
        type_condition: String,
    },
    /// An inline fragment; `None` inherits the enclosing type.
    InlineFragment { type_condition: Option<String> },
    /// A `...Name` spread; `target` is linked after construction.
    FragmentSpread { name: String, target: Option<PartId> },
}

impl PartKind {
    /// A short kind name for messages and traces.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Operation { .. } => "operation",
            Self::VariableDef { .. } => "variable definition",
            Self::Field { .. } => "field",
            Self::Argument { .. } => "argument",
            Self::Directive { .. } => "directive",
            Self::NamedFragment { .. } => "fragment definition",
            Self::InlineFragment { .. } => "inline fragment",
            Self::FragmentSpread { .. } => "fragment spread",
        }
    }
}

/// A constructed document part.
#[derive(Debug, Clone)]
pub struct Part {
    pub kind: PartKind,
    /// The enclosing part; `None` only for top-level parts.
    pub parent: Option<PartId>,
    /// Child parts in declaration order.
    pub children: Vec<PartId>,
    /// The graph type this part produces or conditions on, once resolved.
    /// For fields this is the field's return type; for fragments the type
    /// condition; for operations the root type.
    pub graph_type: Option<TypeExpr>,
    /// Where the part starts in the source.
    pub location: SourceLocation,
}

impl Part {
    /// The key a field contributes to the response object: its alias if
    /// present, its name otherwise.
    #[must_use]
    pub fn response_key(&self) -> Option<&str> {
        match &self.kind {
            PartKind::Field { name, alias } => Some(alias.as_deref().unwrap_or(name)),
            _ => None,
        }
    }

    /// True for parts that select from a composite type.
    #[must_use]
    pub fn is_selection(&self) -> bool {
        matches!(
            self.kind,
            PartKind::Field { .. } | PartKind::FragmentSpread { .. } | PartKind::InlineFragment { .. }
        )
    }
}

/// A flat arena of parts. Allocation wires the new part into its parent's
/// child list; parts are never removed.
#[derive(Debug, Default)]
pub struct PartArena {
    parts: Vec<Part>,
}

impl PartArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a part and appends it to its parent's children.
    pub fn alloc(
        &mut self,
        kind: PartKind,
        parent: Option<PartId>,
        location: SourceLocation,
    ) -> PartId {
        let id = PartId(self.parts.len() as u32);
        self.parts.push(Part {
            kind,
            parent,
            children: Vec::new(),
            graph_type: None,
            location,
        });
        if let Some(parent) = parent {
            self.parts[parent.0 as usize].children.push(id);
        }
        id
    }

    #[must_use]
    pub fn get(&self, id: PartId) -> &Part {
        &self.parts[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: PartId) -> &mut Part {
        &mut self.parts[id.0 as usize]
    }

    /// All parts with their ids, in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (PartId, &Part)> {
        self.parts
            .iter()
            .enumerate()
            .map(|(i, p)| (PartId(i as u32), p))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_wires_parent() {
        let mut arena = PartArena::new();
        let op = arena.alloc(
            PartKind::Operation {
                kind: OperationKind::Query,
                name: String::new(),
            },
            None,
            SourceLocation::NONE,
        );
        let field = arena.alloc(
            PartKind::Field {
                name: "user".to_string(),
                alias: None,
            },
            Some(op),
            SourceLocation::NONE,
        );

        assert_eq!(arena.get(op).children, vec![field]);
        assert_eq!(arena.get(field).parent, Some(op));
    }

    #[test]
    fn test_response_key_prefers_alias() {
        let part = Part {
            kind: PartKind::Field {
                name: "user".to_string(),
                alias: Some("me".to_string()),
            },
            parent: None,
            children: Vec::new(),
            graph_type: None,
            location: SourceLocation::NONE,
        };
        assert_eq!(part.response_key(), Some("me"));
    }
}
