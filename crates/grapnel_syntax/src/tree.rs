//! Index-arena syntax tree.
//!
//! Nodes live in one flat array; each node's children occupy exactly one
//! contiguous run of the shared child-id table. Parsing a document of
//! thousands of nodes therefore costs a handful of geometric `Vec` growths
//! rather than one heap allocation per node.

use grapnel_core::Span;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_GENERATION: AtomicU32 = AtomicU32::new(1);

/// Identifies a node within one [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    #[must_use]
    pub const fn from_raw(value: u32) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self.0
    }
}

/// The grammar production a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SyntaxKind {
    Document,
    Operation,
    VariableDefinitions,
    VariableDefinition,
    NamedType,
    ListType,
    NonNullType,
    SelectionSet,
    Field,
    Arguments,
    Argument,
    Directive,
    FragmentDefinition,
    FragmentSpread,
    InlineFragment,
    Variable,
    IntValue,
    FloatValue,
    StringValue,
    BooleanValue,
    NullValue,
    EnumValue,
    ListValue,
    ObjectValue,
    ObjectField,
}

impl SyntaxKind {
    /// Returns true for value-production nodes.
    #[must_use]
    pub const fn is_value(self) -> bool {
        matches!(
            self,
            Self::Variable
                | Self::IntValue
                | Self::FloatValue
                | Self::StringValue
                | Self::BooleanValue
                | Self::NullValue
                | Self::EnumValue
                | Self::ListValue
                | Self::ObjectValue
        )
    }

    /// Returns true for type-reference nodes.
    #[must_use]
    pub const fn is_type_ref(self) -> bool {
        matches!(self, Self::NamedType | Self::ListType | Self::NonNullType)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ChildRange {
    start: u32,
    len: u32,
}

/// A node: kind tag, up to two text-slice values, and the coordinates of
/// its child run.
#[derive(Debug, Clone, Copy)]
pub struct SyntaxNode {
    pub kind: SyntaxKind,
    /// Primary text slice (e.g. a field's name).
    pub primary: Span,
    /// Secondary text slice (e.g. a field's alias, an operation's verb).
    pub secondary: Span,
    children: ChildRange,
}

impl SyntaxNode {
    /// Number of children.
    #[must_use]
    pub const fn child_count(&self) -> u32 {
        self.children.len
    }
}

/// A parsed query document as a flat node arena.
///
/// The tree is created once per parse, grown only through
/// [`SyntaxTree::add_node`], and released after document construction; it
/// is not retained past that point. The generation counter distinguishes a
/// live tree from a released one so stale `NodeId`s are caught in tests.
#[derive(Debug)]
pub struct SyntaxTree {
    nodes: Vec<SyntaxNode>,
    child_ids: Vec<NodeId>,
    root: Option<NodeId>,
    generation: u32,
}

impl Default for SyntaxTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntaxTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: Vec::with_capacity(64),
            child_ids: Vec::with_capacity(64),
            root: None,
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Appends a node whose children (already added) are stored as one
    /// contiguous run. Returns the new node's id.
    pub fn add_node(
        &mut self,
        kind: SyntaxKind,
        primary: Span,
        secondary: Span,
        children: &[NodeId],
    ) -> NodeId {
        debug_assert!(self.is_live(), "use of released syntax tree");
        let start = self.child_ids.len() as u32;
        self.child_ids.extend_from_slice(children);
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(SyntaxNode {
            kind,
            primary,
            secondary,
            children: ChildRange {
                start,
                len: children.len() as u32,
            },
        });
        id
    }

    /// Marks a node as the document root.
    pub fn set_root(&mut self, id: NodeId) {
        self.root = Some(id);
    }

    /// Returns the root node id.
    ///
    /// # Panics
    /// Panics if no root was set; parsing always sets one.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root.expect("syntax tree has no root")
    }

    /// Returns a node by id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        debug_assert!(self.is_live(), "use of released syntax tree");
        &self.nodes[id.0 as usize]
    }

    /// Returns a node's kind.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> SyntaxKind {
        self.node(id).kind
    }

    /// Returns a node's children in declaration order.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        debug_assert!(self.is_live(), "use of released syntax tree");
        let range = self.nodes[id.0 as usize].children;
        self.child_ids[range.start as usize..(range.start + range.len) as usize]
            .iter()
            .copied()
    }

    /// Number of nodes in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the tree has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the tree's generation stamp.
    #[must_use]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Returns true if the tree has not been released.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.generation != 0
    }

    /// Releases the tree's storage. Any later access is a bug and is
    /// caught by debug assertions.
    pub fn release(&mut self) {
        self.nodes = Vec::new();
        self.child_ids = Vec::new();
        self.root = None;
        self.generation = 0;
    }

    /// Renders the node-kind/child-order structure, for structural
    /// comparisons in tests: `(Document (Operation (SelectionSet (Field))))`.
    #[must_use]
    pub fn structure(&self) -> String {
        fn render(tree: &SyntaxTree, id: NodeId, out: &mut String) {
            out.push('(');
            out.push_str(&format!("{:?}", tree.kind(id)));
            for child in tree.children(id) {
                out.push(' ');
                render(tree, child, out);
            }
            out.push(')');
        }

        let mut out = String::new();
        if let Some(root) = self.root {
            render(self, root, &mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_children_are_contiguous() {
        let mut tree = SyntaxTree::new();
        let a = tree.add_node(SyntaxKind::Field, Span::new(0, 1), Span::default(), &[]);
        let b = tree.add_node(SyntaxKind::Field, Span::new(2, 3), Span::default(), &[]);
        let set = tree.add_node(SyntaxKind::SelectionSet, Span::default(), Span::default(), &[a, b]);
        tree.set_root(set);

        let children: Vec<_> = tree.children(set).collect();
        assert_eq!(children, vec![a, b]);
        assert_eq!(tree.node(set).child_count(), 2);
    }

    #[test]
    fn test_structure_rendering() {
        let mut tree = SyntaxTree::new();
        let field = tree.add_node(SyntaxKind::Field, Span::default(), Span::default(), &[]);
        let set = tree.add_node(
            SyntaxKind::SelectionSet,
            Span::default(),
            Span::default(),
            &[field],
        );
        let op = tree.add_node(SyntaxKind::Operation, Span::default(), Span::default(), &[set]);
        let doc = tree.add_node(SyntaxKind::Document, Span::default(), Span::default(), &[op]);
        tree.set_root(doc);

        assert_eq!(
            tree.structure(),
            "(Document (Operation (SelectionSet (Field))))"
        );
    }

    #[test]
    fn test_release_bumps_generation() {
        let mut tree = SyntaxTree::new();
        let id = tree.add_node(SyntaxKind::Document, Span::default(), Span::default(), &[]);
        tree.set_root(id);
        assert!(tree.is_live());

        tree.release();
        assert!(!tree.is_live());
        assert!(tree.is_empty());
    }

    #[test]
    fn test_generations_are_distinct() {
        let a = SyntaxTree::new();
        let b = SyntaxTree::new();
        assert_ne!(a.generation(), b.generation());
    }
}
