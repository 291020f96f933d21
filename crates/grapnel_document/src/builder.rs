//! The document construction engine.
//!
//! Construction walks the syntax tree depth-first and runs a chain of
//! build steps per node kind, looked up in a static rule table. Each
//! scope carries a small `Copy` context; deriving a child scope is a
//! copy, so sibling subtrees never observe each other's mutations.
//!
//! Rule failures record a message and skip the failing subtree; the walk
//! continues with siblings so one bad field does not hide the rest of
//! the document's problems. Only the depth guard aborts construction
//! outright.

use crate::document::Document;
use crate::part::{PartId, PartKind};
use crate::rules::build::rule_set;
use grapnel_core::{SourceLocation, SourceText};
use grapnel_schema::{GraphType, Schema};
use grapnel_syntax::{NodeId, SyntaxKind, SyntaxTree};
use thiserror::Error;
use tracing::debug;

/// Construction limits.
#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
    /// Maximum selection-set nesting depth before construction aborts.
    pub max_depth: u32,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { max_depth: 100 }
    }
}

/// A fatal construction error. Rule violations are not errors; they land
/// in the document's message bag.
#[derive(Debug, Clone, Error)]
pub enum BuildError {
    #[error("maximum selection depth of {max_depth} exceeded at {location}")]
    MaxDepthExceeded {
        max_depth: u32,
        location: SourceLocation,
    },
}

/// The scope a build step runs in. Copied, never shared, when descending
/// into a child node.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ScopeCtx {
    /// The syntax node being processed.
    pub(crate) node: NodeId,
    /// The part new child parts attach to.
    pub(crate) active: Option<PartId>,
    /// Selection-set nesting depth.
    pub(crate) depth: u32,
}

/// Shared mutable state for one construction run.
pub(crate) struct BuildState<'a> {
    pub(crate) doc: Document,
    pub(crate) schema: &'a Schema,
    pub(crate) source: &'a SourceText,
    pub(crate) tree: &'a SyntaxTree,
    /// Spread parts awaiting fragment linking after the walk.
    pub(crate) pending_spreads: Vec<PartId>,
}

impl BuildState<'_> {
    /// The location of a node, preferring its primary slice and falling
    /// back to the first located descendant.
    pub(crate) fn location_of(&self, node: NodeId) -> SourceLocation {
        let n = self.tree.node(node);
        if !n.primary.is_empty() {
            return self.source.location(n.primary.start);
        }
        if !n.secondary.is_empty() {
            return self.source.location(n.secondary.start);
        }
        for child in self.tree.children(node) {
            let loc = self.location_of(child);
            if !loc.is_none() {
                return loc;
            }
        }
        SourceLocation::NONE
    }

    /// The graph type the active part selects from, if resolved.
    pub(crate) fn context_graph_type(&self, ctx: &ScopeCtx) -> Option<&GraphType> {
        let active = ctx.active?;
        let expr = self.doc.parts.get(active).graph_type.as_ref()?;
        self.schema.find_graph_type(expr.base_name())
    }
}

/// Builds a document from a parsed syntax tree.
///
/// The builder borrows the schema; one builder can construct any number
/// of documents.
#[derive(Debug)]
pub struct DocumentBuilder<'a> {
    schema: &'a Schema,
    options: BuildOptions,
}

impl<'a> DocumentBuilder<'a> {
    #[must_use]
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            options: BuildOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    /// Constructs a document from the tree.
    ///
    /// Always returns a document unless the depth guard trips; rule
    /// violations are collected in [`Document::messages`].
    pub fn build(
        &self,
        source: &SourceText,
        tree: &SyntaxTree,
    ) -> Result<Document, BuildError> {
        let mut state = BuildState {
            doc: Document::default(),
            schema: self.schema,
            source,
            tree,
            pending_spreads: Vec::new(),
        };

        let ctx = ScopeCtx {
            node: tree.root(),
            active: None,
            depth: 0,
        };
        self.walk(tree.root(), ctx, &mut state)?;
        link_spreads(&mut state);

        debug!(
            parts = state.doc.parts.len(),
            operations = state.doc.operations.len(),
            fragments = state.doc.fragments.len(),
            messages = state.doc.messages.len(),
            "document constructed"
        );
        Ok(state.doc)
    }

    fn walk(
        &self,
        node: NodeId,
        mut ctx: ScopeCtx,
        state: &mut BuildState<'_>,
    ) -> Result<(), BuildError> {
        ctx.node = node;
        let kind = state.tree.kind(node);

        if kind == SyntaxKind::SelectionSet {
            ctx.depth += 1;
            if ctx.depth > self.options.max_depth {
                return Err(BuildError::MaxDepthExceeded {
                    max_depth: self.options.max_depth,
                    location: state.location_of(node),
                });
            }
        }

        let mut descend = true;
        if let Some(steps) = rule_set().get(&kind) {
            for step in steps {
                if !step.should_execute(&ctx, state) {
                    continue;
                }
                if !step.execute(&mut ctx, state) {
                    // Chain stops; the subtree is skipped, siblings go on.
                    return Ok(());
                }
                descend = descend && step.allows_children();
            }
        }

        if descend {
            for child in state.tree.children(node) {
                self.walk(child, ctx, state)?;
            }
        }
        Ok(())
    }
}

/// Points every spread at the first definition of its fragment and
/// adopts the fragment's type condition as the spread's graph type.
fn link_spreads(state: &mut BuildState<'_>) {
    for i in 0..state.pending_spreads.len() {
        let spread = state.pending_spreads[i];
        let name = match &state.doc.parts.get(spread).kind {
            PartKind::FragmentSpread { name, .. } => name.clone(),
            _ => continue,
        };
        let Some(fragment) = state.doc.fragment(&name) else {
            continue;
        };
        let fragment_type = state.doc.parts.get(fragment).graph_type.clone();

        let part = state.doc.parts.get_mut(spread);
        if let PartKind::FragmentSpread { target, .. } = &mut part.kind {
            *target = Some(fragment);
        }
        part.graph_type = fragment_type;
    }
}
