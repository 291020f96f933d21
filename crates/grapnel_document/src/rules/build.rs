//! Construction steps, keyed by syntax node kind.
//!
//! Each node kind maps to an ordered chain of steps. A step either
//! advances the scope (usually by creating a part and making it active)
//! or fails; failure records a message and skips the node's subtree.
//! Node kinds with no entry are transparent: the walk descends with the
//! scope unchanged.

use crate::builder::{BuildState, ScopeCtx};
use crate::part::PartKind;
use crate::value::SuppliedValue;
use grapnel_core::messages::codes;
use grapnel_core::SourceText;
use grapnel_schema::{OperationKind, TypeExpr};
use grapnel_syntax::{NodeId, SyntaxKind, SyntaxTree};
use rustc_hash::FxHashMap;
use std::sync::OnceLock;

pub(crate) trait BuildStep: Send + Sync {
    /// Gate: a skipped step neither fails nor advances the scope.
    fn should_execute(&self, ctx: &ScopeCtx, state: &BuildState<'_>) -> bool {
        let _ = (ctx, state);
        true
    }

    /// Runs the step. Returning `false` stops the chain and skips the
    /// node's subtree.
    fn execute(&self, ctx: &mut ScopeCtx, state: &mut BuildState<'_>) -> bool;

    /// False for steps that consume their node's subtree themselves.
    fn allows_children(&self) -> bool {
        true
    }
}

pub(crate) type RuleSet = FxHashMap<SyntaxKind, Vec<Box<dyn BuildStep>>>;

/// The construction rule table, built once per process.
pub(crate) fn rule_set() -> &'static RuleSet {
    static RULES: OnceLock<RuleSet> = OnceLock::new();
    RULES.get_or_init(|| {
        let mut rules = RuleSet::default();
        rules.insert(
            SyntaxKind::Operation,
            vec![Box::new(CreateOperation) as Box<dyn BuildStep>],
        );
        rules.insert(SyntaxKind::VariableDefinition, vec![Box::new(DeclareVariable)]);
        rules.insert(
            SyntaxKind::Field,
            vec![Box::new(ResolveField), Box::new(CreateField)],
        );
        rules.insert(
            SyntaxKind::Argument,
            vec![Box::new(ResolveArgument), Box::new(CreateArgument)],
        );
        rules.insert(
            SyntaxKind::Directive,
            vec![Box::new(ResolveDirective), Box::new(CreateDirective)],
        );
        rules.insert(SyntaxKind::FragmentDefinition, vec![Box::new(CreateFragment)]);
        rules.insert(SyntaxKind::FragmentSpread, vec![Box::new(CreateSpread)]);
        rules.insert(SyntaxKind::InlineFragment, vec![Box::new(CreateInlineFragment)]);
        rules
    })
}

/// Builds a [`TypeExpr`] from a type-reference subtree.
fn type_expr_of(tree: &SyntaxTree, node: NodeId, source: &SourceText) -> TypeExpr {
    match tree.kind(node) {
        SyntaxKind::ListType => {
            let element = tree
                .children(node)
                .next()
                .expect("list type wraps an element");
            type_expr_of(tree, element, source).list()
        }
        SyntaxKind::NonNullType => {
            let inner = tree
                .children(node)
                .next()
                .expect("non-null type wraps an inner type");
            type_expr_of(tree, inner, source).non_null()
        }
        _ => TypeExpr::named(source.slice(tree.node(node).primary)),
    }
}

/// Looks up the declared type of an argument on the active part.
///
/// `Err` carries a description of the host for the undefined-argument
/// message.
fn argument_type(
    state: &BuildState<'_>,
    ctx: &ScopeCtx,
    arg_name: &str,
) -> Result<TypeExpr, String> {
    let Some(active_id) = ctx.active else {
        return Err("the document".to_string());
    };
    let active = state.doc.parts.get(active_id);
    match &active.kind {
        PartKind::Field { name, .. } => {
            let def = active
                .parent
                .and_then(|p| state.doc.parts.get(p).graph_type.as_ref())
                .and_then(|t| state.schema.find_graph_type(t.base_name()))
                .and_then(|t| t.field(name))
                .and_then(|f| f.arguments.get(arg_name));
            def.map(|d| d.ty.clone()).ok_or_else(|| format!("field `{name}`"))
        }
        PartKind::Directive { name } => state
            .schema
            .find_directive(name)
            .and_then(|d| d.arguments.get(arg_name))
            .map(|d| d.ty.clone())
            .ok_or_else(|| format!("directive `@{name}`")),
        other => Err(other.kind_name().to_string()),
    }
}

/// Creates the operation part, enforcing name uniqueness and the lone
/// anonymous operation rule.
struct CreateOperation;

impl BuildStep for CreateOperation {
    fn execute(&self, ctx: &mut ScopeCtx, state: &mut BuildState<'_>) -> bool {
        let n = state.tree.node(ctx.node);
        let location = state.location_of(ctx.node);

        let kind = if n.secondary.is_empty() {
            OperationKind::Query
        } else {
            match state.source.slice(n.secondary) {
                "mutation" => OperationKind::Mutation,
                "subscription" => OperationKind::Subscription,
                _ => OperationKind::Query,
            }
        };
        let name = if n.primary.is_empty() {
            String::new()
        } else {
            state.source.slice(n.primary).to_string()
        };

        if name.is_empty() {
            if !state.doc.operations.is_empty() {
                state.doc.messages.error(
                    codes::LONE_ANONYMOUS_OPERATION,
                    "an anonymous operation must be the only operation in the document",
                    location,
                );
                return false;
            }
        } else {
            if state.doc.operations.contains_key("") {
                state.doc.messages.error(
                    codes::LONE_ANONYMOUS_OPERATION,
                    "an anonymous operation must be the only operation in the document",
                    location,
                );
                return false;
            }
            if state.doc.operations.contains_key(&name) {
                state.doc.messages.error(
                    codes::OPERATION_NAME_UNIQUENESS,
                    format!("duplicate operation name `{name}`"),
                    location,
                );
                return false;
            }
        }

        let Some(root) = state.schema.root_type(kind) else {
            state.doc.messages.error(
                codes::ROOT_OPERATION_TYPES,
                format!("the schema does not support {} operations", kind.as_str()),
                location,
            );
            return false;
        };
        let root = root.to_string();

        let id = state
            .doc
            .parts
            .alloc(PartKind::Operation { kind, name: name.clone() }, None, location);
        state.doc.parts.get_mut(id).graph_type = Some(TypeExpr::named(root));
        state.doc.operations.insert(name, id);
        ctx.active = Some(id);
        true
    }
}

/// Declares an operation variable, checking name uniqueness and that the
/// declared type is a known input type. Consumes the type-reference and
/// default-value subtree itself.
struct DeclareVariable;

impl BuildStep for DeclareVariable {
    fn execute(&self, ctx: &mut ScopeCtx, state: &mut BuildState<'_>) -> bool {
        let n = state.tree.node(ctx.node);
        let name = state.source.slice(n.primary).to_string();
        let location = state.location_of(ctx.node);
        let Some(op) = ctx.active else {
            return false;
        };

        let duplicate = state.doc.variable_defs(op).any(|v| {
            matches!(&state.doc.parts.get(v).kind,
                PartKind::VariableDef { name: existing, .. } if *existing == name)
        });
        if duplicate {
            state.doc.messages.error(
                codes::VARIABLE_UNIQUENESS,
                format!("duplicate variable `${name}`"),
                location,
            );
            return false;
        }

        let mut children = state.tree.children(ctx.node);
        let Some(ty_node) = children.next() else {
            return false;
        };
        let rest: Vec<NodeId> = children.collect();
        let ty = type_expr_of(state.tree, ty_node, state.source);

        match state.schema.find_graph_type(ty.base_name()) {
            None => {
                state.doc.messages.error(
                    codes::VARIABLES_ARE_INPUT_TYPES,
                    format!("unknown type `{}` for variable `${name}`", ty.base_name()),
                    location,
                );
                return false;
            }
            Some(t) if !t.is_input() => {
                state.doc.messages.error(
                    codes::VARIABLES_ARE_INPUT_TYPES,
                    format!(
                        "variable `${name}` must use an input type, but `{}` is {} type",
                        ty.base_name(),
                        t.kind().as_str()
                    ),
                    location,
                );
                return false;
            }
            Some(_) => {}
        }

        let mut default = None;
        for child in rest {
            if state.tree.kind(child).is_value() {
                match SuppliedValue::from_syntax(state.tree, child, state.source) {
                    Ok(value) => default = Some(value),
                    Err(bad) => {
                        state.doc.messages.error(
                            codes::VALUES_OF_CORRECT_TYPE,
                            format!("malformed literal `{}`", bad.text),
                            bad.location,
                        );
                        return false;
                    }
                }
            }
        }

        let id = state.doc.parts.alloc(
            PartKind::VariableDef { name, ty: ty.clone(), default },
            Some(op),
            location,
        );
        state.doc.parts.get_mut(id).graph_type = Some(ty);
        true
    }

    fn allows_children(&self) -> bool {
        false
    }
}

/// Checks that the selected field exists on the enclosing graph type.
/// `__typename` is available on every composite type.
struct ResolveField;

impl BuildStep for ResolveField {
    fn execute(&self, ctx: &mut ScopeCtx, state: &mut BuildState<'_>) -> bool {
        let n = state.tree.node(ctx.node);
        let (exists, type_name, leaf) = {
            // Unresolved context means an earlier failure already
            // reported; skip quietly to avoid cascades.
            let Some(context) = state.context_graph_type(ctx) else {
                return false;
            };
            let name = state.source.slice(n.primary);
            let exists = name == "__typename" || context.field(name).is_some();
            (exists, context.name().to_string(), context.is_leaf())
        };
        let name = state.source.slice(n.primary).to_string();
        let location = state.location_of(ctx.node);

        if leaf {
            state.doc.messages.error(
                codes::LEAF_FIELD_SELECTIONS,
                format!("cannot select field `{name}` from leaf type `{type_name}`"),
                location,
            );
            return false;
        }
        if exists {
            return true;
        }
        state.doc.messages.error(
            codes::FIELD_SELECTIONS,
            format!("field `{name}` does not exist on type `{type_name}`"),
            location,
        );
        false
    }
}

/// Creates the field part and types it with the field's return type.
struct CreateField;

impl BuildStep for CreateField {
    fn execute(&self, ctx: &mut ScopeCtx, state: &mut BuildState<'_>) -> bool {
        let n = state.tree.node(ctx.node);
        let name = state.source.slice(n.primary).to_string();
        let alias = if n.secondary.is_empty() {
            None
        } else {
            Some(state.source.slice(n.secondary).to_string())
        };

        let ty = if name == "__typename" {
            TypeExpr::named("String").non_null()
        } else {
            let Some(def) = state.context_graph_type(ctx).and_then(|c| c.field(&name)) else {
                return false;
            };
            def.ty.clone()
        };

        let location = state.location_of(ctx.node);
        let id = state
            .doc
            .parts
            .alloc(PartKind::Field { name, alias }, ctx.active, location);
        state.doc.parts.get_mut(id).graph_type = Some(ty);
        ctx.active = Some(id);
        true
    }
}

/// Checks that the argument is declared on its host field or directive.
struct ResolveArgument;

impl BuildStep for ResolveArgument {
    fn execute(&self, ctx: &mut ScopeCtx, state: &mut BuildState<'_>) -> bool {
        let n = state.tree.node(ctx.node);
        let name = state.source.slice(n.primary).to_string();

        match argument_type(state, ctx, &name) {
            Ok(_) => true,
            Err(host) => {
                let location = state.location_of(ctx.node);
                state.doc.messages.error(
                    codes::ARGUMENT_NAMES,
                    format!("argument `{name}` is not defined on {host}"),
                    location,
                );
                false
            }
        }
    }
}

/// Creates the argument part, enforcing per-host uniqueness and lifting
/// the value literal. Consumes the value subtree itself.
struct CreateArgument;

impl BuildStep for CreateArgument {
    fn execute(&self, ctx: &mut ScopeCtx, state: &mut BuildState<'_>) -> bool {
        let n = state.tree.node(ctx.node);
        let name = state.source.slice(n.primary).to_string();
        let location = state.location_of(ctx.node);
        let Some(active) = ctx.active else {
            return false;
        };

        let duplicate = state.doc.arguments(active).any(|a| {
            matches!(&state.doc.parts.get(a).kind,
                PartKind::Argument { name: existing, .. } if *existing == name)
        });
        if duplicate {
            state.doc.messages.error(
                codes::ARGUMENT_UNIQUENESS,
                format!("duplicate argument `{name}`"),
                location,
            );
            return false;
        }

        let Ok(ty) = argument_type(state, ctx, &name) else {
            return false;
        };
        let Some(value_node) = state.tree.children(ctx.node).next() else {
            return false;
        };
        let value = match SuppliedValue::from_syntax(state.tree, value_node, state.source) {
            Ok(value) => value,
            Err(bad) => {
                state.doc.messages.error(
                    codes::VALUES_OF_CORRECT_TYPE,
                    format!("malformed literal `{}`", bad.text),
                    bad.location,
                );
                return false;
            }
        };

        let id = state
            .doc
            .parts
            .alloc(PartKind::Argument { name, value }, Some(active), location);
        state.doc.parts.get_mut(id).graph_type = Some(ty);
        true
    }

    fn allows_children(&self) -> bool {
        false
    }
}

/// Checks that the applied directive is defined in the schema.
struct ResolveDirective;

impl BuildStep for ResolveDirective {
    fn execute(&self, ctx: &mut ScopeCtx, state: &mut BuildState<'_>) -> bool {
        let n = state.tree.node(ctx.node);
        let name = state.source.slice(n.primary);
        if state.schema.find_directive(name).is_some() {
            return true;
        }

        let name = name.to_string();
        let location = state.location_of(ctx.node);
        state.doc.messages.error(
            codes::DIRECTIVES_ARE_DEFINED,
            format!("directive `@{name}` is not defined"),
            location,
        );
        false
    }
}

/// Creates the directive part; its arguments attach to it.
struct CreateDirective;

impl BuildStep for CreateDirective {
    fn execute(&self, ctx: &mut ScopeCtx, state: &mut BuildState<'_>) -> bool {
        let n = state.tree.node(ctx.node);
        let name = state.source.slice(n.primary).to_string();
        let location = state.location_of(ctx.node);

        let id = state
            .doc
            .parts
            .alloc(PartKind::Directive { name }, ctx.active, location);
        ctx.active = Some(id);
        true
    }
}

/// Creates a named fragment part and registers it. Duplicate names and
/// unknown condition types are retained here and reported by validation.
struct CreateFragment;

impl BuildStep for CreateFragment {
    fn execute(&self, ctx: &mut ScopeCtx, state: &mut BuildState<'_>) -> bool {
        let n = state.tree.node(ctx.node);
        let name = state.source.slice(n.primary).to_string();
        let condition = state.source.slice(n.secondary).to_string();
        let location = state.location_of(ctx.node);

        let id = state.doc.parts.alloc(
            PartKind::NamedFragment {
                name: name.clone(),
                type_condition: condition.clone(),
            },
            None,
            location,
        );
        if state.schema.find_graph_type(&condition).is_some() {
            state.doc.parts.get_mut(id).graph_type = Some(TypeExpr::named(condition));
        }
        state.doc.fragments.entry(name).or_default().push(id);
        ctx.active = Some(id);
        true
    }
}

/// Creates a spread part; the target fragment is linked after the walk,
/// since fragments may be defined later in the document.
struct CreateSpread;

impl BuildStep for CreateSpread {
    fn execute(&self, ctx: &mut ScopeCtx, state: &mut BuildState<'_>) -> bool {
        let n = state.tree.node(ctx.node);
        let name = state.source.slice(n.primary).to_string();
        let location = state.location_of(ctx.node);

        let id = state
            .doc
            .parts
            .alloc(PartKind::FragmentSpread { name, target: None }, ctx.active, location);
        state.pending_spreads.push(id);
        ctx.active = Some(id);
        true
    }
}

/// Creates an inline fragment part. A missing type condition inherits
/// the enclosing graph type.
struct CreateInlineFragment;

impl BuildStep for CreateInlineFragment {
    fn execute(&self, ctx: &mut ScopeCtx, state: &mut BuildState<'_>) -> bool {
        let n = state.tree.node(ctx.node);
        let condition = if n.secondary.is_empty() {
            None
        } else {
            Some(state.source.slice(n.secondary).to_string())
        };
        let location = state.location_of(ctx.node);

        let inherited = ctx
            .active
            .and_then(|a| state.doc.parts.get(a).graph_type.clone());
        let ty = match &condition {
            Some(c) if state.schema.find_graph_type(c).is_some() => {
                Some(TypeExpr::named(c.clone()))
            }
            Some(_) => None,
            None => inherited,
        };

        let id = state.doc.parts.alloc(
            PartKind::InlineFragment { type_condition: condition },
            ctx.active,
            location,
        );
        state.doc.parts.get_mut(id).graph_type = ty;
        ctx.active = Some(id);
        true
    }
}
