//! Validation rules, run over the constructed document.
//!
//! Part rules fire once per (rule, part) pair; document rules fire once
//! per run. All rules are read-only over the document and schema and
//! append to the run's message bag, so validation never mutates the
//! document and can be repeated with identical results.

use crate::part::{Part, PartId, PartKind};
use crate::validator::ValidateCtx;
use crate::value::SuppliedValue;
use grapnel_core::messages::codes;
use grapnel_core::Message;
use grapnel_schema::{GraphType, ScalarDef, TypeExpr};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::OnceLock;

pub(crate) trait PartRule: Send + Sync {
    /// Stable rule id, used to deduplicate (rule, part) executions.
    fn id(&self) -> &'static str;
    fn applies(&self, part: &Part) -> bool;
    fn check(&self, cx: &mut ValidateCtx<'_>, id: PartId);
}

pub(crate) trait DocumentRule: Send + Sync {
    fn check_document(&self, cx: &mut ValidateCtx<'_>);
}

pub(crate) fn part_rules() -> &'static [Box<dyn PartRule>] {
    static RULES: OnceLock<Vec<Box<dyn PartRule>>> = OnceLock::new();
    RULES.get_or_init(|| {
        vec![
            Box::new(FragmentTypeExists) as Box<dyn PartRule>,
            Box::new(FragmentOnComposite),
            Box::new(SpreadTargetDefined),
            Box::new(SpreadIsPossible),
            Box::new(LeafFieldSelections),
            Box::new(RequiredArguments),
            Box::new(ValuesOfCorrectType),
        ]
    })
}

pub(crate) fn document_rules() -> &'static [Box<dyn DocumentRule>] {
    static RULES: OnceLock<Vec<Box<dyn DocumentRule>>> = OnceLock::new();
    RULES.get_or_init(|| {
        vec![
            Box::new(FragmentNameUniqueness) as Box<dyn DocumentRule>,
            Box::new(FragmentsMustBeUsed),
            Box::new(FragmentCycles),
        ]
    })
}

/// The type condition of a fragment part, if it has one.
fn condition_of(part: &Part) -> Option<&str> {
    match &part.kind {
        PartKind::NamedFragment { type_condition, .. } => Some(type_condition),
        PartKind::InlineFragment {
            type_condition: Some(condition),
        } => Some(condition),
        _ => None,
    }
}

/// Fragment type conditions must name a type in the schema.
struct FragmentTypeExists;

impl PartRule for FragmentTypeExists {
    fn id(&self) -> &'static str {
        codes::FRAGMENT_TYPE_EXISTENCE
    }

    fn applies(&self, part: &Part) -> bool {
        condition_of(part).is_some()
    }

    fn check(&self, cx: &mut ValidateCtx<'_>, id: PartId) {
        let part = cx.doc.part(id);
        let Some(condition) = condition_of(part) else {
            return;
        };
        if cx.schema.find_graph_type(condition).is_none() {
            let condition = condition.to_string();
            cx.messages.error(
                codes::FRAGMENT_TYPE_EXISTENCE,
                format!("unknown type `{condition}` in fragment type condition"),
                part.location,
            );
        }
    }
}

/// Fragment type conditions must be composite types.
struct FragmentOnComposite;

impl PartRule for FragmentOnComposite {
    fn id(&self) -> &'static str {
        codes::FRAGMENTS_ON_COMPOSITE_TYPES
    }

    fn applies(&self, part: &Part) -> bool {
        condition_of(part).is_some()
    }

    fn check(&self, cx: &mut ValidateCtx<'_>, id: PartId) {
        let part = cx.doc.part(id);
        let Some(condition) = condition_of(part) else {
            return;
        };
        if let Some(graph) = cx.schema.find_graph_type(condition) {
            if !graph.is_composite() {
                let text = format!(
                    "fragments cannot condition on {} type `{condition}`",
                    graph.kind().as_str()
                );
                cx.messages
                    .error(codes::FRAGMENTS_ON_COMPOSITE_TYPES, text, part.location);
            }
        }
    }
}

/// Every spread must name a defined fragment.
struct SpreadTargetDefined;

impl PartRule for SpreadTargetDefined {
    fn id(&self) -> &'static str {
        codes::FRAGMENT_SPREAD_TARGET_DEFINED
    }

    fn applies(&self, part: &Part) -> bool {
        matches!(part.kind, PartKind::FragmentSpread { .. })
    }

    fn check(&self, cx: &mut ValidateCtx<'_>, id: PartId) {
        let part = cx.doc.part(id);
        if let PartKind::FragmentSpread { name, target: None } = &part.kind {
            cx.messages.error(
                codes::FRAGMENT_SPREAD_TARGET_DEFINED,
                format!("fragment `{name}` is not defined"),
                part.location,
            );
        }
    }
}

/// A fragment can only be spread where its type condition might apply:
/// the possible-type sets of the enclosing type and the condition must
/// intersect. This one check covers all four object/abstract pairings.
struct SpreadIsPossible;

impl PartRule for SpreadIsPossible {
    fn id(&self) -> &'static str {
        codes::FRAGMENT_SPREAD_IS_POSSIBLE
    }

    fn applies(&self, part: &Part) -> bool {
        matches!(
            part.kind,
            PartKind::FragmentSpread { .. }
                | PartKind::InlineFragment {
                    type_condition: Some(_)
                }
        )
    }

    fn check(&self, cx: &mut ValidateCtx<'_>, id: PartId) {
        let part = cx.doc.part(id);
        let condition = match &part.kind {
            PartKind::FragmentSpread {
                target: Some(target),
                ..
            } => match &cx.doc.part(*target).kind {
                PartKind::NamedFragment { type_condition, .. } => type_condition.clone(),
                _ => return,
            },
            PartKind::InlineFragment {
                type_condition: Some(condition),
            } => condition.clone(),
            _ => return,
        };

        // Enclosing type: the nearest ancestor with a resolved graph type.
        let mut cursor = part.parent;
        let mut enclosing = None;
        while let Some(parent) = cursor {
            let p = cx.doc.part(parent);
            if let Some(ty) = &p.graph_type {
                enclosing = Some(ty.base_name().to_string());
                break;
            }
            cursor = p.parent;
        }
        let Some(enclosing) = enclosing else {
            return;
        };

        // Both sides must be known composite types; other rules report
        // the rest.
        let known_composite = |name: &str| {
            cx.schema
                .find_graph_type(name)
                .is_some_and(GraphType::is_composite)
        };
        if !known_composite(&enclosing) || !known_composite(&condition) {
            return;
        }

        if !cx.schema.types_overlap(&enclosing, &condition) {
            let path = cx.doc.path_of(id);
            cx.messages.add(
                Message::error(
                    codes::FRAGMENT_SPREAD_IS_POSSIBLE,
                    format!("fragment on `{condition}` can never apply to type `{enclosing}`"),
                )
                .at(part.location)
                .with_path(path),
            );
        }
    }
}

/// Leaf-typed fields take no selections; composite-typed fields require
/// them.
struct LeafFieldSelections;

impl PartRule for LeafFieldSelections {
    fn id(&self) -> &'static str {
        codes::LEAF_FIELD_SELECTIONS
    }

    fn applies(&self, part: &Part) -> bool {
        matches!(part.kind, PartKind::Field { .. })
    }

    fn check(&self, cx: &mut ValidateCtx<'_>, id: PartId) {
        let part = cx.doc.part(id);
        let Some(ty) = &part.graph_type else {
            return;
        };
        let Some(graph) = cx.schema.find_graph_type(ty.base_name()) else {
            return;
        };
        let Some(key) = part.response_key() else {
            return;
        };

        let has_selections = cx.doc.selections(id).next().is_some();
        if graph.is_leaf() && has_selections {
            let text = format!(
                "field `{key}` of leaf type `{}` must not have a selection set",
                ty.base_name()
            );
            cx.messages
                .error(codes::LEAF_FIELD_SELECTIONS, text, part.location);
        } else if graph.is_composite() && !has_selections {
            let text = format!(
                "field `{key}` of type `{}` must have a selection set",
                ty.base_name()
            );
            cx.messages
                .error(codes::LEAF_FIELD_SELECTIONS, text, part.location);
        }
    }
}

/// Non-null arguments without a default must be supplied, and not as an
/// explicit null literal.
struct RequiredArguments;

impl PartRule for RequiredArguments {
    fn id(&self) -> &'static str {
        codes::REQUIRED_ARGUMENTS
    }

    fn applies(&self, part: &Part) -> bool {
        matches!(
            part.kind,
            PartKind::Field { .. } | PartKind::Directive { .. }
        )
    }

    fn check(&self, cx: &mut ValidateCtx<'_>, id: PartId) {
        let part = cx.doc.part(id);
        let (host, required): (String, Vec<String>) = match &part.kind {
            PartKind::Field { name, .. } => {
                let def = part
                    .parent
                    .and_then(|p| cx.doc.part(p).graph_type.as_ref())
                    .and_then(|t| cx.schema.find_graph_type(t.base_name()))
                    .and_then(|t| t.field(name));
                let Some(def) = def else {
                    return;
                };
                (
                    format!("field `{name}`"),
                    def.required_arguments().map(|a| a.name.clone()).collect(),
                )
            }
            PartKind::Directive { name } => {
                let Some(def) = cx.schema.find_directive(name) else {
                    return;
                };
                (
                    format!("directive `@{name}`"),
                    def.arguments
                        .values()
                        .filter(|a| a.ty.is_required() && a.default_value.is_none())
                        .map(|a| a.name.clone())
                        .collect(),
                )
            }
            _ => return,
        };

        for name in required {
            let supplied = cx.doc.arguments(id).find(|&a| {
                matches!(&cx.doc.part(a).kind,
                    PartKind::Argument { name: existing, .. } if *existing == name)
            });
            match supplied {
                None => {
                    cx.messages.error(
                        codes::REQUIRED_ARGUMENTS,
                        format!("missing required argument `{name}` on {host}"),
                        part.location,
                    );
                }
                Some(arg) => {
                    let arg_part = cx.doc.part(arg);
                    if matches!(
                        arg_part.kind,
                        PartKind::Argument {
                            value: SuppliedValue::Null(_),
                            ..
                        }
                    ) {
                        cx.messages.error(
                            codes::REQUIRED_ARGUMENTS,
                            format!("required argument `{name}` on {host} must not be null"),
                            arg_part.location,
                        );
                    }
                }
            }
        }
    }
}

/// Supplied literals must be coercible to their declared input type.
struct ValuesOfCorrectType;

impl PartRule for ValuesOfCorrectType {
    fn id(&self) -> &'static str {
        codes::VALUES_OF_CORRECT_TYPE
    }

    fn applies(&self, part: &Part) -> bool {
        matches!(
            &part.kind,
            PartKind::Argument { .. }
                | PartKind::VariableDef {
                    default: Some(_),
                    ..
                }
        )
    }

    fn check(&self, cx: &mut ValidateCtx<'_>, id: PartId) {
        let part = cx.doc.part(id);
        match &part.kind {
            PartKind::Argument { value, .. } => {
                let Some(expected) = part.graph_type.clone() else {
                    return;
                };
                let vars = declared_variables(cx, id);
                let value = value.clone();
                check_value(cx, &value, &expected, vars.as_ref(), id);
            }
            PartKind::VariableDef {
                ty,
                default: Some(value),
                ..
            } => {
                let (ty, value) = (ty.clone(), value.clone());
                // Defaults are constant; the parser rejects variables here.
                check_value(cx, &value, &ty, None, id);
            }
            _ => {}
        }
    }
}

/// Variable names declared by the operation enclosing a part, or `None`
/// when the part sits inside a fragment definition.
fn declared_variables(cx: &ValidateCtx<'_>, id: PartId) -> Option<FxHashSet<String>> {
    let mut cursor = Some(id);
    while let Some(current) = cursor {
        let part = cx.doc.part(current);
        if let PartKind::Operation { .. } = part.kind {
            let mut names = FxHashSet::default();
            for def in cx.doc.variable_defs(current) {
                if let PartKind::VariableDef { name, .. } = &cx.doc.part(def).kind {
                    names.insert(name.clone());
                }
            }
            return Some(names);
        }
        cursor = part.parent;
    }
    None
}

/// Checks one supplied value, at its own source location. Nested list
/// items and object field values each report where they sit.
fn check_value(
    cx: &mut ValidateCtx<'_>,
    value: &SuppliedValue,
    expected: &TypeExpr,
    vars: Option<&FxHashSet<String>>,
    origin: PartId,
) {
    let location = value.location();
    if let SuppliedValue::Variable(name, _) = value {
        // Variable/declared-type compatibility is a plan-time concern;
        // here only existence is checked, and only inside operations.
        if let Some(vars) = vars {
            if !vars.contains(name) {
                cx.messages.error(
                    codes::ALL_VARIABLE_USES_DEFINED,
                    format!("variable `${name}` is not defined by the operation"),
                    location,
                );
            }
        }
        return;
    }

    match expected {
        TypeExpr::NonNull(inner) => {
            if matches!(value, SuppliedValue::Null(_)) {
                let path = cx.doc.path_of(origin);
                cx.messages.add(
                    Message::error(
                        codes::VALUES_OF_CORRECT_TYPE,
                        format!("expected a non-null `{inner}` value, got null"),
                    )
                    .at(location)
                    .with_path(path),
                );
            } else {
                check_value(cx, value, inner, vars, origin);
            }
        }
        TypeExpr::List(inner) => match value {
            SuppliedValue::List(items, _) => {
                for item in items {
                    check_value(cx, item, inner, vars, origin);
                }
            }
            SuppliedValue::Null(_) => {}
            // A single value coerces to a one-element list.
            single => check_value(cx, single, inner, vars, origin),
        },
        TypeExpr::Named(name) => {
            if matches!(value, SuppliedValue::Null(_)) {
                return;
            }
            if matches!(value, SuppliedValue::List(..)) {
                cx.messages.error(
                    codes::VALUES_OF_CORRECT_TYPE,
                    format!("expected a `{name}` value, got a list"),
                    location,
                );
                return;
            }
            let Some(graph) = cx.schema.find_graph_type(name) else {
                return;
            };
            match graph {
                GraphType::Scalar(def) => check_scalar(cx, def, value),
                GraphType::Enum(def) => {
                    let ok = matches!(value, SuppliedValue::Enum(v, _) if def.has_value(v));
                    if !ok {
                        let (name, kind) = (def.name.clone(), value.kind_name());
                        cx.messages.error(
                            codes::VALUES_OF_CORRECT_TYPE,
                            format!("expected a `{name}` enum value, got {kind}"),
                            location,
                        );
                    }
                }
                GraphType::InputObject(def) => {
                    let def = def.clone();
                    check_input_object(cx, &def, value, vars, origin);
                }
                other => {
                    let kind = other.kind().as_str();
                    cx.messages.error(
                        codes::VALUES_OF_CORRECT_TYPE,
                        format!("{kind} type `{name}` cannot be used as an input"),
                        location,
                    );
                }
            }
        }
    }
}

fn check_scalar(cx: &mut ValidateCtx<'_>, def: &ScalarDef, value: &SuppliedValue) {
    let ok = match def.name.as_str() {
        "Int" => matches!(value, SuppliedValue::Int(..)),
        "Float" => matches!(value, SuppliedValue::Int(..) | SuppliedValue::Float(..)),
        "String" => matches!(value, SuppliedValue::Str(..)),
        "Boolean" => matches!(value, SuppliedValue::Bool(..)),
        "ID" => matches!(value, SuppliedValue::Str(..) | SuppliedValue::Int(..)),
        // Custom scalars accept any literal shape.
        _ => true,
    };
    if !ok {
        let text = format!("expected a `{}` value, got {}", def.name, value.kind_name());
        cx.messages
            .error(codes::VALUES_OF_CORRECT_TYPE, text, value.location());
    }
}

fn check_input_object(
    cx: &mut ValidateCtx<'_>,
    def: &grapnel_schema::InputObjectDef,
    value: &SuppliedValue,
    vars: Option<&FxHashSet<String>>,
    origin: PartId,
) {
    let SuppliedValue::Object(fields, _) = value else {
        let text = format!(
            "expected an input object of type `{}`, got {}",
            def.name,
            value.kind_name()
        );
        cx.messages
            .error(codes::VALUES_OF_CORRECT_TYPE, text, value.location());
        return;
    };

    let mut seen = FxHashSet::default();
    for (name, field_value) in fields {
        if !seen.insert(name.as_str()) {
            cx.messages.error(
                codes::INPUT_OBJECT_FIELD_UNIQUENESS,
                format!("duplicate field `{name}` on input object `{}`", def.name),
                field_value.location(),
            );
            continue;
        }
        match def.fields.get(name) {
            Some(field_def) => {
                let ty = field_def.ty.clone();
                check_value(cx, field_value, &ty, vars, origin);
            }
            None => {
                cx.messages.error(
                    codes::INPUT_OBJECT_FIELD_NAMES,
                    format!("field `{name}` is not defined on input object `{}`", def.name),
                    field_value.location(),
                );
            }
        }
    }

    for required in def.required_fields() {
        if !seen.contains(required.name.as_str()) {
            cx.messages.error(
                codes::INPUT_OBJECT_REQUIRED_FIELDS,
                format!(
                    "missing required field `{}` on input object `{}`",
                    required.name, def.name
                ),
                value.location(),
            );
        }
    }
}

/// Each fragment name may be defined once.
struct FragmentNameUniqueness;

impl DocumentRule for FragmentNameUniqueness {
    fn check_document(&self, cx: &mut ValidateCtx<'_>) {
        let mut found = Vec::new();
        for (name, defs) in &cx.doc.fragments {
            for &extra in defs.iter().skip(1) {
                found.push((name.clone(), cx.doc.part(extra).location));
            }
        }
        for (name, location) in found {
            cx.messages.error(
                codes::FRAGMENT_NAME_UNIQUENESS,
                format!("duplicate fragment name `{name}`"),
                location,
            );
        }
    }
}

/// Every defined fragment must be spread at least once. One message per
/// fragment name, however many definitions it has.
struct FragmentsMustBeUsed;

impl DocumentRule for FragmentsMustBeUsed {
    fn check_document(&self, cx: &mut ValidateCtx<'_>) {
        let mut used = FxHashSet::default();
        for (_, part) in cx.doc.parts.iter() {
            if let PartKind::FragmentSpread { name, .. } = &part.kind {
                used.insert(name.as_str());
            }
        }

        let mut unused = Vec::new();
        for (name, defs) in &cx.doc.fragments {
            if !used.contains(name.as_str()) {
                if let Some(&first) = defs.first() {
                    unused.push((name.clone(), cx.doc.part(first).location));
                }
            }
        }
        for (name, location) in unused {
            cx.messages.error(
                codes::FRAGMENTS_MUST_BE_USED,
                format!("fragment `{name}` is never used"),
                location,
            );
        }
    }
}

/// Fragments must not spread themselves, directly or transitively.
struct FragmentCycles;

impl DocumentRule for FragmentCycles {
    fn check_document(&self, cx: &mut ValidateCtx<'_>) {
        // Direct spread edges per fragment, by first definition.
        let mut edges: FxHashMap<&str, Vec<String>> = FxHashMap::default();
        for (name, defs) in &cx.doc.fragments {
            let mut targets = Vec::new();
            if let Some(&first) = defs.first() {
                let mut stack = vec![first];
                while let Some(id) = stack.pop() {
                    for &child in &cx.doc.part(id).children {
                        if let PartKind::FragmentSpread { name, .. } = &cx.doc.part(child).kind {
                            targets.push(name.clone());
                        }
                        stack.push(child);
                    }
                }
            }
            edges.insert(name.as_str(), targets);
        }

        let mut cyclic = Vec::new();
        for (name, defs) in &cx.doc.fragments {
            let Some(&first) = defs.first() else {
                continue;
            };
            let mut visited = FxHashSet::default();
            let mut stack: Vec<&str> = edges
                .get(name.as_str())
                .into_iter()
                .flatten()
                .map(String::as_str)
                .collect();
            while let Some(next) = stack.pop() {
                if next == name {
                    cyclic.push((name.clone(), cx.doc.part(first).location));
                    break;
                }
                if visited.insert(next) {
                    if let Some(more) = edges.get(next) {
                        stack.extend(more.iter().map(String::as_str));
                    }
                }
            }
        }
        for (name, location) in cyclic {
            cx.messages.error(
                codes::FRAGMENT_SPREADS_MUST_NOT_FORM_CYCLES,
                format!("fragment `{name}` cannot spread itself, directly or through a cycle"),
                location,
            );
        }
    }
}
