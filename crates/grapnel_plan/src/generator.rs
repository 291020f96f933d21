//! The async plan generator.
//!
//! For each selection-set level the generator collects executable
//! fields in declaration order, flattening fragment spreads and inline
//! fragments whose type conditions can apply and honoring `@skip` /
//! `@include`. Sibling field contexts are created as futures and
//! gathered with `join_all`, whose output order matches the input
//! order, so results reassemble in declaration order no matter how the
//! futures complete. Abstract return types expand into one typed
//! selection per schema-known concrete type, fanned out the same way.
//!
//! Dropping the returned future cancels all in-flight work; no
//! cancellation token is threaded.

use crate::input::ResolverSet;
use crate::operation::{
    ArgumentValue, ExecutableOperation, FieldContext, TypedSelection, Variables,
};
use futures::future::{join_all, BoxFuture, FutureExt};
use grapnel_core::SourcePath;
use grapnel_document::{Document, PartId, PartKind, SuppliedValue};
use grapnel_schema::Schema;
use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

/// A planning failure. Validation problems never reach here; a document
/// carrying error messages is refused outright.
#[derive(Debug, Clone, Error)]
pub enum PlanError {
    #[error("document has {0} error message(s); refusing to plan")]
    DocumentHasErrors(usize),
    #[error("operation `{0}` is not defined in the document")]
    UnknownOperation(String),
    #[error("the document defines multiple operations; an operation name is required")]
    AmbiguousOperation,
    #[error("variable `${0}` is required but was not provided")]
    MissingVariable(String),
    #[error("invalid value for `{ty}`: {reason}")]
    InvalidValue { ty: String, reason: String },
    #[error("unknown type `{0}` referenced during planning")]
    UnknownType(String),
}

/// Generates an executable operation from a validated document.
pub async fn generate(
    document: &Document,
    operation_name: Option<&str>,
    schema: &Schema,
    variables: &Variables,
) -> Result<ExecutableOperation, PlanError> {
    if document.messages.has_errors() {
        return Err(PlanError::DocumentHasErrors(document.messages.error_count()));
    }

    let op_id = document
        .operation(operation_name)
        .ok_or_else(|| match operation_name {
            Some(name) => PlanError::UnknownOperation(name.to_string()),
            None => PlanError::AmbiguousOperation,
        })?;
    let part = document.part(op_id);
    let PartKind::Operation { kind, name } = &part.kind else {
        return Err(PlanError::AmbiguousOperation);
    };
    let root = part
        .graph_type
        .as_ref()
        .map(|t| t.base_name().to_string())
        .ok_or_else(|| PlanError::UnknownType("<operation root>".to_string()))?;

    let selections = plan_selections(
        document,
        schema,
        variables,
        op_id,
        root.clone(),
        SourcePath::new(),
    )
    .await?;

    let label = if name.is_empty() { "<anonymous>" } else { name.as_str() };
    debug!(operation = label, fields = selections.len(), "operation planned");
    Ok(ExecutableOperation {
        kind: *kind,
        name: (!name.is_empty()).then(|| name.clone()),
        root_type: root,
        selections,
    })
}

fn plan_selections<'a>(
    document: &'a Document,
    schema: &'a Schema,
    variables: &'a Variables,
    parent: PartId,
    source_type: String,
    path: SourcePath,
) -> BoxFuture<'a, Result<Vec<FieldContext>, PlanError>> {
    async move {
        let mut fields = Vec::new();
        collect_fields(document, schema, variables, parent, &source_type, &mut fields)?;

        let futures: Vec<_> = fields
            .iter()
            .map(|&f| {
                field_context(document, schema, variables, f, source_type.clone(), path.clone())
            })
            .collect();
        join_all(futures).await.into_iter().collect()
    }
    .boxed()
}

/// Collects executable field parts in declaration order, descending
/// through fragments whose type conditions can apply to `source_type`.
fn collect_fields(
    document: &Document,
    schema: &Schema,
    variables: &Variables,
    parent: PartId,
    source_type: &str,
    out: &mut Vec<PartId>,
) -> Result<(), PlanError> {
    for sel in document.selections(parent) {
        if !directives_allow(document, variables, sel)? {
            continue;
        }
        match &document.part(sel).kind {
            PartKind::Field { .. } => out.push(sel),
            PartKind::FragmentSpread {
                target: Some(target),
                ..
            } => {
                let applies = match &document.part(*target).kind {
                    PartKind::NamedFragment { type_condition, .. } => {
                        schema.types_overlap(type_condition, source_type)
                    }
                    _ => false,
                };
                if applies {
                    collect_fields(document, schema, variables, *target, source_type, out)?;
                }
            }
            PartKind::FragmentSpread { target: None, .. } => {}
            PartKind::InlineFragment { type_condition } => {
                let applies = type_condition
                    .as_deref()
                    .map_or(true, |c| schema.types_overlap(c, source_type));
                if applies {
                    collect_fields(document, schema, variables, sel, source_type, out)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Evaluates `@skip` / `@include` on a selection.
fn directives_allow(
    document: &Document,
    variables: &Variables,
    id: PartId,
) -> Result<bool, PlanError> {
    for directive in document.directives(id) {
        let PartKind::Directive { name } = &document.part(directive).kind else {
            continue;
        };
        let excluded_when = match name.as_str() {
            "skip" => true,
            "include" => false,
            _ => continue,
        };
        if directive_condition(document, variables, directive)? == excluded_when {
            return Ok(false);
        }
    }
    Ok(true)
}

fn directive_condition(
    document: &Document,
    variables: &Variables,
    directive: PartId,
) -> Result<bool, PlanError> {
    for arg in document.arguments(directive) {
        if let PartKind::Argument { name, value } = &document.part(arg).kind {
            if name == "if" {
                return match value {
                    SuppliedValue::Bool(b, _) => Ok(*b),
                    SuppliedValue::Variable(v, _) => match variables.get(v) {
                        Some(serde_json::Value::Bool(b)) => Ok(*b),
                        Some(other) => Err(PlanError::InvalidValue {
                            ty: "Boolean!".to_string(),
                            reason: format!("variable `${v}` holds `{other}`, not a boolean"),
                        }),
                        None => Err(PlanError::MissingVariable(v.clone())),
                    },
                    _ => Ok(false),
                };
            }
        }
    }
    // Validation reports the missing required `if`.
    Ok(false)
}

fn field_context<'a>(
    document: &'a Document,
    schema: &'a Schema,
    variables: &'a Variables,
    field: PartId,
    source_type: String,
    path: SourcePath,
) -> BoxFuture<'a, Result<FieldContext, PlanError>> {
    async move {
        let part = document.part(field);
        let PartKind::Field { name, alias } = &part.kind else {
            return Err(PlanError::UnknownType(source_type));
        };
        let response_key = alias.clone().unwrap_or_else(|| name.clone());
        let path = path.with_field(&response_key);
        let Some(field_type) = part.graph_type.clone() else {
            return Err(PlanError::UnknownType(name.clone()));
        };

        let arguments =
            resolve_arguments(document, schema, variables, field, &source_type, name)?;

        let base = field_type.base_name().to_string();
        let mut children = Vec::new();
        if document.selections(field).next().is_some() {
            let concrete: Vec<String> = match schema.find_graph_type(&base) {
                Some(t) if t.is_abstract() => schema
                    .possible_types(&base)
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
                Some(t) if t.is_composite() => vec![base.clone()],
                _ => Vec::new(),
            };

            let futures: Vec<_> = concrete
                .iter()
                .map(|c| {
                    plan_selections(document, schema, variables, field, c.clone(), path.clone())
                })
                .collect();
            let results = join_all(futures).await;
            for (type_name, result) in concrete.into_iter().zip(results) {
                children.push(TypedSelection {
                    type_name,
                    fields: result?,
                });
            }
        }

        // The binding follows the type the field is selected from, not
        // the type it returns.
        let concrete_binding = schema.concrete_binding(&source_type).map(ToString::to_string);
        Ok(FieldContext {
            name: name.clone(),
            response_key,
            source_type,
            concrete_binding,
            field_type,
            arguments,
            children,
            location: part.location,
            path,
        })
    }
    .boxed()
}

/// Resolves argument values in schema declaration order.
///
/// Precedence per argument: a query-supplied value wins; absent that,
/// the schema default; absent both, the argument is omitted. A supplied
/// variable reference with no request value stays deferred for
/// execution-time binding.
fn resolve_arguments(
    document: &Document,
    schema: &Schema,
    variables: &Variables,
    field: PartId,
    source_type: &str,
    field_name: &str,
) -> Result<IndexMap<String, ArgumentValue>, PlanError> {
    let mut out = IndexMap::new();
    let Some(def) = schema
        .find_graph_type(source_type)
        .and_then(|t| t.field(field_name))
    else {
        // `__typename` and friends take no arguments.
        return Ok(out);
    };

    let mut resolvers = ResolverSet::new();
    for arg_def in def.arguments.values() {
        let supplied = document.arguments(field).find_map(|a| {
            match &document.part(a).kind {
                PartKind::Argument { name, value } if name == &arg_def.name => Some(value.clone()),
                _ => None,
            }
        });

        let resolved = match supplied {
            Some(SuppliedValue::Variable(v, _)) if !variables.contains(&v) => {
                ArgumentValue::Deferred { variable: v }
            }
            Some(value) => {
                let resolver = resolvers.resolver_for(schema, &arg_def.ty)?;
                ArgumentValue::Literal(resolver.resolve(&value, variables)?)
            }
            None => match &arg_def.default_value {
                Some(default) => ArgumentValue::Literal(default.clone()),
                None => continue,
            },
        };
        out.insert(arg_def.name.clone(), resolved);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use grapnel_core::SourceText;
    use grapnel_document::DocumentBuilder;
    use grapnel_schema::{
        FieldDef, InputValueDef, InterfaceDef, ObjectDef, SchemaBuilder, TypeExpr, UnionDef,
    };
    use serde_json::json;

    fn object(name: &str, implements: &[&str], fields: Vec<FieldDef>) -> ObjectDef {
        ObjectDef {
            name: name.to_string(),
            description: None,
            fields: fields.into_iter().map(|f| (f.name.clone(), f)).collect(),
            implements: implements.iter().map(ToString::to_string).collect(),
            concrete: None,
        }
    }

    fn test_schema() -> Schema {
        SchemaBuilder::new()
            .query_type("Query")
            .interface(InterfaceDef {
                name: "Animal".to_string(),
                description: None,
                fields: [(
                    "name".to_string(),
                    FieldDef::new("name", TypeExpr::named("String")),
                )]
                .into_iter()
                .collect(),
            })
            .object(object(
                "Dog",
                &["Animal"],
                vec![
                    FieldDef::new("name", TypeExpr::named("String")),
                    FieldDef::new("barkVolume", TypeExpr::named("Int")),
                ],
            ))
            .object(object(
                "Cat",
                &["Animal"],
                vec![
                    FieldDef::new("name", TypeExpr::named("String")),
                    FieldDef::new("lives", TypeExpr::named("Int")),
                ],
            ))
            .union(UnionDef {
                name: "Pet".to_string(),
                description: None,
                members: vec!["Dog".to_string(), "Cat".to_string()],
            })
            .object(object(
                "Query",
                &[],
                vec![
                    FieldDef::new("animal", TypeExpr::named("Animal")),
                    FieldDef::new("dog", TypeExpr::named("Dog")),
                    FieldDef::new("dogByName", TypeExpr::named("Dog")).with_argument(
                        InputValueDef::new("name", TypeExpr::named("String").non_null()),
                    ),
                    FieldDef::new("dogs", TypeExpr::named("Dog").list()).with_argument(
                        InputValueDef::new("first", TypeExpr::named("Int")).with_default(json!(10)),
                    ),
                ],
            ))
            .build()
    }

    fn build(schema: &Schema, input: &str) -> Document {
        let source = SourceText::new(input);
        let tree = grapnel_syntax::parse(&source).expect("should parse");
        DocumentBuilder::new(schema)
            .build(&source, &tree)
            .expect("should construct")
    }

    #[tokio::test]
    async fn test_basic_plan() {
        let schema = test_schema();
        let doc = build(&schema, "{ dog { name } }");
        let plan = generate(&doc, None, &schema, &Variables::new()).await.unwrap();

        assert_eq!(plan.root_type, "Query");
        assert!(plan.name.is_none());
        assert_eq!(plan.selections.len(), 1);

        let dog = &plan.selections[0];
        assert_eq!(dog.response_key, "dog");
        assert_eq!(dog.source_type, "Query");
        assert_eq!(dog.children.len(), 1);
        assert_eq!(dog.children[0].type_name, "Dog");

        let name = &dog.children[0].fields[0];
        assert_eq!(name.path.to_dot_string(), "dog.name");
    }

    #[tokio::test]
    async fn test_alias_becomes_response_key() {
        let schema = test_schema();
        let doc = build(&schema, "{ pup: dog { name } }");
        let plan = generate(&doc, None, &schema, &Variables::new()).await.unwrap();

        let field = &plan.selections[0];
        assert_eq!(field.name, "dog");
        assert_eq!(field.response_key, "pup");
        assert!(plan.selection("pup").is_some());
    }

    #[tokio::test]
    async fn test_declaration_order_preserved() {
        let schema = test_schema();
        let doc = build(&schema, "{ dog { barkVolume name __typename } }");
        let plan = generate(&doc, None, &schema, &Variables::new()).await.unwrap();

        let keys: Vec<_> = plan.selections[0].children[0]
            .fields
            .iter()
            .map(|f| f.response_key.as_str())
            .collect();
        assert_eq!(keys, vec!["barkVolume", "name", "__typename"]);
    }

    #[tokio::test]
    async fn test_abstract_type_expands_per_concrete_type() {
        let schema = test_schema();
        let doc = build(&schema, "{ animal { name } }");
        let plan = generate(&doc, None, &schema, &Variables::new()).await.unwrap();

        let animal = &plan.selections[0];
        let types: Vec<_> = animal.children.iter().map(|s| s.type_name.as_str()).collect();
        assert_eq!(types, vec!["Cat", "Dog"]);
        for group in &animal.children {
            assert_eq!(group.fields[0].name, "name");
            assert_eq!(group.fields[0].source_type, group.type_name);
        }
    }

    #[tokio::test]
    async fn test_fragments_flatten_per_matching_type() {
        let schema = test_schema();
        let doc = build(
            &schema,
            "{ animal { ... on Dog { barkVolume } name } } ",
        );
        let plan = generate(&doc, None, &schema, &Variables::new()).await.unwrap();

        let animal = &plan.selections[0];
        let dog = animal.children.iter().find(|s| s.type_name == "Dog").unwrap();
        let dog_keys: Vec<_> = dog.fields.iter().map(|f| f.response_key.as_str()).collect();
        assert_eq!(dog_keys, vec!["barkVolume", "name"]);

        let cat = animal.children.iter().find(|s| s.type_name == "Cat").unwrap();
        let cat_keys: Vec<_> = cat.fields.iter().map(|f| f.response_key.as_str()).collect();
        assert_eq!(cat_keys, vec!["name"]);
    }

    #[tokio::test]
    async fn test_named_spread_flattens() {
        let schema = test_schema();
        let doc = build(
            &schema,
            "{ dog { ...Bits } } fragment Bits on Dog { name barkVolume }",
        );
        let plan = generate(&doc, None, &schema, &Variables::new()).await.unwrap();

        let keys: Vec<_> = plan.selections[0].children[0]
            .fields
            .iter()
            .map(|f| f.response_key.as_str())
            .collect();
        assert_eq!(keys, vec!["name", "barkVolume"]);
    }

    #[tokio::test]
    async fn test_skip_and_include() {
        let schema = test_schema();
        let doc = build(
            &schema,
            "query Q($yes: Boolean!) { dog { name @skip(if: true) barkVolume @include(if: $yes) } }",
        );
        let mut vars = Variables::new();
        vars.insert("yes", json!(true));
        let plan = generate(&doc, None, &schema, &vars).await.unwrap();

        let keys: Vec<_> = plan.selections[0].children[0]
            .fields
            .iter()
            .map(|f| f.response_key.as_str())
            .collect();
        assert_eq!(keys, vec!["barkVolume"]);
    }

    #[tokio::test]
    async fn test_source_type_binding_flows_to_its_field_contexts() {
        let mut query = object("Query", &[], vec![FieldDef::new("dog", TypeExpr::named("Dog"))]);
        query.concrete = Some("QueryController".to_string());
        let schema = SchemaBuilder::new()
            .query_type("Query")
            .object(object(
                "Dog",
                &[],
                vec![FieldDef::new("name", TypeExpr::named("String"))],
            ))
            .object(query)
            .build();

        let doc = build(&schema, "{ dog { name } }");
        let plan = generate(&doc, None, &schema, &Variables::new()).await.unwrap();

        // `dog` is selected from Query, which carries the binding.
        let dog = &plan.selections[0];
        assert_eq!(dog.concrete_binding.as_deref(), Some("QueryController"));

        // Dog declares no binding, so its children carry none.
        assert_eq!(dog.children[0].fields[0].concrete_binding, None);
    }

    #[tokio::test]
    async fn test_non_boolean_condition_variable_is_rejected() {
        let schema = test_schema();
        let doc = build(&schema, "query Q($yes: Boolean!) { dog { name @include(if: $yes) } }");
        let mut vars = Variables::new();
        vars.insert("yes", json!("yep"));
        let err = generate(&doc, None, &schema, &vars).await.unwrap_err();
        assert!(matches!(err, PlanError::InvalidValue { ty, .. } if ty == "Boolean!"));
    }

    #[tokio::test]
    async fn test_missing_condition_variable_is_an_error() {
        let schema = test_schema();
        let doc = build(&schema, "query Q($yes: Boolean!) { dog { name @include(if: $yes) } }");
        let err = generate(&doc, None, &schema, &Variables::new()).await.unwrap_err();
        assert!(matches!(err, PlanError::MissingVariable(v) if v == "yes"));
    }

    #[tokio::test]
    async fn test_argument_resolution_precedence() {
        let schema = test_schema();
        let doc = build(
            &schema,
            "query Q($n: String!) { dogByName(name: $n) { name } dogs { name } }",
        );
        let mut vars = Variables::new();
        vars.insert("n", json!("Rex"));
        let plan = generate(&doc, None, &schema, &vars).await.unwrap();

        let by_name = plan.selection("dogByName").unwrap();
        assert_eq!(
            by_name.arguments.get("name"),
            Some(&ArgumentValue::Literal(json!("Rex")))
        );

        // Unsupplied argument falls back to the schema default.
        let dogs = plan.selection("dogs").unwrap();
        assert_eq!(
            dogs.arguments.get("first"),
            Some(&ArgumentValue::Literal(json!(10)))
        );
    }

    #[tokio::test]
    async fn test_unbound_variable_argument_is_deferred() {
        let schema = test_schema();
        let doc = build(&schema, "query Q($n: String!) { dogByName(name: $n) { name } }");
        let plan = generate(&doc, Some("Q"), &schema, &Variables::new()).await.unwrap();

        let by_name = plan.selection("dogByName").unwrap();
        assert_eq!(
            by_name.arguments.get("name"),
            Some(&ArgumentValue::Deferred {
                variable: "n".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_document_with_errors_is_refused() {
        let schema = test_schema();
        let doc = build(&schema, "{ missing { x } }");
        let err = generate(&doc, None, &schema, &Variables::new()).await.unwrap_err();
        assert!(matches!(err, PlanError::DocumentHasErrors(1)));
    }

    #[tokio::test]
    async fn test_unknown_operation_name() {
        let schema = test_schema();
        let doc = build(&schema, "query A { dog { name } }");
        let err = generate(&doc, Some("B"), &schema, &Variables::new()).await.unwrap_err();
        assert!(matches!(err, PlanError::UnknownOperation(n) if n == "B"));
    }

    #[tokio::test]
    async fn test_multiple_operations_need_a_name() {
        let schema = test_schema();
        let doc = build(
            &schema,
            "query A { dog { name } } query B { animal { name } }",
        );
        let err = generate(&doc, None, &schema, &Variables::new()).await.unwrap_err();
        assert!(matches!(err, PlanError::AmbiguousOperation));

        let plan = generate(&doc, Some("B"), &schema, &Variables::new()).await.unwrap();
        assert_eq!(plan.name.as_deref(), Some("B"));
    }
}
