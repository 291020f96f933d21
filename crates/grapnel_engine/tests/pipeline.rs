//! End-to-end pipeline tests: parse, construct, validate, plan.

use std::sync::Arc;

use grapnel_core::SourceText;
use grapnel_document::{validate, DocumentBuilder};
use grapnel_engine::{Engine, EngineError, EngineOptions};
use grapnel_plan::{ArgumentValue, Variables};
use grapnel_schema::{
    EnumDef, FieldDef, InputObjectDef, InputValueDef, InterfaceDef, ObjectDef, Schema,
    SchemaBuilder, TypeExpr, UnionDef,
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

fn pet_schema() -> Schema {
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
                FieldDef::new("friend", TypeExpr::named("Dog")),
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
        .enumeration(EnumDef {
            name: "Color".to_string(),
            description: None,
            values: vec!["RED".to_string(), "GREEN".to_string()],
        })
        .input_object(InputObjectDef {
            name: "DogFilter".to_string(),
            description: None,
            fields: [
                (
                    "name".to_string(),
                    InputValueDef::new("name", TypeExpr::named("String").non_null()),
                ),
                (
                    "maxAge".to_string(),
                    InputValueDef::new("maxAge", TypeExpr::named("Int")),
                ),
            ]
            .into_iter()
            .collect(),
        })
        .object(object(
            "Query",
            &[],
            vec![
                FieldDef::new("animal", TypeExpr::named("Animal")),
                FieldDef::new("dog", TypeExpr::named("Dog")),
                FieldDef::new("cat", TypeExpr::named("Cat")),
                FieldDef::new("pet", TypeExpr::named("Pet")),
                FieldDef::new("dogByName", TypeExpr::named("Dog")).with_argument(
                    InputValueDef::new("name", TypeExpr::named("String").non_null()),
                ),
                FieldDef::new("dogsByTags", TypeExpr::named("Dog").list()).with_argument(
                    InputValueDef::new("tags", TypeExpr::named("String").non_null().list()),
                ),
                FieldDef::new("findDog", TypeExpr::named("Dog"))
                    .with_argument(InputValueDef::new("filter", TypeExpr::named("DogFilter"))),
                FieldDef::new("byColor", TypeExpr::named("Dog").list())
                    .with_argument(InputValueDef::new("color", TypeExpr::named("Color"))),
            ],
        ))
        .build()
}

fn engine() -> Engine {
    Engine::new(Arc::new(pet_schema()))
}

/// Error codes of an `Invalid` outcome, in report order.
fn invalid_codes(err: EngineError) -> Vec<&'static str> {
    match err {
        EngineError::Invalid(bag) => bag.errors().map(|m| m.code).collect(),
        other => panic!("expected Invalid, got {other:?}"),
    }
}

#[tokio::test]
async fn test_user_query_yields_one_root_context_with_two_children() {
    let schema = SchemaBuilder::new()
        .query_type("Query")
        .object(object(
            "User",
            &[],
            vec![
                FieldDef::new("id", TypeExpr::named("ID")),
                FieldDef::new("name", TypeExpr::named("String")),
            ],
        ))
        .object(object(
            "Query",
            &[],
            vec![FieldDef::new("user", TypeExpr::named("User"))],
        ))
        .build();

    let plan = Engine::new(Arc::new(schema))
        .process("query { user { id name } }", None, &Variables::new())
        .await
        .expect("zero messages expected");

    assert_eq!(plan.selections.len(), 1);
    let user = &plan.selections[0];
    assert_eq!(user.response_key, "user");
    let keys: Vec<_> = user.children[0]
        .fields
        .iter()
        .map(|f| f.response_key.as_str())
        .collect();
    assert_eq!(keys, vec!["id", "name"]);
}

#[tokio::test]
async fn test_basic_valid_query_produces_a_plan() {
    let plan = engine()
        .process(
            "query GetDog { dog { name barkVolume } }",
            None,
            &Variables::new(),
        )
        .await
        .expect("pipeline should succeed");

    assert_eq!(plan.name.as_deref(), Some("GetDog"));
    assert_eq!(plan.root_type, "Query");
    let dog = plan.selection("dog").expect("dog field planned");
    let keys: Vec<_> = dog.children[0]
        .fields
        .iter()
        .map(|f| f.response_key.as_str())
        .collect();
    assert_eq!(keys, vec!["name", "barkVolume"]);
}

#[tokio::test]
async fn test_undefined_field_is_reported_not_planned() {
    let err = engine()
        .process("{ dog { name meowVolume } }", None, &Variables::new())
        .await
        .unwrap_err();
    assert_eq!(invalid_codes(err), vec!["5.3.1"]);
}

#[tokio::test]
async fn test_syntax_error_surfaces_as_syntax() {
    let err = engine()
        .process("{ dog { name ", None, &Variables::new())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Syntax(_)));
}

#[tokio::test]
async fn test_structure_is_stable_across_runs() {
    let query = "{ dog { barkVolume name friend { name } } }";
    let engine = engine();

    let first = engine.process(query, None, &Variables::new()).await.unwrap();
    let second = engine.process(query, None, &Variables::new()).await.unwrap();

    let shape = |plan: &grapnel_plan::ExecutableOperation| -> Vec<String> {
        plan.selections[0].children[0]
            .fields
            .iter()
            .map(|f| format!("{}:{}", f.response_key, f.path.to_dot_string()))
            .collect()
    };
    assert_eq!(shape(&first), shape(&second));
    assert_eq!(
        shape(&first),
        vec!["barkVolume:dog.barkVolume", "name:dog.name", "friend:dog.friend"]
    );
}

#[tokio::test]
async fn test_validation_is_idempotent() {
    let schema = pet_schema();
    let source = SourceText::new(
        "{ dog { meowVolume } } fragment Unused on Cat { lives }",
    );
    let tree = grapnel_syntax::parse(&source).unwrap();
    let doc = DocumentBuilder::new(&schema).build(&source, &tree).unwrap();

    let first = validate(&doc, &schema);
    let second = validate(&doc, &schema);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_depth_guard_aborts_deep_queries() {
    let engine = Engine::new(Arc::new(pet_schema())).with_options(EngineOptions { max_depth: 10 });

    let mut query = String::from("{ dog ");
    for _ in 0..50 {
        query.push_str("{ friend ");
    }
    query.push_str("{ name }");
    for _ in 0..51 {
        query.push('}');
    }

    let err = engine.process(&query, None, &Variables::new()).await.unwrap_err();
    assert!(matches!(err, EngineError::Build(_)));

    // The same shape within the limit goes through.
    let ok = engine
        .process(
            "{ dog { friend { friend { name } } } }",
            None,
            &Variables::new(),
        )
        .await;
    assert!(ok.is_ok());
}

#[tokio::test]
async fn test_fragment_cycle_is_rejected() {
    let err = engine()
        .process(
            "{ dog { ...A } } \
             fragment A on Dog { name ...B } \
             fragment B on Dog { barkVolume ...A }",
            None,
            &Variables::new(),
        )
        .await
        .unwrap_err();
    let codes = invalid_codes(err);
    assert!(codes.contains(&"5.5.2.2"));
}

#[tokio::test]
async fn test_unused_fragment_is_exactly_one_message() {
    let err = engine()
        .process(
            "{ dog { name } } fragment Unused on Dog { name barkVolume }",
            None,
            &Variables::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(invalid_codes(err), vec!["5.5.1.4"]);
}

#[tokio::test]
async fn test_spread_compatibility_across_interface() {
    // Dog can spread into Animal scope.
    let ok = engine()
        .process(
            "{ animal { name ... on Dog { barkVolume } } }",
            None,
            &Variables::new(),
        )
        .await;
    assert!(ok.is_ok());

    // Dog can never appear inside a Cat scope.
    let err = engine()
        .process(
            "{ cat { name ... on Dog { barkVolume } } }",
            None,
            &Variables::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(invalid_codes(err), vec!["5.5.2.3"]);
}

#[tokio::test]
async fn test_single_value_coerces_into_list_argument() {
    let plan = engine()
        .process(
            r#"{ dogsByTags(tags: "fast") { name } }"#,
            None,
            &Variables::new(),
        )
        .await
        .expect("single value coerces into a list");

    let field = plan.selection("dogsByTags").unwrap();
    assert_eq!(
        field.arguments.get("tags"),
        Some(&ArgumentValue::Literal(json!(["fast"])))
    );
}

#[tokio::test]
async fn test_list_for_single_value_is_rejected() {
    let err = engine()
        .process(
            r#"{ dogByName(name: ["Rex"]) { name } }"#,
            None,
            &Variables::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(invalid_codes(err), vec!["5.6.1"]);
}

#[tokio::test]
async fn test_null_inside_non_null_list_element_is_rejected() {
    let err = engine()
        .process(
            r#"{ dogsByTags(tags: ["fast", null]) { name } }"#,
            None,
            &Variables::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(invalid_codes(err), vec!["5.6.1"]);
}

#[tokio::test]
async fn test_input_object_argument_resolves_with_variables() {
    let mut vars = Variables::new();
    vars.insert("n", json!("Rex"));
    let plan = engine()
        .process(
            "query Q($n: String!) { findDog(filter: { name: $n, maxAge: 7 }) { name } }",
            None,
            &vars,
        )
        .await
        .unwrap();

    let field = plan.selection("findDog").unwrap();
    assert_eq!(
        field.arguments.get("filter"),
        Some(&ArgumentValue::Literal(json!({"name": "Rex", "maxAge": 7})))
    );
}

#[tokio::test]
async fn test_enum_and_skip_directive_round_trip() {
    let mut vars = Variables::new();
    vars.insert("hide", json!(true));
    let plan = engine()
        .process(
            "query Q($hide: Boolean!) { byColor(color: GREEN) { name barkVolume @skip(if: $hide) } }",
            None,
            &vars,
        )
        .await
        .unwrap();

    let field = plan.selection("byColor").unwrap();
    assert_eq!(
        field.arguments.get("color"),
        Some(&ArgumentValue::Literal(json!("GREEN")))
    );
    let keys: Vec<_> = field.children[0]
        .fields
        .iter()
        .map(|f| f.response_key.as_str())
        .collect();
    assert_eq!(keys, vec!["name"]);
}

#[tokio::test]
async fn test_abstract_root_field_expands_into_typed_groups() {
    let plan = engine()
        .process(
            "{ pet { ... on Dog { name } ... on Cat { lives } } }",
            None,
            &Variables::new(),
        )
        .await
        .unwrap();

    let pet = plan.selection("pet").unwrap();
    let dog = pet.selection_for("Dog").expect("Dog group planned");
    assert_eq!(dog.fields[0].name, "name");
    let cat = pet.selection_for("Cat").expect("Cat group planned");
    assert_eq!(cat.fields[0].name, "lives");
}
