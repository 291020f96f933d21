//! The schema registry and its builder.

use crate::expr::TypeExpr;
use crate::types::{
    DirectiveDef, EnumDef, GraphType, InputObjectDef, InputValueDef, InterfaceDef, ObjectDef,
    ScalarDef,
};
use rustc_hash::FxHashMap;

/// The kind of an executable operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
            Self::Subscription => "subscription",
        }
    }
}

/// A read-only registry of graph types.
///
/// Immutable after [`SchemaBuilder::build`]; all lookups take `&self`, so
/// one schema is safely shared across concurrent requests.
#[derive(Debug)]
pub struct Schema {
    types: FxHashMap<String, GraphType>,
    directives: FxHashMap<String, DirectiveDef>,
    query_type: Option<String>,
    mutation_type: Option<String>,
    subscription_type: Option<String>,
    /// Concrete object types per abstract type name.
    possible: FxHashMap<String, Vec<String>>,
}

impl Schema {
    /// Looks up a graph type by name.
    #[must_use]
    pub fn find_graph_type(&self, name: &str) -> Option<&GraphType> {
        self.types.get(name)
    }

    /// Looks up a directive by name.
    #[must_use]
    pub fn find_directive(&self, name: &str) -> Option<&DirectiveDef> {
        self.directives.get(name)
    }

    /// The root type name for an operation kind, if the schema supports it.
    #[must_use]
    pub fn root_type(&self, kind: OperationKind) -> Option<&str> {
        match kind {
            OperationKind::Query => self.query_type.as_deref(),
            OperationKind::Mutation => self.mutation_type.as_deref(),
            OperationKind::Subscription => self.subscription_type.as_deref(),
        }
    }

    /// Expands an abstract type to its concrete object types: interface
    /// implementors ordered by name, union members in declaration order.
    /// An object type expands to itself.
    #[must_use]
    pub fn possible_types(&self, name: &str) -> Vec<&str> {
        match self.types.get(name) {
            Some(GraphType::Object(d)) => vec![d.name.as_str()],
            Some(GraphType::Interface(_) | GraphType::Union(_)) => self
                .possible
                .get(name)
                .map(|v| v.iter().map(String::as_str).collect())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// The native type an object is strictly bound to, if any.
    #[must_use]
    pub fn concrete_binding(&self, name: &str) -> Option<&str> {
        match self.types.get(name) {
            Some(GraphType::Object(d)) => d.concrete.as_deref(),
            _ => None,
        }
    }

    /// True if two composite types can overlap: some concrete object type
    /// belongs to both.
    #[must_use]
    pub fn types_overlap(&self, a: &str, b: &str) -> bool {
        if a == b {
            return true;
        }
        let pa = self.possible_types(a);
        let pb = self.possible_types(b);
        pa.iter().any(|t| pb.contains(t))
    }

    /// True if `expr`'s base type exists and is usable as an input type.
    #[must_use]
    pub fn is_input_type(&self, expr: &TypeExpr) -> bool {
        self.find_graph_type(expr.base_name())
            .is_some_and(GraphType::is_input)
    }
}

/// Fluent builder for [`Schema`].
///
/// Built-in scalars (`Int`, `Float`, `String`, `Boolean`, `ID`) and the
/// `@skip`, `@include`, and `@deprecated` directives are pre-registered.
#[derive(Debug)]
pub struct SchemaBuilder {
    types: FxHashMap<String, GraphType>,
    directives: FxHashMap<String, DirectiveDef>,
    query_type: Option<String>,
    mutation_type: Option<String>,
    subscription_type: Option<String>,
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaBuilder {
    /// Creates a builder with the built-in scalars and directives.
    #[must_use]
    pub fn new() -> Self {
        let mut types = FxHashMap::default();
        for name in ["Int", "Float", "String", "Boolean", "ID"] {
            types.insert(
                name.to_string(),
                GraphType::Scalar(ScalarDef {
                    name: name.to_string(),
                    description: Some(format!("Built-in {name} scalar")),
                }),
            );
        }

        let mut directives = FxHashMap::default();
        for name in ["skip", "include"] {
            directives.insert(
                name.to_string(),
                DirectiveDef::new(name).with_argument(InputValueDef::new(
                    "if",
                    TypeExpr::named("Boolean").non_null(),
                )),
            );
        }
        directives.insert(
            "deprecated".to_string(),
            DirectiveDef::new("deprecated")
                .with_argument(InputValueDef::new("reason", TypeExpr::named("String"))),
        );

        Self {
            types,
            directives,
            query_type: None,
            mutation_type: None,
            subscription_type: None,
        }
    }

    /// Names the query root type.
    #[must_use]
    pub fn query_type(mut self, name: impl Into<String>) -> Self {
        self.query_type = Some(name.into());
        self
    }

    /// Names the mutation root type.
    #[must_use]
    pub fn mutation_type(mut self, name: impl Into<String>) -> Self {
        self.mutation_type = Some(name.into());
        self
    }

    /// Names the subscription root type.
    #[must_use]
    pub fn subscription_type(mut self, name: impl Into<String>) -> Self {
        self.subscription_type = Some(name.into());
        self
    }

    /// Registers an object type.
    #[must_use]
    pub fn object(mut self, def: ObjectDef) -> Self {
        self.types.insert(def.name.clone(), GraphType::Object(def));
        self
    }

    /// Registers an interface type.
    #[must_use]
    pub fn interface(mut self, def: InterfaceDef) -> Self {
        self.types
            .insert(def.name.clone(), GraphType::Interface(def));
        self
    }

    /// Registers a union type.
    #[must_use]
    pub fn union(mut self, def: crate::types::UnionDef) -> Self {
        self.types.insert(def.name.clone(), GraphType::Union(def));
        self
    }

    /// Registers an enum type.
    #[must_use]
    pub fn enumeration(mut self, def: EnumDef) -> Self {
        self.types.insert(def.name.clone(), GraphType::Enum(def));
        self
    }

    /// Registers a scalar type.
    #[must_use]
    pub fn scalar(mut self, def: ScalarDef) -> Self {
        self.types.insert(def.name.clone(), GraphType::Scalar(def));
        self
    }

    /// Registers an input object type.
    #[must_use]
    pub fn input_object(mut self, def: InputObjectDef) -> Self {
        self.types
            .insert(def.name.clone(), GraphType::InputObject(def));
        self
    }

    /// Registers a custom directive.
    #[must_use]
    pub fn directive(mut self, def: DirectiveDef) -> Self {
        self.directives.insert(def.name.clone(), def);
        self
    }

    /// Finalizes the schema, indexing abstract-type expansions.
    #[must_use]
    pub fn build(self) -> Schema {
        let mut possible: FxHashMap<String, Vec<String>> = FxHashMap::default();

        // Objects list in schema declaration order; sort by name for a
        // stable expansion order independent of hash iteration.
        let mut objects: Vec<&ObjectDef> = self
            .types
            .values()
            .filter_map(|t| match t {
                GraphType::Object(d) => Some(d),
                _ => None,
            })
            .collect();
        objects.sort_by(|a, b| a.name.cmp(&b.name));

        for object in &objects {
            for iface in &object.implements {
                possible
                    .entry(iface.clone())
                    .or_default()
                    .push(object.name.clone());
            }
        }
        for ty in self.types.values() {
            if let GraphType::Union(u) = ty {
                possible.insert(u.name.clone(), u.members.clone());
            }
        }

        Schema {
            types: self.types,
            directives: self.directives,
            query_type: self.query_type,
            mutation_type: self.mutation_type,
            subscription_type: self.subscription_type,
            possible,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldDef, UnionDef};
    use indexmap::IndexMap;

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
                fields: {
                    let mut fields = IndexMap::new();
                    fields.insert(
                        "name".to_string(),
                        FieldDef::new("name", TypeExpr::named("String")),
                    );
                    fields
                },
            })
            .object(object(
                "Dog",
                &["Animal"],
                vec![FieldDef::new("name", TypeExpr::named("String"))],
            ))
            .object(object(
                "Cat",
                &["Animal"],
                vec![FieldDef::new("name", TypeExpr::named("String"))],
            ))
            .union(UnionDef {
                name: "Pet".to_string(),
                description: None,
                members: vec!["Dog".to_string(), "Cat".to_string()],
            })
            .object(object(
                "Query",
                &[],
                vec![FieldDef::new("animal", TypeExpr::named("Animal"))],
            ))
            .build()
    }

    #[test]
    fn test_builtin_scalars() {
        let schema = SchemaBuilder::new().build();
        assert!(schema.find_graph_type("Int").is_some());
        assert!(schema.find_graph_type("ID").is_some());
        assert!(schema.find_directive("skip").is_some());
        assert!(schema.find_directive("include").is_some());
    }

    #[test]
    fn test_possible_types_interface() {
        let schema = pet_schema();
        assert_eq!(schema.possible_types("Animal"), vec!["Cat", "Dog"]);
        assert_eq!(schema.possible_types("Dog"), vec!["Dog"]);
    }

    #[test]
    fn test_possible_types_union() {
        let schema = pet_schema();
        assert_eq!(schema.possible_types("Pet"), vec!["Dog", "Cat"]);
    }

    #[test]
    fn test_types_overlap() {
        let schema = pet_schema();
        assert!(schema.types_overlap("Dog", "Animal"));
        assert!(schema.types_overlap("Animal", "Pet"));
        assert!(!schema.types_overlap("Dog", "Cat"));
    }

    #[test]
    fn test_root_type() {
        let schema = pet_schema();
        assert_eq!(schema.root_type(OperationKind::Query), Some("Query"));
        assert_eq!(schema.root_type(OperationKind::Mutation), None);
    }
}
