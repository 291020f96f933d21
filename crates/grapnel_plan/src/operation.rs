//! The executable operation data model.
//!
//! Everything here is read-only output for downstream resolver
//! execution; the generator builds it, nothing mutates it afterwards.

use grapnel_core::{SourceLocation, SourcePath};
use grapnel_schema::{OperationKind, TypeExpr};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;

/// Request variables, as supplied alongside the query text.
#[derive(Debug, Clone, Default)]
pub struct Variables {
    values: FxHashMap<String, serde_json::Value>,
}

impl Variables {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a variable map from a JSON object; any other JSON shape
    /// yields an empty map.
    #[must_use]
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(map) => Self {
                values: map.into_iter().collect(),
            },
            _ => Self::default(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.values.insert(name.into(), value);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.values.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

impl FromIterator<(String, serde_json::Value)> for Variables {
    fn from_iter<T: IntoIterator<Item = (String, serde_json::Value)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// A resolved argument value on a field context.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentValue {
    /// Fully resolved at plan time.
    Literal(serde_json::Value),
    /// A variable reference left for execution-time binding because the
    /// request supplied no value for it.
    Deferred { variable: String },
}

/// The children of a field, grouped by concrete type.
///
/// A field returning a concrete type has exactly one group; an abstract
/// return type has one group per schema-known concrete type.
#[derive(Debug, Clone)]
pub struct TypedSelection {
    pub type_name: String,
    pub fields: Vec<FieldContext>,
}

/// One planned field: everything a resolver needs, immutable.
#[derive(Debug, Clone)]
pub struct FieldContext {
    /// Schema field name.
    pub name: String,
    /// Key the field contributes to the response object.
    pub response_key: String,
    /// The concrete type the field is selected from.
    pub source_type: String,
    /// The field's declared return type.
    pub field_type: TypeExpr,
    /// Native binding of the source type, when the schema declares one.
    pub concrete_binding: Option<String>,
    /// Argument values in schema declaration order.
    pub arguments: IndexMap<String, ArgumentValue>,
    /// Child selections, one group per concrete type.
    pub children: Vec<TypedSelection>,
    pub location: SourceLocation,
    pub path: SourcePath,
}

impl FieldContext {
    /// The child group for a concrete type name, if planned.
    #[must_use]
    pub fn selection_for(&self, type_name: &str) -> Option<&TypedSelection> {
        self.children.iter().find(|s| s.type_name == type_name)
    }
}

/// A fully planned operation, ready for execution.
#[derive(Debug, Clone)]
pub struct ExecutableOperation {
    pub kind: OperationKind,
    /// `None` for the anonymous shorthand operation.
    pub name: Option<String>,
    /// The schema root type the operation selects from.
    pub root_type: String,
    /// Root field contexts in declaration order.
    pub selections: Vec<FieldContext>,
}

impl ExecutableOperation {
    /// Root field context by response key.
    #[must_use]
    pub fn selection(&self, response_key: &str) -> Option<&FieldContext> {
        self.selections.iter().find(|f| f.response_key == response_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variables_from_json() {
        let vars = Variables::from_json(serde_json::json!({"id": 7, "flag": true}));
        assert_eq!(vars.get("id"), Some(&serde_json::json!(7)));
        assert!(vars.contains("flag"));
        assert!(vars.get("missing").is_none());
    }

    #[test]
    fn test_variables_from_non_object() {
        let vars = Variables::from_json(serde_json::json!([1, 2]));
        assert!(!vars.contains("0"));
    }
}
