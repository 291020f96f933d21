//! Input value resolvers.
//!
//! A resolver is composed from a type expression: a core resolver for
//! the base type (scalar parser, enum mapper, or input-object field
//! table) applied under the expression's list/non-null wrappers. Input
//! object cores are memoized per type name and their field tables are
//! filled through a `OnceLock` after the core is registered, so
//! self-referential input types build in one pass instead of recursing
//! forever.

use crate::generator::PlanError;
use crate::operation::Variables;
use grapnel_document::SuppliedValue;
use grapnel_schema::{GraphType, Schema, TypeExpr};
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::sync::{Arc, OnceLock};

/// Resolves supplied values of one declared input type to plain JSON.
#[derive(Clone)]
pub struct InputResolver {
    shape: TypeExpr,
    core: Arc<CoreResolver>,
}

impl std::fmt::Debug for InputResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InputResolver({})", self.shape)
    }
}

struct ObjectField {
    name: String,
    resolver: InputResolver,
    required: bool,
    default: Option<Value>,
}

enum CoreResolver {
    Scalar(String),
    Enum { name: String, values: Vec<String> },
    Object {
        name: String,
        fields: OnceLock<Vec<ObjectField>>,
    },
}

/// Builds and memoizes input resolvers against one schema.
#[derive(Default)]
pub struct ResolverSet {
    memo: FxHashMap<String, Arc<CoreResolver>>,
}

impl ResolverSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A resolver for a declared input type expression.
    pub fn resolver_for(
        &mut self,
        schema: &Schema,
        expr: &TypeExpr,
    ) -> Result<InputResolver, PlanError> {
        let core = self.core_for(schema, expr.base_name())?;
        Ok(InputResolver {
            shape: expr.clone(),
            core,
        })
    }

    fn core_for(&mut self, schema: &Schema, name: &str) -> Result<Arc<CoreResolver>, PlanError> {
        if let Some(core) = self.memo.get(name) {
            return Ok(core.clone());
        }
        match schema.find_graph_type(name) {
            Some(GraphType::Scalar(def)) => {
                let core = Arc::new(CoreResolver::Scalar(def.name.clone()));
                self.memo.insert(name.to_string(), core.clone());
                Ok(core)
            }
            Some(GraphType::Enum(def)) => {
                let core = Arc::new(CoreResolver::Enum {
                    name: def.name.clone(),
                    values: def.values.clone(),
                });
                self.memo.insert(name.to_string(), core.clone());
                Ok(core)
            }
            Some(GraphType::InputObject(def)) => {
                let core = Arc::new(CoreResolver::Object {
                    name: def.name.clone(),
                    fields: OnceLock::new(),
                });
                // Registered before the field table is built; a field of
                // this same type hits the memo instead of recursing.
                self.memo.insert(name.to_string(), core.clone());

                let mut fields = Vec::with_capacity(def.fields.len());
                for field in def.fields.values() {
                    fields.push(ObjectField {
                        name: field.name.clone(),
                        resolver: self.resolver_for(schema, &field.ty)?,
                        required: field.ty.is_required() && field.default_value.is_none(),
                        default: field.default_value.clone(),
                    });
                }
                if let CoreResolver::Object { fields: slot, .. } = core.as_ref() {
                    let _ = slot.set(fields);
                }
                Ok(core)
            }
            Some(other) => Err(PlanError::InvalidValue {
                ty: name.to_string(),
                reason: format!("{} type cannot be used as an input", other.kind().as_str()),
            }),
            None => Err(PlanError::UnknownType(name.to_string())),
        }
    }
}

impl InputResolver {
    /// Resolves a supplied value, substituting variables from the
    /// request. A single value wraps into a one-element list at each
    /// list level.
    pub fn resolve(
        &self,
        value: &SuppliedValue,
        variables: &Variables,
    ) -> Result<Value, PlanError> {
        self.resolve_literal(&self.shape, value, variables)
    }

    /// Resolves a raw JSON payload (a variable value) against the
    /// declared type.
    pub fn resolve_json(&self, payload: Value) -> Result<Value, PlanError> {
        self.resolve_json_expr(&self.shape, payload)
    }

    fn resolve_literal(
        &self,
        expr: &TypeExpr,
        value: &SuppliedValue,
        variables: &Variables,
    ) -> Result<Value, PlanError> {
        if let SuppliedValue::Variable(name, _) = value {
            let payload = variables.get(name).cloned().unwrap_or(Value::Null);
            return self.resolve_json_expr(expr, payload);
        }
        match expr {
            TypeExpr::NonNull(inner) => {
                if matches!(value, SuppliedValue::Null(_)) {
                    Err(invalid(expr, "null supplied for a non-null type"))
                } else {
                    self.resolve_literal(inner, value, variables)
                }
            }
            TypeExpr::List(inner) => match value {
                SuppliedValue::List(items, _) => {
                    let mut out = Vec::with_capacity(items.len());
                    for item in items {
                        out.push(self.resolve_literal(inner, item, variables)?);
                    }
                    Ok(Value::Array(out))
                }
                SuppliedValue::Null(_) => Ok(Value::Null),
                single => Ok(Value::Array(vec![self.resolve_literal(
                    inner, single, variables,
                )?])),
            },
            TypeExpr::Named(_) => {
                if matches!(value, SuppliedValue::Null(_)) {
                    return Ok(Value::Null);
                }
                self.core.resolve_literal_core(value, variables)
            }
        }
    }

    fn resolve_json_expr(&self, expr: &TypeExpr, payload: Value) -> Result<Value, PlanError> {
        match expr {
            TypeExpr::NonNull(inner) => {
                if payload.is_null() {
                    Err(invalid(expr, "null supplied for a non-null type"))
                } else {
                    self.resolve_json_expr(inner, payload)
                }
            }
            TypeExpr::List(inner) => match payload {
                Value::Array(items) => {
                    let mut out = Vec::with_capacity(items.len());
                    for item in items {
                        out.push(self.resolve_json_expr(inner, item)?);
                    }
                    Ok(Value::Array(out))
                }
                Value::Null => Ok(Value::Null),
                single => Ok(Value::Array(vec![self.resolve_json_expr(inner, single)?])),
            },
            TypeExpr::Named(_) => {
                if payload.is_null() {
                    return Ok(Value::Null);
                }
                self.core.resolve_json_core(payload)
            }
        }
    }
}

impl CoreResolver {
    fn resolve_literal_core(
        &self,
        value: &SuppliedValue,
        variables: &Variables,
    ) -> Result<Value, PlanError> {
        match self {
            Self::Scalar(name) => scalar_from_literal(name, value, variables),
            Self::Enum { name, values } => match value {
                SuppliedValue::Enum(v, _) if values.contains(v) => Ok(Value::String(v.clone())),
                other => Err(invalid(
                    name,
                    format!("expected an enum value, got {}", other.kind_name()),
                )),
            },
            Self::Object { name, fields } => {
                let SuppliedValue::Object(supplied, _) = value else {
                    return Err(invalid(
                        name,
                        format!("expected an input object, got {}", value.kind_name()),
                    ));
                };
                let Some(fields) = fields.get() else {
                    return Err(invalid(name, "resolver not initialized"));
                };

                let mut out = serde_json::Map::new();
                for field in fields {
                    let given = supplied.iter().find(|(n, _)| n == &field.name);
                    match given {
                        Some((_, v)) => {
                            out.insert(field.name.clone(), field.resolver.resolve(v, variables)?);
                        }
                        None => match &field.default {
                            Some(default) => {
                                out.insert(field.name.clone(), default.clone());
                            }
                            None if field.required => {
                                return Err(invalid(
                                    name,
                                    format!("missing required field `{}`", field.name),
                                ));
                            }
                            None => {}
                        },
                    }
                }
                Ok(Value::Object(out))
            }
        }
    }

    fn resolve_json_core(&self, payload: Value) -> Result<Value, PlanError> {
        match self {
            Self::Scalar(name) => scalar_from_json(name, payload),
            Self::Enum { name, values } => match payload {
                Value::String(s) if values.contains(&s) => Ok(Value::String(s)),
                other => Err(invalid(
                    name,
                    format!("`{other}` is not a defined enum value"),
                )),
            },
            Self::Object { name, fields } => {
                let Value::Object(supplied) = payload else {
                    return Err(invalid(name, "expected an object"));
                };
                let Some(fields) = fields.get() else {
                    return Err(invalid(name, "resolver not initialized"));
                };

                let mut out = serde_json::Map::new();
                for field in fields {
                    match supplied.get(&field.name) {
                        Some(v) => {
                            out.insert(field.name.clone(), field.resolver.resolve_json(v.clone())?);
                        }
                        None => match &field.default {
                            Some(default) => {
                                out.insert(field.name.clone(), default.clone());
                            }
                            None if field.required => {
                                return Err(invalid(
                                    name,
                                    format!("missing required field `{}`", field.name),
                                ));
                            }
                            None => {}
                        },
                    }
                }
                Ok(Value::Object(out))
            }
        }
    }
}

fn scalar_from_literal(
    name: &str,
    value: &SuppliedValue,
    variables: &Variables,
) -> Result<Value, PlanError> {
    match (name, value) {
        ("Int", SuppliedValue::Int(i, _)) => Ok(Value::from(*i)),
        ("Float", SuppliedValue::Int(i, _)) => Ok(Value::from(*i as f64)),
        ("Float", SuppliedValue::Float(f, _)) => Ok(Value::from(*f)),
        ("String", SuppliedValue::Str(s, _)) => Ok(Value::String(s.clone())),
        ("Boolean", SuppliedValue::Bool(b, _)) => Ok(Value::Bool(*b)),
        ("ID", SuppliedValue::Str(s, _)) => Ok(Value::String(s.clone())),
        ("ID", SuppliedValue::Int(i, _)) => Ok(Value::String(i.to_string())),
        ("Int" | "Float" | "String" | "Boolean" | "ID", other) => Err(invalid(
            name,
            format!("expected a `{name}` value, got {}", other.kind_name()),
        )),
        // Custom scalars take any literal shape as-is.
        (_, other) => Ok(literal_to_json(other, variables)),
    }
}

fn scalar_from_json(name: &str, payload: Value) -> Result<Value, PlanError> {
    let ok = match (name, &payload) {
        ("Int", Value::Number(n)) => n.is_i64(),
        ("Float", Value::Number(_)) => true,
        ("String", Value::String(_)) => true,
        ("Boolean", Value::Bool(_)) => true,
        ("ID", Value::String(_)) => true,
        ("ID", Value::Number(n)) => {
            return match n.as_i64() {
                Some(i) => Ok(Value::String(i.to_string())),
                None => Err(invalid(name, "expected an integer or string id")),
            };
        }
        ("Int" | "Float" | "String" | "Boolean", _) => false,
        // Custom scalars pass through untouched.
        _ => true,
    };
    if ok {
        Ok(payload)
    } else {
        Err(invalid(name, format!("incompatible variable value `{payload}`")))
    }
}

/// Structural JSON conversion for custom scalar literals.
fn literal_to_json(value: &SuppliedValue, variables: &Variables) -> Value {
    match value {
        SuppliedValue::Int(i, _) => Value::from(*i),
        SuppliedValue::Float(f, _) => Value::from(*f),
        SuppliedValue::Str(s, _) => Value::String(s.clone()),
        SuppliedValue::Bool(b, _) => Value::Bool(*b),
        SuppliedValue::Null(_) => Value::Null,
        SuppliedValue::Enum(v, _) => Value::String(v.clone()),
        SuppliedValue::Variable(name, _) => {
            variables.get(name).cloned().unwrap_or(Value::Null)
        }
        SuppliedValue::List(items, _) => {
            Value::Array(items.iter().map(|i| literal_to_json(i, variables)).collect())
        }
        SuppliedValue::Object(fields, _) => Value::Object(
            fields
                .iter()
                .map(|(n, v)| (n.clone(), literal_to_json(v, variables)))
                .collect(),
        ),
    }
}

fn invalid(ty: impl std::fmt::Display, reason: impl Into<String>) -> PlanError {
    PlanError::InvalidValue {
        ty: ty.to_string(),
        reason: reason.into(),
    }
}
