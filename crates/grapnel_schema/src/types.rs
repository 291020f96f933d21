//! Graph type definitions.

use crate::expr::TypeExpr;
use indexmap::IndexMap;

/// The kind of a graph type, for messages and kind checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphTypeKind {
    Scalar,
    Enum,
    Object,
    Interface,
    Union,
    InputObject,
}

impl GraphTypeKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Enum => "enum",
            Self::Object => "object",
            Self::Interface => "interface",
            Self::Union => "union",
            Self::InputObject => "input object",
        }
    }
}

/// A scalar type.
#[derive(Debug, Clone)]
pub struct ScalarDef {
    pub name: String,
    pub description: Option<String>,
}

/// An enum type and its values.
#[derive(Debug, Clone)]
pub struct EnumDef {
    pub name: String,
    pub description: Option<String>,
    pub values: Vec<String>,
}

impl EnumDef {
    #[must_use]
    pub fn has_value(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }
}

/// An object type.
#[derive(Debug, Clone)]
pub struct ObjectDef {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, FieldDef>,
    pub implements: Vec<String>,
    /// Native type this object is strictly bound to, when not
    /// virtual/controller-backed. Plans restrict field contexts to it.
    pub concrete: Option<String>,
}

/// An interface type.
#[derive(Debug, Clone)]
pub struct InterfaceDef {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, FieldDef>,
}

/// A union type.
#[derive(Debug, Clone)]
pub struct UnionDef {
    pub name: String,
    pub description: Option<String>,
    pub members: Vec<String>,
}

/// An input object type.
#[derive(Debug, Clone)]
pub struct InputObjectDef {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, InputValueDef>,
}

impl InputObjectDef {
    /// Fields that must be supplied: non-null without a default.
    pub fn required_fields(&self) -> impl Iterator<Item = &InputValueDef> {
        self.fields
            .values()
            .filter(|f| f.ty.is_required() && f.default_value.is_none())
    }
}

/// A field definition on an object or interface.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub description: Option<String>,
    pub ty: TypeExpr,
    pub arguments: IndexMap<String, InputValueDef>,
}

impl FieldDef {
    /// Creates a field with no arguments.
    pub fn new(name: impl Into<String>, ty: TypeExpr) -> Self {
        Self {
            name: name.into(),
            description: None,
            ty,
            arguments: IndexMap::new(),
        }
    }

    /// Adds an argument.
    #[must_use]
    pub fn with_argument(mut self, arg: InputValueDef) -> Self {
        self.arguments.insert(arg.name.clone(), arg);
        self
    }

    /// Arguments that must be supplied: non-null without a default.
    pub fn required_arguments(&self) -> impl Iterator<Item = &InputValueDef> {
        self.arguments
            .values()
            .filter(|a| a.ty.is_required() && a.default_value.is_none())
    }
}

/// An input value: a field argument or an input-object field.
#[derive(Debug, Clone)]
pub struct InputValueDef {
    pub name: String,
    pub description: Option<String>,
    pub ty: TypeExpr,
    pub default_value: Option<serde_json::Value>,
}

impl InputValueDef {
    pub fn new(name: impl Into<String>, ty: TypeExpr) -> Self {
        Self {
            name: name.into(),
            description: None,
            ty,
            default_value: None,
        }
    }

    #[must_use]
    pub fn with_default(mut self, value: serde_json::Value) -> Self {
        self.default_value = Some(value);
        self
    }
}

/// A directive definition.
#[derive(Debug, Clone)]
pub struct DirectiveDef {
    pub name: String,
    pub arguments: IndexMap<String, InputValueDef>,
}

impl DirectiveDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn with_argument(mut self, arg: InputValueDef) -> Self {
        self.arguments.insert(arg.name.clone(), arg);
        self
    }
}

/// A graph type registered in the schema.
#[derive(Debug, Clone)]
pub enum GraphType {
    Scalar(ScalarDef),
    Enum(EnumDef),
    Object(ObjectDef),
    Interface(InterfaceDef),
    Union(UnionDef),
    InputObject(InputObjectDef),
}

impl GraphType {
    /// The type's name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Scalar(d) => &d.name,
            Self::Enum(d) => &d.name,
            Self::Object(d) => &d.name,
            Self::Interface(d) => &d.name,
            Self::Union(d) => &d.name,
            Self::InputObject(d) => &d.name,
        }
    }

    /// The type's kind.
    #[must_use]
    pub fn kind(&self) -> GraphTypeKind {
        match self {
            Self::Scalar(_) => GraphTypeKind::Scalar,
            Self::Enum(_) => GraphTypeKind::Enum,
            Self::Object(_) => GraphTypeKind::Object,
            Self::Interface(_) => GraphTypeKind::Interface,
            Self::Union(_) => GraphTypeKind::Union,
            Self::InputObject(_) => GraphTypeKind::InputObject,
        }
    }

    /// True for object, interface, and union types.
    #[must_use]
    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Object(_) | Self::Interface(_) | Self::Union(_))
    }

    /// True for interface and union types.
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        matches!(self, Self::Interface(_) | Self::Union(_))
    }

    /// True for types usable as variable/argument types.
    #[must_use]
    pub fn is_input(&self) -> bool {
        matches!(self, Self::Scalar(_) | Self::Enum(_) | Self::InputObject(_))
    }

    /// True for scalar and enum types.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Scalar(_) | Self::Enum(_))
    }

    /// Looks up a field on an object or interface type.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        match self {
            Self::Object(d) => d.fields.get(name),
            Self::Interface(d) => d.fields.get(name),
            _ => None,
        }
    }
}
