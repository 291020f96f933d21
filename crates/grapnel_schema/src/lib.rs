//! Schema lookup service for grapnel.
//!
//! The schema is an external collaborator of the query-processing
//! pipeline: a read-only registry of graph types consumed by document
//! construction, validation, and plan generation. It is immutable after
//! build and safe to share across concurrent requests.
//!
//! - `expr`: Type expressions (list/non-null wrappers)
//! - `types`: Graph type definitions
//! - `schema`: The registry and its builder

pub mod expr;
pub mod schema;
pub mod types;

pub use expr::TypeExpr;
pub use schema::{OperationKind, Schema, SchemaBuilder};
pub use types::{
    DirectiveDef, EnumDef, FieldDef, GraphType, GraphTypeKind, InputObjectDef, InputValueDef,
    InterfaceDef, ObjectDef, ScalarDef, UnionDef,
};
