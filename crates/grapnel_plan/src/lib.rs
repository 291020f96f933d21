//! Executable operation generation for grapnel.
//!
//! Turns a validated document plus request variables into a typed,
//! read-only operation plan:
//! - `input`: input value resolvers (literal and variable coercion)
//! - `operation`: the executable operation data model
//! - `generator`: the async plan generator

pub mod generator;
pub mod input;
pub mod operation;

pub use generator::{generate, PlanError};
pub use input::{InputResolver, ResolverSet};
pub use operation::{
    ArgumentValue, ExecutableOperation, FieldContext, TypedSelection, Variables,
};
