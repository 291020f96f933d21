//! Document construction and validation for grapnel.
//!
//! This crate turns a parsed syntax tree into a validated document:
//! - `value`: Supplied values (argument/default literals)
//! - `part`: Document parts (operations, fields, arguments, fragments)
//! - `document`: The document root container
//! - `builder`: The construction rule engine over the syntax tree
//! - `validator`: The post-construction GraphQL rule engine

pub mod builder;
pub mod document;
pub mod part;
pub mod validator;
pub mod value;

mod rules;

pub use builder::{BuildError, BuildOptions, DocumentBuilder};
pub use document::Document;
pub use part::{Part, PartArena, PartId, PartKind};
pub use validator::validate;
pub use value::SuppliedValue;
