//! Core types for grapnel.
//!
//! This crate provides the foundational types used throughout the query
//! processing pipeline:
//! - `span`: Byte-offset source spans
//! - `source`: Source text access and (line, column) location tracking
//! - `path`: Response paths for error reporting
//! - `messages`: Validation/error message accumulation

pub mod messages;
pub mod path;
pub mod source;
pub mod span;

pub use messages::{Message, MessageBag, Severity};
pub use path::{PathSegment, SourcePath};
pub use source::{SourceLocation, SourceText};
pub use span::Span;
