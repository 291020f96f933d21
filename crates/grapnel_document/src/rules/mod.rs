//! Rule tables for document construction and validation.

pub(crate) mod build;
pub(crate) mod validate;
