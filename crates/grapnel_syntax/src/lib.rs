//! Syntax layer for grapnel.
//!
//! This crate provides:
//! - `token`: Token kinds and token structures
//! - `lexer`: Tokenization
//! - `tree`: Index-arena syntax tree
//! - `parser`: Recursive descent parser

pub mod lexer;
pub mod parser;
pub mod token;
pub mod tree;

pub use lexer::{tokenize, Lexer};
pub use parser::{parse, SyntaxError};
pub use token::{Token, TokenKind};
pub use tree::{NodeId, SyntaxKind, SyntaxNode, SyntaxTree};
