//! CQL-like filter language: tokenizer, parser and SQL compiler.
//!
//! Parsing is independent of the store; compilation resolves every column
//! against the table's verified column set and binds every literal.

pub mod ast;
pub mod compiler;
pub mod lexer;
pub mod parser;

pub use ast::{ComparisonOp, FilterExpr, Literal};
pub use compiler::{compile_filter, verify_columns};
pub use parser::parse_filter;
