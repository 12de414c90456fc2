//! Template parser.
//!
//! Parses Go-template style text (`{{.name}}`, `{{if}}`, `{{range}}`, ...)
//! into an AST that the interpreter executes. Parsing is purely syntactic:
//! function names are checked later against a function registry.

pub mod ast;
pub mod error;
mod lexer;
mod template;

pub use ast::*;
pub use error::ParseError;
pub use template::parse_template;
