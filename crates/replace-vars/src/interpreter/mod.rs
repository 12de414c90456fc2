//! Template interpreter.
//!
//! Executes a parsed [`Template`](crate::parser::Template) against a
//! [`VariableMap`](crate::VariableMap). Substituted values are HTML-escaped
//! unless the engine is configured otherwise or the value was produced by
//! `raw` or `html`.

mod context;
mod engine;
mod error;
mod escape;
mod evaluator;
mod functions;

pub use context::EvalContext;
pub use engine::{DEFAULT_MAX_DEPTH, Engine, RenderError};
pub use error::{ExecError, ExecErrorKind, compute_suggestions};
pub use escape::{Escape, escape_html, escape_js, query_escape};
pub use functions::{Arity, Function, FunctionFn, FunctionRegistry};
