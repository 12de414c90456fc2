//! Error types for template execution.

use strsim::levenshtein;
use thiserror::Error;

use crate::parser::Position;

/// An execution failure, located at the action that raised it.
#[derive(Debug, Error)]
#[error("executing at {line}:{column}: {kind}")]
pub struct ExecError {
    pub line: usize,
    pub column: usize,
    pub kind: ExecErrorKind,
}

impl ExecError {
    pub fn at(position: Position, kind: ExecErrorKind) -> Self {
        Self {
            line: position.line,
            column: position.column,
            kind,
        }
    }
}

/// What went wrong while executing an action.
#[derive(Debug, Error, PartialEq)]
pub enum ExecErrorKind {
    /// Field access on a value that has no fields.
    #[error("can't evaluate field {field} in type {type_name}")]
    CannotEvaluateField {
        field: String,
        type_name: &'static str,
    },

    /// Arguments or piped input given to something that is not a function.
    #[error("can't give argument to non-function {operand}")]
    NotAFunction { operand: String },

    /// `range` over a value that cannot be iterated.
    #[error("range can't iterate over {type_name}")]
    CannotIterate { type_name: &'static str },

    /// Wrong number of arguments passed to a function.
    #[error("wrong number of args for {function}: want {expected}, got {got}")]
    ArgumentCount {
        function: String,
        expected: String,
        got: usize,
    },

    /// A function argument of the wrong kind.
    #[error("error calling {function}: {message}")]
    InvalidArgument {
        function: &'static str,
        message: String,
    },

    /// Comparison between values of different types.
    #[error("incompatible types for comparison: {left} and {right}")]
    IncompatibleTypes {
        left: &'static str,
        right: &'static str,
    },

    /// Comparison involving a type that has no ordering or equality.
    #[error("invalid type for comparison: {type_name}")]
    InvalidComparison { type_name: &'static str },

    /// `printf` verb that is not supported.
    #[error("printf: unsupported verb %{verb}")]
    UnsupportedVerb { verb: char },

    /// `printf` ran out of arguments.
    #[error("printf: missing argument for %{verb}")]
    MissingFormatArgument { verb: char },

    /// `{{template}}` naming a block that was never defined.
    #[error("no such template \"{name}\"")]
    NoSuchTemplate { name: String },

    /// A function name with no registry entry.
    #[error("function \"{name}\" not defined")]
    UnknownFunction { name: String },

    /// A `$variable` with no binding in scope.
    #[error("undefined variable \"${name}\"")]
    UndefinedVariable { name: String },

    /// Nested `{{template}}` calls went deeper than the limit.
    #[error("exceeded maximum template depth ({max})")]
    MaxDepthExceeded { max: usize },
}

/// Compute typo suggestions using Levenshtein distance.
///
/// - distance <= 1 for names <= 3 chars
/// - distance <= 2 for longer names
/// - Limit to 3 suggestions, sorted by distance
pub fn compute_suggestions(name: &str, available: &[String]) -> Vec<String> {
    let max_distance = if name.len() <= 3 { 1 } else { 2 };
    let mut suggestions: Vec<(usize, String)> = available
        .iter()
        .filter_map(|candidate| {
            let dist = levenshtein(name, candidate);
            if dist <= max_distance && dist > 0 {
                Some((dist, candidate.clone()))
            } else {
                None
            }
        })
        .collect();

    suggestions.sort_by_key(|(dist, _)| *dist);
    suggestions.into_iter().take(3).map(|(_, s)| s).collect()
}
