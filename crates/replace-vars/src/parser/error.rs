//! Parse error types for templates.

use thiserror::Error;

/// An error that occurred while parsing a template.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A malformed action or literal.
    #[error("syntax error at {line}:{column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    /// A block action was never closed with `{{end}}`.
    #[error("unexpected end of input: {{{{{construct}}}}} at {line}:{column} is never closed")]
    UnclosedBlock {
        line: usize,
        column: usize,
        construct: String,
    },

    /// `{{else}}` or `{{end}}` with no open block, or `{{define}}` below top level.
    #[error("unexpected {{{{{keyword}}}}} at {line}:{column}")]
    UnexpectedKeyword {
        line: usize,
        column: usize,
        keyword: String,
    },

    /// A `$variable` used outside the scope of its declaration.
    #[error("undefined variable \"${name}\" at {line}:{column}")]
    UndefinedVariable {
        line: usize,
        column: usize,
        name: String,
    },

    /// A function name that is not in the registry.
    #[error("function \"{name}\" not defined at {line}:{column}{}", format_suggestions(.suggestions))]
    UndefinedFunction {
        line: usize,
        column: usize,
        name: String,
        suggestions: Vec<String>,
    },

    /// Two `{{define}}` blocks with the same name.
    #[error("template \"{name}\" defined twice, again at {line}:{column}")]
    DuplicateDefinition {
        line: usize,
        column: usize,
        name: String,
    },
}

impl ParseError {
    /// The 1-based (line, column) the error points at.
    pub fn position(&self) -> (usize, usize) {
        match self {
            ParseError::Syntax { line, column, .. }
            | ParseError::UnclosedBlock { line, column, .. }
            | ParseError::UnexpectedKeyword { line, column, .. }
            | ParseError::UndefinedVariable { line, column, .. }
            | ParseError::UndefinedFunction { line, column, .. }
            | ParseError::DuplicateDefinition { line, column, .. } => (*line, *column),
        }
    }
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!("; did you mean: {}?", suggestions.join(", "))
    }
}
