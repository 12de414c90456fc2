//! Miette diagnostic wrapper for template parse errors.
//!
//! Note: This module has an exception for `unused_assignments` because miette
//! derive macros read struct fields in generated code that rustc cannot track.
#![allow(unused_assignments)]

use std::path::Path;

use miette::{Diagnostic, NamedSource, SourceSpan};
use replace_vars::ParseError;
use thiserror::Error;

/// A miette-compatible diagnostic for template parse errors.
///
/// Note: Fields are read by miette derive macros, not directly by code.
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(replace_vars::template))]
pub struct TemplateDiagnostic {
    #[source_code]
    src: NamedSource<String>,

    #[label("error here")]
    span: SourceSpan,

    message: String,

    #[help]
    help: Option<String>,
}

impl TemplateDiagnostic {
    /// Create a diagnostic from a ParseError with source context.
    pub fn from_parse_error(path: &Path, content: &str, err: &ParseError) -> Self {
        let (line, column) = err.position();
        let help = match err {
            ParseError::UnclosedBlock { construct, .. } => {
                Some(format!("close the {{{{{construct}}}}} block with {{{{end}}}}"))
            }
            ParseError::UndefinedFunction { suggestions, .. } if !suggestions.is_empty() => {
                Some(format!("did you mean: {}?", suggestions.join(", ")))
            }
            ParseError::UndefinedVariable { name, .. } => {
                Some(format!("declare it first with {{{{${name} := ...}}}}"))
            }
            _ => None,
        };

        TemplateDiagnostic {
            src: NamedSource::new(path.display().to_string(), content.to_string()),
            span: (byte_offset(content, line, column), 1).into(),
            message: err.to_string(),
            help,
        }
    }
}

/// Convert a 1-based line and character column to a byte offset, clamped to
/// the content length.
fn byte_offset(content: &str, line: usize, column: usize) -> usize {
    let line_start = content
        .split('\n')
        .take(line.saturating_sub(1))
        .map(|l| l.len() + 1)
        .sum::<usize>()
        .min(content.len());
    let within = content[line_start..]
        .char_indices()
        .nth(column.saturating_sub(1))
        .map_or(content.len() - line_start, |(i, _)| i);
    (line_start + within).min(content.len())
}
