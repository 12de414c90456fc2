//! Output formatting for the CLI.
//!
//! Diagnostics go to stdout; logs go to stderr.

mod diagnostic;

pub use diagnostic::TemplateDiagnostic;

use owo_colors::{OwoColorize, Stream};
use replace_vars::Error;
use serde_json::json;

/// Print a failed run as a one-line message, plus a source snippet for
/// template syntax errors.
pub fn print_error(err: &Error) {
    println!(
        "{} {}",
        "error:".if_supports_color(Stream::Stdout, |t| t.red()),
        err
    );
    if let Error::TemplateParse { path, text, source } = err {
        let report = miette::Report::new(TemplateDiagnostic::from_parse_error(path, text, source));
        println!("{report:?}");
    }
}

/// Print a failed run as a JSON object.
pub fn print_error_json(err: &Error) {
    let output = json!({
        "error": {
            "kind": err.kind(),
            "message": err.to_string(),
        }
    });
    println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
}
