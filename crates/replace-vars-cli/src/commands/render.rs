//! Implementation of the render pipeline command.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use replace_vars::{Engine, ErrorKind, Escape, Job, LoadOptions, Paths, WriteMode};
use serde::Serialize;
use tracing::warn;

use crate::output::{print_error, print_error_json};

/// Printed to stdout when positional arguments are missing.
pub const USAGE: &str = "Usage: replace-vars <variables_file> <template_file> <output_file>";

/// Arguments for rendering.
#[derive(Debug, clap::Args)]
pub struct RenderArgs {
    /// File of KEY=VALUE lines
    pub variables_file: PathBuf,

    /// Template to render
    pub template_file: PathBuf,

    /// Where to write the result
    pub output_file: PathBuf,

    /// Arguments past the third are accepted and ignored
    #[arg(hide = true)]
    pub extra: Vec<OsString>,

    /// Skip variables lines starting with '#'
    #[arg(long)]
    pub comments: bool,

    /// Insert values verbatim instead of HTML-escaping them
    #[arg(long)]
    pub no_escape: bool,

    /// Write through a temporary file and rename it into place
    #[arg(long)]
    pub atomic: bool,

    /// Report the result as JSON
    #[arg(long)]
    pub json: bool,
}

/// JSON output for a successful run.
#[derive(Debug, Serialize)]
struct RenderJson<'a> {
    status: &'static str,
    template: &'a Path,
    output: PathBuf,
    variables: usize,
    bytes: usize,
}

/// Run the pipeline and return the process exit code.
pub fn run_render(args: RenderArgs) -> i32 {
    if !args.extra.is_empty() {
        warn!(count = args.extra.len(), "ignoring extra arguments");
    }

    let escape = if args.no_escape {
        Escape::None
    } else {
        Escape::Html
    };
    let write_mode = if args.atomic {
        WriteMode::Atomic
    } else {
        WriteMode::Direct
    };
    let job = Job::builder()
        .load(LoadOptions::builder().comments(args.comments).build())
        .engine(Engine::builder().escape(escape).build())
        .write_mode(write_mode)
        .build();

    let paths = Paths {
        variables: args.variables_file,
        template: args.template_file,
        output: args.output_file,
    };

    match job.run(&paths) {
        Ok(summary) => {
            if args.json {
                let json = RenderJson {
                    status: "ok",
                    template: &paths.template,
                    output: summary.output,
                    variables: summary.variables,
                    bytes: summary.bytes,
                };
                match serde_json::to_string_pretty(&json) {
                    Ok(text) => println!("{text}"),
                    Err(e) => warn!("cannot serialize summary: {e}"),
                }
            }
            exitcode::OK
        }
        Err(e) => {
            if args.json {
                print_error_json(&e);
            } else {
                print_error(&e);
            }
            exit_code(e.kind())
        }
    }
}

/// Map an error kind to a sysexits-style exit code.
pub fn exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::UsageError => exitcode::USAGE,
        ErrorKind::InputUnavailable => exitcode::NOINPUT,
        ErrorKind::InputCorrupt => exitcode::IOERR,
        ErrorKind::TemplateInvalid | ErrorKind::TemplateExecError => exitcode::DATAERR,
        ErrorKind::OutputUnavailable => exitcode::CANTCREAT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_error_kind_is_nonzero() {
        for kind in [
            ErrorKind::UsageError,
            ErrorKind::InputUnavailable,
            ErrorKind::InputCorrupt,
            ErrorKind::TemplateInvalid,
            ErrorKind::TemplateExecError,
            ErrorKind::OutputUnavailable,
        ] {
            assert_ne!(exit_code(kind), exitcode::OK, "{kind:?}");
        }
    }
}
