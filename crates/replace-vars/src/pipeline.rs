//! The three-stage run: load variables, render the template, write output.
//!
//! The first failing stage aborts the run. Each failure maps onto an
//! [`ErrorKind`] so callers can choose exit codes without matching on every
//! variant.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use bon::Builder;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::interpreter::{Engine, ExecError};
use crate::output::{OutputError, WriteMode, write_output};
use crate::parser::ParseError;
use crate::vars::{LoadError, LoadOptions, load_variables};

/// Failure categories reported to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// Wrong number of command-line arguments.
    UsageError,
    /// A variables or template file cannot be opened.
    InputUnavailable,
    /// An I/O error while reading a file.
    InputCorrupt,
    /// The template failed to parse.
    TemplateInvalid,
    /// The template failed during execution.
    TemplateExecError,
    /// The output file cannot be written.
    OutputUnavailable,
}

/// A failed run, carrying the stage that failed.
#[derive(Debug, Error)]
pub enum Error {
    #[error("error reading variables: {0}")]
    Variables(#[from] LoadError),

    #[error("error reading template file '{path}': {source}")]
    TemplateOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error reading template file '{path}': {source}")]
    TemplateRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error parsing template '{path}': {source}")]
    TemplateParse {
        path: PathBuf,
        /// The template text, for rendering source snippets.
        text: String,
        #[source]
        source: ParseError,
    },

    #[error("error executing template '{path}': {source}")]
    TemplateExec {
        path: PathBuf,
        #[source]
        source: ExecError,
    },

    #[error("error writing output: {0}")]
    Output(#[from] OutputError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Variables(LoadError::Open { .. }) | Error::TemplateOpen { .. } => {
                ErrorKind::InputUnavailable
            }
            Error::Variables(LoadError::Read { .. }) | Error::TemplateRead { .. } => {
                ErrorKind::InputCorrupt
            }
            Error::TemplateParse { .. } => ErrorKind::TemplateInvalid,
            Error::TemplateExec { .. } => ErrorKind::TemplateExecError,
            Error::Output(_) => ErrorKind::OutputUnavailable,
        }
    }
}

/// The three paths a run works on.
#[derive(Debug, Clone)]
pub struct Paths {
    pub variables: PathBuf,
    pub template: PathBuf,
    pub output: PathBuf,
}

/// What a successful run produced.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub output: PathBuf,
    /// Number of entries in the variable map.
    pub variables: usize,
    /// Bytes written to the output file.
    pub bytes: usize,
}

/// A configured run of the pipeline.
///
/// # Example
///
/// ```no_run
/// use replace_vars::{Job, Paths};
///
/// let paths = Paths {
///     variables: "vars.txt".into(),
///     template: "README.md.tmpl".into(),
///     output: "README.md".into(),
/// };
/// let summary = Job::default().run(&paths)?;
/// println!("wrote {} bytes", summary.bytes);
/// # Ok::<(), replace_vars::Error>(())
/// ```
#[derive(Debug, Default, Builder)]
pub struct Job {
    #[builder(default)]
    load: LoadOptions,

    #[builder(default)]
    engine: Engine,

    #[builder(default)]
    write_mode: WriteMode,
}

impl Job {
    /// Run all three stages. Nothing is written unless rendering succeeds.
    pub fn run(&self, paths: &Paths) -> Result<Summary, Error> {
        let vars = load_variables(&paths.variables, &self.load)?;

        let text = read_template(&paths.template)?;
        let template = self
            .engine
            .parse(&text)
            .map_err(|source| Error::TemplateParse {
                path: paths.template.clone(),
                text: text.clone(),
                source,
            })?;
        let rendered = self
            .engine
            .render(&template, &vars)
            .map_err(|source| Error::TemplateExec {
                path: paths.template.clone(),
                source,
            })?;

        write_output(&paths.output, rendered.as_bytes(), self.write_mode)?;
        info!(
            output = %paths.output.display(),
            variables = vars.len(),
            bytes = rendered.len(),
            "rendered template"
        );

        Ok(Summary {
            output: paths.output.clone(),
            variables: vars.len(),
            bytes: rendered.len(),
        })
    }
}

/// Read the whole template, separating open failures from read failures.
fn read_template(path: &Path) -> Result<String, Error> {
    let mut file = File::open(path).map_err(|source| Error::TemplateOpen {
        path: path.to_path_buf(),
        source,
    })?;
    let mut text = String::new();
    file.read_to_string(&mut text)
        .map_err(|source| Error::TemplateRead {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(text)
}
