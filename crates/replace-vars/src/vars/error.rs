//! Error types for the variables loader.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// An error that occurred while loading a variables file.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be opened.
    #[error("cannot open '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file was opened but reading it failed part way through.
    #[error("failed to read '{path}' at line {line}: {source}")]
    Read {
        path: PathBuf,
        line: usize,
        #[source]
        source: io::Error,
    },
}

/// A read failure from [`parse_variables`](super::parse_variables).
#[derive(Debug, Error)]
#[error("read failed at line {line}: {source}")]
pub struct ReadError {
    /// 1-based line number that could not be read.
    pub line: usize,
    #[source]
    pub source: io::Error,
}
