//! Line-oriented `KEY=VALUE` parsing.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use bon::Builder;
use tracing::{debug, trace};

use super::error::{LoadError, ReadError};
use crate::types::VariableMap;

/// Options controlling how a variables file is interpreted.
///
/// # Example
///
/// ```
/// use replace_vars::vars::LoadOptions;
///
/// let options = LoadOptions::builder().comments(true).build();
/// assert!(options.comments);
/// assert!(!LoadOptions::default().comments);
/// ```
#[derive(Debug, Clone, Default, Builder)]
pub struct LoadOptions {
    /// Skip lines whose first non-whitespace character is `#`.
    ///
    /// Off by default: without it `#key=value` defines the key `#key`.
    #[builder(default)]
    pub comments: bool,
}

/// Load a variables file from disk.
///
/// The file handle lives only for the duration of this call.
///
/// # Errors
///
/// Returns [`LoadError::Open`] if the file cannot be opened and
/// [`LoadError::Read`] if reading fails part way (including invalid UTF-8).
pub fn load_variables(
    path: impl AsRef<Path>,
    options: &LoadOptions,
) -> Result<VariableMap, LoadError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let vars = parse_variables(BufReader::new(file), options).map_err(|e| LoadError::Read {
        path: path.to_path_buf(),
        line: e.line,
        source: e.source,
    })?;

    debug!(path = %path.display(), count = vars.len(), "loaded variables");
    Ok(vars)
}

/// Parse `KEY=VALUE` lines from a reader.
///
/// A line ends at `\n`; a `\r` right before it (or before end of input) is
/// part of the terminator. Later duplicates overwrite earlier ones.
///
/// # Example
///
/// ```
/// use replace_vars::vars::{LoadOptions, parse_variables};
///
/// let input = "name = World\r\nskipped\n\nname2=a=b\n";
/// let vars = parse_variables(input.as_bytes(), &LoadOptions::default()).unwrap();
/// assert_eq!(vars.get("name"), Some("World"));
/// assert_eq!(vars.get("name2"), Some("a=b"));
/// assert_eq!(vars.len(), 2);
/// ```
pub fn parse_variables(
    mut reader: impl BufRead,
    options: &LoadOptions,
) -> Result<VariableMap, ReadError> {
    let mut vars = VariableMap::new();
    let mut buf = String::new();
    let mut line_number = 0;

    loop {
        line_number += 1;
        buf.clear();
        let read = reader.read_line(&mut buf).map_err(|source| ReadError {
            line: line_number,
            source,
        })?;
        if read == 0 {
            break;
        }

        let line = strip_terminator(&buf);
        if let Some((key, value)) = split_entry(line, options) {
            vars.insert(key, value);
        } else {
            trace!(line = line_number, "skipping line");
        }
    }

    Ok(vars)
}

/// Remove the trailing `\n` and a `\r` preceding it.
fn strip_terminator(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// Split a line at its first `=`, or `None` if the line contributes no entry.
fn split_entry<'a>(line: &'a str, options: &LoadOptions) -> Option<(&'a str, &'a str)> {
    let trimmed = line.trim();
    if trimmed.is_empty() || (options.comments && trimmed.starts_with('#')) {
        return None;
    }
    let (key, value) = line.split_once('=')?;
    Some((key.trim(), value.trim()))
}
