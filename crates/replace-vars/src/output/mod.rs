//! Output writer.
//!
//! Persists rendered bytes to a path, replacing any existing file. New files
//! get mode 0644 on Unix.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

/// Permission bits for written files: owner rw, group r, other r.
pub const OUTPUT_MODE: u32 = 0o644;

/// How the output file is replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Truncate and write the destination in place with a single write.
    #[default]
    Direct,
    /// Write a sibling temporary file, then rename it over the destination.
    Atomic,
}

/// The output file could not be written.
#[derive(Debug, Error)]
#[error("cannot write '{path}': {source}")]
pub struct OutputError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Write `contents` to `path`.
///
/// # Errors
///
/// Returns [`OutputError`] if the file (or, in atomic mode, the temporary
/// file or the rename) cannot be created or written.
pub fn write_output(
    path: impl AsRef<Path>,
    contents: &[u8],
    mode: WriteMode,
) -> Result<(), OutputError> {
    let path = path.as_ref();
    let result = match mode {
        WriteMode::Direct => write_direct(path, contents),
        WriteMode::Atomic => write_atomic(path, contents),
    };
    result.map_err(|source| OutputError {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = contents.len(), ?mode, "wrote output");
    Ok(())
}

fn write_direct(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(OUTPUT_MODE);
    }
    let mut file = options.open(path)?;
    file.write_all(contents)
}

fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(temp.path(), fs::Permissions::from_mode(OUTPUT_MODE))?;
    }
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_replaces_existing_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.md");
        fs::write(&path, "a much longer previous body").unwrap();
        write_output(&path, b"new", WriteMode::Direct).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn atomic_writes_relative_to_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.md");
        write_output(&path, b"body", WriteMode::Atomic).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "body");
    }

    #[cfg(unix)]
    #[test]
    fn new_files_get_output_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let atomic = dir.path().join("atomic");
        write_output(&atomic, b"x", WriteMode::Atomic).unwrap();
        let bits = fs::metadata(&atomic).unwrap().permissions().mode() & 0o777;
        assert_eq!(bits, OUTPUT_MODE);

        // Direct creation is subject to the process umask.
        let direct = dir.path().join("direct");
        write_output(&direct, b"x", WriteMode::Direct).unwrap();
        let bits = fs::metadata(&direct).unwrap().permissions().mode() & 0o777;
        assert_eq!(bits & 0o600, 0o600);
        assert_eq!(bits & !OUTPUT_MODE, 0);
    }

    #[test]
    fn missing_directory_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("out.md");
        let err = write_output(&path, b"x", WriteMode::Direct).unwrap_err();
        assert_eq!(err.path, path);
        assert!(err.to_string().contains("out.md"));
    }
}
