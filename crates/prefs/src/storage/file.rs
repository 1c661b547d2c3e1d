//! Whole-file reads and writes.

use std::path::Path;

use tracing::debug;

use super::StorageError;

/// Reads `path` as UTF-8, returning `None` if the file does not exist.
///
/// # Errors
///
/// Returns [`StorageError::Io`] for every failure other than "not found",
/// including `path` being a directory.
pub fn read_optional(path: &Path) -> Result<Option<String>, StorageError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            debug!("read {} bytes from {}", content.len(), path.display());
            Ok(Some(content))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StorageError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes `contents` to `path`, creating missing parent directories.
///
/// # Errors
///
/// Returns [`StorageError::Io`] naming the directory or file that could not
/// be created or written.
pub fn write_file(path: &Path, contents: &str) -> Result<(), StorageError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| StorageError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, contents).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_optional_missing_file_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = read_optional(&dir.path().join("absent.cfg")).expect("read");
        assert!(result.is_none());
    }

    #[test]
    fn test_read_optional_directory_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = read_optional(dir.path()).unwrap_err();
        assert_eq!(err.path(), Some(dir.path()));
    }

    #[test]
    fn test_write_file_creates_parent_directories() {
        // Arrange
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("a").join("b").join("settings.cfg");

        // Act
        write_file(&path, "x = 1\n").expect("write");

        // Assert
        assert_eq!(read_optional(&path).expect("read").as_deref(), Some("x = 1\n"));
    }

    #[test]
    fn test_write_file_onto_directory_fails_with_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = write_file(dir.path(), "x").unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
    }
}
