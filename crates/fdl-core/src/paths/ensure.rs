//! Directory creation and verification.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use super::error::PathError;

/// Create `path` (and parents) if missing, then check it is a writable directory.
pub fn ensure_directory(path: &Path) -> Result<(), PathError> {
    if path.exists() {
        if !path.is_dir() {
            return Err(PathError::NotADirectory(path.to_path_buf()));
        }
    } else {
        fs::create_dir_all(path).map_err(|source| PathError::CreateFailed {
            path: path.to_path_buf(),
            source,
        })?;
    }

    verify_writable(path)
}

/// Verify a directory is writable by creating and removing a marker file.
pub fn verify_writable(path: &Path) -> Result<(), PathError> {
    let marker = path.join(".fdl_write_test");
    let not_writable = |source| PathError::NotWritable {
        path: path.to_path_buf(),
        source,
    };

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&marker)
        .map_err(not_writable)?;
    file.write_all(b"test").map_err(not_writable)?;
    drop(file);
    let _ = fs::remove_file(&marker);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio_test::assert_ok;

    #[test]
    fn test_creates_nested_directory() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a").join("b");
        assert_ok!(ensure_directory(&nested));
        assert!(nested.is_dir());
        assert!(!nested.join(".fdl_write_test").exists());
    }

    #[test]
    fn test_rejects_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("plain.txt");
        fs::write(&file, b"x").unwrap();
        let err = ensure_directory(&file).unwrap_err();
        assert!(matches!(err, PathError::NotADirectory(_)));
        assert_eq!(err.path(), Some(file.as_path()));
    }

    #[test]
    fn test_create_failure_keeps_io_source() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();
        let nested = blocker.join("cache");

        let err = ensure_directory(&nested).unwrap_err();
        assert!(matches!(err, PathError::CreateFailed { .. }));
        assert_eq!(err.path(), Some(nested.as_path()));
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("cache"));
    }
}
