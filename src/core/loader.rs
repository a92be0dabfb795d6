//! File loading and writing utilities
//!
//! Thin async wrappers that attach the path to every I/O error, so a
//! failing pipeline can say which file it could not read or write.

use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
#[error("{action} {path}: {source}")]
pub struct FileError {
    pub action: &'static str,
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl FileError {
    fn new(action: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Read a whole text file
pub async fn read_text(path: &Path) -> Result<String, FileError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| FileError::new("Cannot read", path, e))
}

/// Write a whole file, replacing any previous content
pub async fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), FileError> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| FileError::new("Cannot write", path, e))
}

/// Create a directory and its parents; succeeds if it already exists
pub async fn ensure_dir(path: &Path) -> Result<(), FileError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| FileError::new("Cannot create", path, e))
}

/// Copy every file under `from` into `to`, keeping relative paths.
/// Returns the number of files copied.
pub fn copy_tree(from: &Path, to: &Path) -> Result<usize, FileError> {
    let mut copied = 0;
    for entry in WalkDir::new(from).min_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(from).to_path_buf();
            FileError::new("Cannot list", &path, e.into())
        })?;
        let Ok(relative) = entry.path().strip_prefix(from) else {
            continue;
        };
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| FileError::new("Cannot create", &target, e))?;
        } else {
            std::fs::copy(entry.path(), &target)
                .map_err(|e| FileError::new("Cannot copy", entry.path(), e))?;
            copied += 1;
        }
    }
    Ok(copied)
}
