//! Build version lookup
//!
//! Pages are stamped with the commit they were built from. Git is invoked
//! directly through std::process::Command, never a shell.

use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

/// Version label used when the commit cannot be determined
pub const UNKNOWN_VERSION: &str = "Unknown version";

#[derive(Debug, Error)]
pub enum GitError {
    #[error("Not a git repository")]
    NotARepo,

    #[error("git rev-parse failed: {message}")]
    CommandFailed { message: String },

    #[error("Git not installed or not in PATH")]
    GitNotFound,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Something that can name the version being built
pub trait VersionSource: Send + Sync {
    fn version(&self) -> Result<String, GitError>;
}

/// Resolves the version from the project's git checkout
#[derive(Debug, Clone)]
pub struct Git {
    repo_root: PathBuf,
}

impl Git {
    pub fn new(repo_root: &Path) -> Self {
        Self {
            repo_root: repo_root.to_path_buf(),
        }
    }

    /// Run `git rev-parse <rev>` and return the trimmed hash
    fn rev_parse(&self, rev: &str) -> Result<String, GitError> {
        let output = Command::new("git")
            .args(["rev-parse", rev])
            .current_dir(&self.repo_root)
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound if self.repo_root.is_dir() => GitError::GitNotFound,
                _ => GitError::IoError(e),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if output.status.success() && !stdout.is_empty() {
            return Ok(stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if stderr.contains("not a git repository") {
            Err(GitError::NotARepo)
        } else {
            Err(GitError::CommandFailed { message: stderr })
        }
    }

    /// Full hash of the HEAD commit
    pub fn head_commit(&self) -> Result<String, GitError> {
        self.rev_parse("HEAD")
    }
}

impl VersionSource for Git {
    fn version(&self) -> Result<String, GitError> {
        self.head_commit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_head_commit_outside_repo_fails() {
        let dir = tempdir().unwrap();
        let git = Git::new(dir.path());
        assert!(git.version().is_err());
    }

    #[test]
    fn test_missing_directory_is_an_io_error() {
        let git = Git::new(Path::new("/nonexistent/regbuild/repo"));
        assert!(matches!(git.head_commit(), Err(GitError::IoError(_))));
    }
}
