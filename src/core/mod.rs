//! Core module - configuration, version lookup and file I/O

pub mod config;
pub mod git;
pub mod loader;

pub use config::{ArtifactKind, Config, ConfigError};
pub use git::{Git, GitError, VersionSource, UNKNOWN_VERSION};
pub use loader::FileError;
