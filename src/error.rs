//! Error types for the build hook.

use std::io;
use std::path::PathBuf;

/// Errors raised by the build hook.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// `pyproject.toml` could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    ReadPyproject {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// `pyproject.toml` is not valid TOML or has unexpected value types.
    #[error("failed to parse pyproject.toml: {0}")]
    ParsePyproject(#[from] toml::de::Error),
    /// The `[project]` table or its `name` is missing.
    #[error("pyproject.toml has no [project] name")]
    MissingProjectName,
    /// A generated file could not be removed.
    #[error("failed to remove {}: {source}", .path.display())]
    Clean {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Planning or running the compiler failed.
    #[error(transparent)]
    Build(#[from] protohook_build::Error),
}
