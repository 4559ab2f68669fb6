//! Error types for protohook-build.

use std::io;
use std::path::PathBuf;

use crate::template::TemplateError;

/// Errors that can occur while planning or running a protoc invocation.
///
/// Everything except [`Error::ProtocFailed`] is detected before the compiler
/// is spawned.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Directory traversal failed below a configured root.
    #[error("failed to walk proto directory: {0}")]
    Walk(#[from] walkdir::Error),
    /// `pyproject.toml` (or another config source) could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseConfig(#[from] toml::de::Error),
    /// Bad, colliding or overlapping option values.
    #[error("invalid protobuf hook configuration: {0}")]
    Configuration(String),
    /// A `.proto` file is reachable from more than one configured root.
    #[error(
        "{} is reachable from both {} and {}",
        .file.display(),
        .first_root.display(),
        .second_root.display()
    )]
    DiscoveryAmbiguity {
        file: PathBuf,
        first_root: PathBuf,
        second_root: PathBuf,
    },
    /// Nothing to compile.
    #[error("no .proto files found under {}", display_roots(.roots))]
    NoInputs { roots: Vec<PathBuf> },
    /// Malformed output template.
    #[error(transparent)]
    Template(#[from] TemplateError),
    /// Neither protoc nor a Python interpreter with grpc_tools could be found.
    #[error("protocol compiler not found: {0}")]
    CompilerNotFound(String),
    /// The compiler ran and exited unsuccessfully. Carries its output verbatim.
    #[error("protoc failed: {0}")]
    ProtocFailed(String),
    /// The compiler exited successfully but did not write every expected file.
    #[error(
        "protoc did not produce {} expected output(s): {}",
        .paths.len(),
        display_roots(.paths)
    )]
    MissingOutputs { paths: Vec<PathBuf> },
    /// The interpreter could not report its site-packages directory.
    #[error("could not determine site-packages directory: {0}")]
    SitePackages(String),
}

fn display_roots(roots: &[PathBuf]) -> String {
    if roots.is_empty() {
        return "(no proto_paths configured)".to_string();
    }
    roots
        .iter()
        .map(|root| root.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}
