//! Project layout detection.

use std::io;
use std::path::{Path, PathBuf};

/// Where the project keeps its package source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
    package: String,
    uses_src_layout: bool,
}

impl ProjectLayout {
    /// Project root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Normalized package directory name.
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Whether the package lives under `src/`.
    pub fn uses_src_layout(&self) -> bool {
        self.uses_src_layout
    }

    /// Default search root for `.proto` files.
    pub fn default_proto_path(&self) -> PathBuf {
        self.default_dir()
    }

    /// Default directory generators write into.
    pub fn default_output_path(&self) -> PathBuf {
        self.default_dir()
    }

    fn default_dir(&self) -> PathBuf {
        if self.uses_src_layout {
            PathBuf::from("src")
        } else {
            PathBuf::from(".")
        }
    }
}

/// Decide between src-layout and flat layout.
///
/// The project uses src-layout when `src/<package>/__init__.*` exists and
/// `<package>/__init__.*` does not. Only the presence of the marker files is
/// checked. Filesystem errors other than a missing directory are returned.
pub fn resolve_layout(project_root: &Path, project_name: &str) -> io::Result<ProjectLayout> {
    let package = normalize_package_name(project_name);

    let flat = has_init_marker(&project_root.join(&package))?;
    let src = has_init_marker(&project_root.join("src").join(&package))?;
    let uses_src_layout = src && !flat;

    tracing::debug!(
        root = %project_root.display(),
        package = %package,
        uses_src_layout,
        "resolved project layout"
    );

    Ok(ProjectLayout {
        root: project_root.to_path_buf(),
        package,
        uses_src_layout,
    })
}

/// Lowercase the project name and turn hyphens into underscores.
pub fn normalize_package_name(name: &str) -> String {
    name.trim().to_lowercase().replace('-', "_")
}

/// Whether `dir` holds a file named `__init__.<ext>`. Symlinks to files count.
fn has_init_marker(dir: &Path) -> io::Result<bool> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => {
            return Ok(false)
        }
        Err(e) => return Err(e),
    };

    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let is_marker = name
            .to_str()
            .and_then(|name| name.strip_prefix("__init__."))
            .is_some_and(|ext| !ext.is_empty());
        if is_marker && entry.path().is_file() {
            return Ok(true);
        }
    }
    Ok(false)
}
