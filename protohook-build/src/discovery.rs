//! Discovery of `.proto` files under the configured search roots.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::path::normalize;
use crate::Error;

/// Why a proto file was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtoOrigin {
    /// Under a `proto_paths` root: compiled.
    Source,
    /// Under a `library_paths` root: only used to resolve imports.
    Library,
}

/// A `.proto` file found during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredProto {
    pub absolute_path: PathBuf,
    /// The configured root the file was found under, normalized.
    pub proto_path_root: PathBuf,
    /// Directory of the file relative to `proto_path_root`. Empty at the root.
    pub relative_dir: PathBuf,
    /// File name without the `.proto` extension.
    pub base_name: String,
    pub origin: ProtoOrigin,
}

impl DiscoveredProto {
    /// Path handed to the compiler, relative to the project root.
    pub fn input_path(&self) -> PathBuf {
        normalize(
            &self
                .proto_path_root
                .join(&self.relative_dir)
                .join(format!("{}.proto", self.base_name)),
        )
    }

    pub fn is_library(&self) -> bool {
        self.origin == ProtoOrigin::Library
    }
}

/// All proto files found for one build, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    protos: Vec<DiscoveredProto>,
}

impl Discovery {
    /// Every discovered file, sources first.
    pub fn all(&self) -> &[DiscoveredProto] {
        &self.protos
    }

    /// Files to compile, in `proto_paths` order then path order per root.
    pub fn sources(&self) -> impl Iterator<Item = &DiscoveredProto> {
        self.protos.iter().filter(|proto| !proto.is_library())
    }

    /// Files only used for import resolution.
    pub fn libraries(&self) -> impl Iterator<Item = &DiscoveredProto> {
        self.protos.iter().filter(|proto| proto.is_library())
    }
}

/// Walk `proto_paths` then `library_paths` below `project_root`.
///
/// Symbolic links are never followed, so a directory reachable only through
/// a symlink is skipped and self-referential links cannot loop. A file
/// reachable from two roots is an error, as is one directory configured as
/// both a source and a library root under different spellings. A root
/// repeated within one role is walked once. The site-packages directory is never
/// walked; it only contributes a `--proto_path`.
pub fn discover(
    project_root: &Path,
    proto_paths: &[PathBuf],
    library_paths: &[PathBuf],
) -> Result<Discovery, Error> {
    let mut protos = Vec::new();
    // canonical file path -> root it was first found under
    let mut owners: HashMap<PathBuf, PathBuf> = HashMap::new();
    // canonical root -> (configured root, role)
    let mut walked_roots: HashMap<PathBuf, (PathBuf, ProtoOrigin)> = HashMap::new();

    let roots = proto_paths
        .iter()
        .map(|root| (root, ProtoOrigin::Source))
        .chain(library_paths.iter().map(|root| (root, ProtoOrigin::Library)));

    for (root, origin) in roots {
        let root = normalize(root);
        let abs_root = project_root.join(&root);

        if !abs_root.is_dir() {
            tracing::warn!(root = %root.display(), "proto root does not exist, skipping");
            continue;
        }
        let canonical_root = std::fs::canonicalize(&abs_root)?;
        match walked_roots.get(&canonical_root) {
            Some((_, seen)) if *seen == origin => {
                tracing::warn!(
                    root = %root.display(),
                    "proto root listed more than once, skipping"
                );
                continue;
            }
            Some((first, _)) => {
                return Err(Error::config(format!(
                    "{} and {} are the same directory; a root cannot be both a proto path \
                     and a library path",
                    first.display(),
                    root.display()
                )));
            }
            None => {}
        }
        walked_roots.insert(canonical_root, (root.clone(), origin));

        let found = walk_root(&abs_root)?;
        tracing::debug!(
            root = %root.display(),
            ?origin,
            count = found.len(),
            "discovered proto files"
        );

        for relative in found {
            let absolute_path = abs_root.join(&relative);
            let canonical = std::fs::canonicalize(&absolute_path)?;
            if let Some(first_root) = owners.get(&canonical) {
                return Err(Error::DiscoveryAmbiguity {
                    file: normalize(&root.join(&relative)),
                    first_root: first_root.clone(),
                    second_root: root,
                });
            }
            owners.insert(canonical, root.clone());

            let relative_dir = relative.parent().map(Path::to_path_buf).unwrap_or_default();
            let base_name = relative
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();

            protos.push(DiscoveredProto {
                absolute_path,
                proto_path_root: root.clone(),
                relative_dir,
                base_name,
                origin,
            });
        }
    }

    Ok(Discovery { protos })
}

/// Regular `.proto` files under `root`, relative to it, sorted by path.
fn walk_root(root: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut found = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry?;
        // Symlinks report their own file type here, so they are neither
        // descended into nor collected.
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().and_then(|ext| ext.to_str()) != Some("proto") {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| entry.path().to_path_buf());
        found.push(relative);
    }
    found.sort();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, path: &str) {
        let path = root.join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "syntax = \"proto3\";\n").unwrap();
    }

    fn inputs(discovery: &Discovery) -> Vec<PathBuf> {
        discovery.sources().map(DiscoveredProto::input_path).collect()
    }

    #[test]
    fn test_discovers_sorted_per_root() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "src/pkg/z.proto");
        touch(dir.path(), "src/pkg/a.proto");
        touch(dir.path(), "src/pkg/sub/m.proto");
        touch(dir.path(), "src/pkg/notes.txt");
        touch(dir.path(), "protos/b.proto");

        let discovery = discover(dir.path(), &["protos".into(), "src".into()], &[]).unwrap();
        assert_eq!(
            inputs(&discovery),
            vec![
                PathBuf::from("protos/b.proto"),
                PathBuf::from("src/pkg/a.proto"),
                PathBuf::from("src/pkg/sub/m.proto"),
                PathBuf::from("src/pkg/z.proto"),
            ]
        );

        let nested = &discovery.all()[2];
        assert_eq!(nested.proto_path_root, PathBuf::from("src"));
        assert_eq!(nested.relative_dir, PathBuf::from("pkg/sub"));
        assert_eq!(nested.base_name, "m");
    }

    #[test]
    fn test_root_level_proto() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "greeter.proto");

        let discovery = discover(dir.path(), &[".".into()], &[]).unwrap();
        let proto = &discovery.all()[0];
        assert_eq!(proto.relative_dir, PathBuf::new());
        assert_eq!(proto.input_path(), PathBuf::from("greeter.proto"));
    }

    #[test]
    fn test_library_protos_are_tagged() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "src/pkg/api.proto");
        touch(dir.path(), "vendor/google/type/date.proto");

        let discovery = discover(dir.path(), &["src".into()], &["vendor".into()]).unwrap();
        assert_eq!(inputs(&discovery), vec![PathBuf::from("src/pkg/api.proto")]);
        let libraries: Vec<_> = discovery.libraries().map(|p| p.input_path()).collect();
        assert_eq!(libraries, vec![PathBuf::from("vendor/google/type/date.proto")]);
    }

    #[test]
    fn test_nested_roots_are_ambiguous() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "src/pkg/api.proto");

        let err = discover(dir.path(), &["src".into(), "src/pkg".into()], &[]).unwrap_err();
        match err {
            Error::DiscoveryAmbiguity {
                first_root,
                second_root,
                ..
            } => {
                assert_eq!(first_root, PathBuf::from("src"));
                assert_eq!(second_root, PathBuf::from("src/pkg"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_source_and_library_overlap_is_ambiguous() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "protos/lib/common.proto");

        let err = discover(dir.path(), &["protos".into()], &["protos/lib".into()]).unwrap_err();
        assert!(matches!(err, Error::DiscoveryAmbiguity { .. }), "{err:?}");
    }

    #[test]
    fn test_duplicate_root_walked_once() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "src/api.proto");

        let discovery = discover(dir.path(), &["src".into(), "./src".into()], &[]).unwrap();
        assert_eq!(inputs(&discovery), vec![PathBuf::from("src/api.proto")]);
    }

    #[test]
    fn test_same_root_in_both_roles_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "protos/api.proto");
        let absolute = dir.path().join("protos");

        let err = discover(dir.path(), &["protos".into()], &[absolute]).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)), "{err:?}");
    }

    #[test]
    fn test_missing_root_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let discovery = discover(dir.path(), &["nope".into()], &[]).unwrap();
        assert!(discovery.all().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directory_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a/real.proto");
        touch(dir.path(), "sibling/x.proto");
        std::os::unix::fs::symlink(dir.path().join("sibling"), dir.path().join("a/b")).unwrap();
        // Self-referential link must not loop.
        std::os::unix::fs::symlink(dir.path().join("a"), dir.path().join("a/loop")).unwrap();

        let discovery = discover(dir.path(), &["a".into()], &[]).unwrap();
        assert_eq!(inputs(&discovery), vec![PathBuf::from("a/real.proto")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_file_not_collected() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "other/x.proto");
        fs::create_dir_all(dir.path().join("a")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("other/x.proto"), dir.path().join("a/x.proto"))
            .unwrap();

        let discovery = discover(dir.path(), &["a".into()], &[]).unwrap();
        assert!(discovery.all().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_alias_across_roles_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "test_project/helloworld.proto");
        std::os::unix::fs::symlink(dir.path().join("test_project"), dir.path().join("alias"))
            .unwrap();

        let err = discover(dir.path(), &["test_project".into()], &["alias".into()]).unwrap_err();
        match err {
            Error::Configuration(msg) => {
                assert!(msg.contains("test_project") && msg.contains("alias"), "{msg}")
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_alias_within_role_walked_once() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "protos/api.proto");
        std::os::unix::fs::symlink(dir.path().join("protos"), dir.path().join("alias")).unwrap();

        let discovery = discover(dir.path(), &["protos".into(), "alias".into()], &[]).unwrap();
        assert_eq!(inputs(&discovery), vec![PathBuf::from("protos/api.proto")]);
    }
}
