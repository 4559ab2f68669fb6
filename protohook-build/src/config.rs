//! Configuration for the protobuf build hook.
//!
//! Configuration is built in two phases. [`RawConfig`] is deserialized
//! verbatim from the hook's TOML table, with every option optional.
//! [`RawConfig::resolve`] then fills defaults from the [`ProjectLayout`],
//! validates everything it can without touching `.proto` files, and records
//! for each option whether the user set it or it was defaulted.

use std::ops::Deref;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::layout::ProjectLayout;
use crate::path::normalize;
use crate::template::OutputTemplate;
use crate::Error;

/// Hook options exactly as written by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawConfig {
    pub generate_grpc: Option<bool>,
    pub generate_pyi: Option<bool>,
    pub proto_paths: Option<Vec<PathBuf>>,
    pub output_path: Option<PathBuf>,
    pub library_paths: Option<Vec<PathBuf>>,
    pub include_site_packages: Option<bool>,
    #[serde(default)]
    pub generators: Vec<RawGenerator>,
    /// Path to a standalone `protoc` binary.
    pub protoc: Option<PathBuf>,
}

/// One `[[generators]]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawGenerator {
    pub name: String,
    #[serde(default)]
    pub outputs: Vec<String>,
    pub output_path: Option<PathBuf>,
    pub protoc_plugin: Option<PathBuf>,
    #[serde(default)]
    pub options: Vec<String>,
}

impl RawConfig {
    /// Parse a hook table from TOML source.
    pub fn from_toml(source: &str) -> Result<Self, Error> {
        Ok(toml::from_str(source)?)
    }

    /// Fill defaults and validate.
    ///
    /// `site_packages` is the interpreter's site-packages directory. It is
    /// only consulted when `include_site_packages` is set, and is required
    /// then.
    pub fn resolve(
        self,
        layout: &ProjectLayout,
        site_packages: Option<PathBuf>,
    ) -> Result<ProtobufConfig, Error> {
        let generate_grpc = Setting::or(self.generate_grpc, true);
        let generate_pyi = Setting::or(self.generate_pyi, true);
        let include_site_packages = Setting::or(self.include_site_packages, false);
        let proto_paths = Setting::or_else(self.proto_paths, || vec![layout.default_proto_path()]);
        let output_path = Setting::or_else(self.output_path, || layout.default_output_path());
        let library_paths = Setting::or_else(self.library_paths, Vec::new);

        check_roles(&proto_paths, &library_paths)?;

        let site_packages = if *include_site_packages {
            let dir = site_packages.ok_or_else(|| {
                Error::config("include_site_packages is set but no site-packages directory is known")
            })?;
            Some(dir)
        } else {
            None
        };

        let generators = self
            .generators
            .into_iter()
            .map(CustomGenerator::from_raw)
            .collect::<Result<Vec<_>, _>>()?;

        let config = ProtobufConfig {
            generate_grpc,
            generate_pyi,
            proto_paths,
            output_path,
            library_paths,
            include_site_packages,
            generators,
            site_packages,
            protoc: self.protoc,
        };
        config.log_provenance();
        Ok(config)
    }
}

/// A `proto_paths` root may not double as a `library_paths` root.
fn check_roles(proto_paths: &[PathBuf], library_paths: &[PathBuf]) -> Result<(), Error> {
    for library in library_paths {
        let library_norm = normalize(library);
        if let Some(proto) = proto_paths.iter().find(|p| normalize(p) == library_norm) {
            return Err(Error::config(format!(
                "{} is listed in both proto_paths ({}) and library_paths ({})",
                library_norm.display(),
                proto.display(),
                library.display()
            )));
        }
    }
    Ok(())
}

/// Where a resolved option came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Set in the hook configuration.
    User,
    /// Filled in during resolution.
    Default,
}

/// A resolved option and its [`Source`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting<T> {
    value: T,
    source: Source,
}

impl<T> Setting<T> {
    pub fn user(value: T) -> Self {
        Self {
            value,
            source: Source::User,
        }
    }

    pub fn default_value(value: T) -> Self {
        Self {
            value,
            source: Source::Default,
        }
    }

    fn or(value: Option<T>, default: T) -> Self {
        Self::or_else(value, || default)
    }

    fn or_else(value: Option<T>, default: impl FnOnce() -> T) -> Self {
        match value {
            Some(value) => Self::user(value),
            None => Self::default_value(default()),
        }
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> Deref for Setting<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

/// A user-declared generator with its templates parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomGenerator {
    pub name: String,
    pub outputs: Vec<OutputTemplate>,
    /// `None` means the top-level `output_path`.
    pub output_path: Option<PathBuf>,
    pub protoc_plugin: Option<PathBuf>,
    pub options: Vec<String>,
}

impl CustomGenerator {
    fn from_raw(raw: RawGenerator) -> Result<Self, Error> {
        validate_generator_name(&raw.name)?;
        if raw.outputs.is_empty() {
            return Err(Error::config(format!(
                "generator {:?} must declare at least one output template",
                raw.name
            )));
        }
        let outputs = raw
            .outputs
            .iter()
            .map(|template| OutputTemplate::parse(template))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: raw.name,
            outputs,
            output_path: raw.output_path,
            protoc_plugin: raw.protoc_plugin,
            options: raw.options,
        })
    }
}

/// Generator names end up in `--<name>_out` and `protoc-gen-<name>`.
fn validate_generator_name(name: &str) -> Result<(), Error> {
    if name.is_empty() {
        return Err(Error::config("generator name must not be empty"));
    }
    let valid = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return Err(Error::config(format!(
            "generator name {name:?} may only contain ASCII letters, digits, '_' and '-'"
        )));
    }
    Ok(())
}

/// Fully resolved hook configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtobufConfig {
    pub generate_grpc: Setting<bool>,
    pub generate_pyi: Setting<bool>,
    pub proto_paths: Setting<Vec<PathBuf>>,
    pub output_path: Setting<PathBuf>,
    pub library_paths: Setting<Vec<PathBuf>>,
    pub include_site_packages: Setting<bool>,
    pub generators: Vec<CustomGenerator>,
    /// Site-packages directory, present iff `include_site_packages` is set.
    pub site_packages: Option<PathBuf>,
    pub protoc: Option<PathBuf>,
}

impl ProtobufConfig {
    pub fn site_packages(&self) -> Option<&Path> {
        self.site_packages.as_deref()
    }

    fn log_provenance(&self) {
        tracing::debug!(
            value = *self.generate_grpc,
            source = ?self.generate_grpc.source(),
            "generate_grpc"
        );
        tracing::debug!(
            value = *self.generate_pyi,
            source = ?self.generate_pyi.source(),
            "generate_pyi"
        );
        tracing::debug!(
            value = ?self.proto_paths.as_slice(),
            source = ?self.proto_paths.source(),
            "proto_paths"
        );
        tracing::debug!(
            value = %self.output_path.display(),
            source = ?self.output_path.source(),
            "output_path"
        );
        tracing::debug!(
            value = ?self.library_paths.as_slice(),
            source = ?self.library_paths.source(),
            "library_paths"
        );
        tracing::debug!(
            value = *self.include_site_packages,
            source = ?self.include_site_packages.source(),
            "include_site_packages"
        );
    }
}
