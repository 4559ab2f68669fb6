//! The build hook the packaging system drives.

use std::path::{Path, PathBuf};

use protohook_build::protoc::{self, Compiler};
use protohook_build::{
    plan_project, resolve_layout, CompilerInvocationPlan, ProjectLayout, ProtobufConfig, RawConfig,
};

use crate::error::HookError;
use crate::pyproject::HookSettings;

/// Build state shared with the packaging system.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildData {
    /// Files to include in the distribution, `/`-separated and relative to the
    /// project root.
    pub artifacts: Vec<String>,
}

/// Compiles `.proto` files before a build and registers the generated files.
#[derive(Debug, Clone)]
pub struct ProtocHook {
    root: PathBuf,
    project_name: String,
    config: RawConfig,
    python: Option<PathBuf>,
}

impl ProtocHook {
    pub const PLUGIN_NAME: &'static str = "protobuf";

    pub fn new(
        root: impl Into<PathBuf>,
        project_name: impl Into<String>,
        config: RawConfig,
    ) -> Self {
        Self {
            root: root.into(),
            project_name: project_name.into(),
            config,
            python: None,
        }
    }

    /// Configure the hook from `<root>/pyproject.toml`. A missing hook table
    /// means all defaults.
    pub fn from_pyproject(root: impl Into<PathBuf>) -> Result<Self, HookError> {
        let root = root.into();
        let settings = HookSettings::load(&root)?;
        Ok(Self::new(
            root,
            settings.project_name,
            settings.config.unwrap_or_default(),
        ))
    }

    /// Python interpreter used for `grpc_tools.protoc` and the site-packages
    /// lookup. Found on PATH when unset.
    pub fn with_python(mut self, python: impl Into<PathBuf>) -> Self {
        self.python = Some(python.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn python(&self) -> Result<PathBuf, HookError> {
        match &self.python {
            Some(python) => Ok(python.clone()),
            None => Ok(protoc::find_python()?),
        }
    }

    fn resolve(&self) -> Result<(ProjectLayout, ProtobufConfig), HookError> {
        let layout = resolve_layout(&self.root, &self.project_name)
            .map_err(protohook_build::Error::from)?;

        // Only ask the interpreter when the answer is used.
        let site_packages = if self.config.include_site_packages == Some(true) {
            Some(protoc::site_packages(&self.python()?)?)
        } else {
            None
        };

        let config = self.config.clone().resolve(&layout, site_packages)?;
        Ok((layout, config))
    }

    /// Work out what the compiler will be asked to do, without running it.
    pub fn plan(&self) -> Result<CompilerInvocationPlan, HookError> {
        let (layout, config) = self.resolve()?;
        Ok(plan_project(&layout, &config)?)
    }

    /// Run the compiler and register its outputs in `build_data`.
    ///
    /// `build_data` is only touched once every expected output exists.
    pub fn initialize(
        &self,
        build_data: &mut BuildData,
    ) -> Result<CompilerInvocationPlan, HookError> {
        let (layout, config) = self.resolve()?;
        let plan = plan_project(&layout, &config)?;

        let compiler = Compiler::locate(config.protoc.as_deref(), self.python.as_deref())?;

        tracing::info!("Generating code from Protobuf files");
        protoc::invoke(&compiler, &plan)?;

        let missing = plan.missing_outputs();
        if !missing.is_empty() {
            return Err(protohook_build::Error::MissingOutputs { paths: missing }.into());
        }

        build_data.artifacts.extend(plan.artifacts());
        Ok(plan)
    }

    /// Remove every file a build would generate. Returns the removed paths.
    ///
    /// With no `.proto` files left there is nothing to remove.
    pub fn clean(&self) -> Result<Vec<PathBuf>, HookError> {
        let plan = match self.plan() {
            Ok(plan) => plan,
            Err(HookError::Build(protohook_build::Error::NoInputs { .. })) => {
                tracing::debug!("no proto files, nothing to clean");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };
        let mut removed = Vec::new();
        for output in &plan.expected_outputs {
            let path = self.root.join(output);
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    tracing::debug!(path = %output.display(), "removed generated file");
                    removed.push(output.clone());
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => return Err(HookError::Clean { path, source }),
            }
        }
        Ok(removed)
    }
}
