//! The parts of `pyproject.toml` the hook reads.

use std::path::Path;

use protohook_build::RawConfig;
use serde::Deserialize;

use crate::error::HookError;

#[derive(Debug, Default, Deserialize)]
struct PyProject {
    project: Option<Project>,
    #[serde(default)]
    tool: Tool,
}

#[derive(Debug, Deserialize)]
struct Project {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Tool {
    #[serde(default)]
    hatch: Hatch,
}

#[derive(Debug, Default, Deserialize)]
struct Hatch {
    #[serde(default)]
    build: Build,
}

#[derive(Debug, Default, Deserialize)]
struct Build {
    #[serde(default)]
    hooks: Hooks,
}

#[derive(Debug, Default, Deserialize)]
struct Hooks {
    protobuf: Option<RawConfig>,
}

/// Project name and the `[tool.hatch.build.hooks.protobuf]` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookSettings {
    pub project_name: String,
    /// `None` when the hook table is absent.
    pub config: Option<RawConfig>,
}

impl HookSettings {
    pub fn parse(source: &str) -> Result<Self, HookError> {
        let pyproject: PyProject = toml::from_str(source)?;
        let project_name = pyproject
            .project
            .and_then(|project| project.name)
            .ok_or(HookError::MissingProjectName)?;

        Ok(Self {
            project_name,
            config: pyproject.tool.hatch.build.hooks.protobuf,
        })
    }

    /// Read `<root>/pyproject.toml`.
    pub fn load(root: &Path) -> Result<Self, HookError> {
        let path = root.join("pyproject.toml");
        let source = std::fs::read_to_string(&path)
            .map_err(|source| HookError::ReadPyproject { path, source })?;
        Self::parse(&source)
    }
}
