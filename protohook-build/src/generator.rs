//! Generator specifications.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::config::ProtobufConfig;
use crate::template::OutputTemplate;
use crate::Error;

/// Name of the built-in message generator (`--python_out`).
pub const PYTHON: &str = "python";
/// Name of the built-in gRPC stub generator. `grpc_tools.protoc` registers
/// its plugin as `grpc_python`, hence `--grpc_python_out`.
pub const GRPC: &str = "grpc_python";
/// Name of the built-in type stub generator (`--pyi_out`).
pub const PYI: &str = "pyi";

/// Names custom generators may not use.
pub const RESERVED_NAMES: &[&str] = &[PYTHON, "grpc", GRPC, PYI];

/// One output-producing unit, i.e. one `--<name>_out` flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorSpec {
    pub name: String,
    pub outputs: Vec<OutputTemplate>,
    pub output_path: PathBuf,
    pub protoc_plugin: Option<PathBuf>,
    pub options: Vec<String>,
}

impl GeneratorSpec {
    fn builtin(name: &str, template: &str, output_path: PathBuf) -> Result<Self, Error> {
        Ok(Self {
            name: name.to_string(),
            outputs: vec![OutputTemplate::parse(template)?],
            output_path,
            protoc_plugin: None,
            options: Vec::new(),
        })
    }

    /// `--<name>_out=<output_path>`.
    pub fn out_arg(&self) -> String {
        format!("--{}_out={}", self.name, self.output_path.display())
    }

    /// `--<name>_opt=<a,b,...>`, if any options are set.
    pub fn opt_arg(&self) -> Option<String> {
        if self.options.is_empty() {
            None
        } else {
            Some(format!("--{}_opt={}", self.name, self.options.join(",")))
        }
    }

    /// `--plugin=protoc-gen-<name>=<path>`, if a plugin binary is set.
    pub fn plugin_arg(&self) -> Option<String> {
        self.protoc_plugin
            .as_ref()
            .map(|plugin| format!("--plugin=protoc-gen-{}={}", self.name, plugin.display()))
    }
}

/// Build the ordered generator list: `python`, then `grpc_python` and `pyi`
/// when enabled, then custom generators in declaration order.
///
/// Names must be unique across the whole list since they share protoc's flag
/// namespace. A custom generator may not take a reserved built-in name even
/// when that built-in is disabled.
pub fn build_generator_specs(config: &ProtobufConfig) -> Result<Vec<GeneratorSpec>, Error> {
    let output_path = (*config.output_path).clone();

    let mut specs = vec![GeneratorSpec::builtin(
        PYTHON,
        "{proto_path}/{proto_name}_pb2.py",
        output_path.clone(),
    )?];
    if *config.generate_grpc {
        specs.push(GeneratorSpec::builtin(
            GRPC,
            "{proto_path}/{proto_name}_pb2_grpc.py",
            output_path.clone(),
        )?);
    }
    if *config.generate_pyi {
        specs.push(GeneratorSpec::builtin(
            PYI,
            "{proto_path}/{proto_name}_pb2.pyi",
            output_path.clone(),
        )?);
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for custom in &config.generators {
        if RESERVED_NAMES.contains(&custom.name.as_str()) {
            return Err(Error::config(format!(
                "generator name {:?} is reserved for a built-in generator",
                custom.name
            )));
        }
        if !seen.insert(custom.name.as_str()) {
            return Err(Error::config(format!(
                "generator {:?} is declared more than once",
                custom.name
            )));
        }

        specs.push(GeneratorSpec {
            name: custom.name.clone(),
            outputs: custom.outputs.clone(),
            output_path: custom
                .output_path
                .clone()
                .unwrap_or_else(|| output_path.clone()),
            protoc_plugin: custom.protoc_plugin.clone(),
            options: custom.options.clone(),
        });
    }

    Ok(specs)
}
