//! Planning of the protoc invocation.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::config::ProtobufConfig;
use crate::discovery::Discovery;
use crate::generator::GeneratorSpec;
use crate::layout::ProjectLayout;
use crate::path::{normalize, to_posix};
use crate::Error;

/// Arguments and outputs for one generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorInvocation {
    pub name: String,
    /// Directory the generator writes into.
    pub output_dir: PathBuf,
    /// `--<name>_out=<dir>`.
    pub out_arg: String,
    /// `--<name>_opt=<options>`, when the generator has options.
    pub opt_arg: Option<String>,
    /// `--plugin=protoc-gen-<name>=<path>`, when the generator names a plugin.
    pub plugin_arg: Option<String>,
    /// Files this generator is expected to write, relative to the project root.
    pub outputs: Vec<PathBuf>,
}

/// Everything needed to run the compiler and register its outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerInvocationPlan {
    /// Directory the compiler runs in. All other paths are relative to it.
    pub working_dir: PathBuf,
    /// One `--proto_path=<root>` per distinct search root.
    pub proto_path_args: Vec<String>,
    /// Per-generator arguments, in generator order.
    pub generators: Vec<GeneratorInvocation>,
    /// `.proto` files to compile.
    pub inputs: Vec<PathBuf>,
    /// Every file the compiler will write.
    pub expected_outputs: BTreeSet<PathBuf>,
}

impl CompilerInvocationPlan {
    fn generator(&self, name: &str) -> Option<&GeneratorInvocation> {
        self.generators.iter().find(|g| g.name == name)
    }

    pub fn out_arg(&self, name: &str) -> Option<&str> {
        self.generator(name).map(|g| g.out_arg.as_str())
    }

    pub fn opt_args(&self, name: &str) -> Vec<&str> {
        self.generator(name)
            .and_then(|g| g.opt_arg.as_deref())
            .into_iter()
            .collect()
    }

    pub fn plugin_arg(&self, name: &str) -> Option<&str> {
        self.generator(name).and_then(|g| g.plugin_arg.as_deref())
    }

    /// Output directories of all generators, deduplicated.
    pub fn output_dirs(&self) -> BTreeSet<PathBuf> {
        self.generators.iter().map(|g| g.output_dir.clone()).collect()
    }

    /// The full compiler argument list, without the program itself.
    ///
    /// Order: proto paths, plugins, per-generator out and opt flags, inputs.
    pub fn args(&self) -> Vec<String> {
        let mut args = self.proto_path_args.clone();
        args.extend(self.generators.iter().filter_map(|g| g.plugin_arg.clone()));
        for generator in &self.generators {
            args.push(generator.out_arg.clone());
            args.extend(generator.opt_arg.clone());
        }
        args.extend(self.inputs.iter().map(|input| to_posix(input)));
        args
    }

    /// Expected outputs that do not exist as files below `working_dir`.
    pub fn missing_outputs(&self) -> Vec<PathBuf> {
        self.expected_outputs
            .iter()
            .filter(|output| !self.working_dir.join(output).is_file())
            .cloned()
            .collect()
    }

    /// Expected outputs as `/`-separated strings, sorted.
    pub fn artifacts(&self) -> Vec<String> {
        self.expected_outputs.iter().map(|p| to_posix(p)).collect()
    }
}

/// Combine configuration, generators and discovered files into a plan.
///
/// Pure: identical inputs give an identical plan, including argument order.
/// Library protos contribute their root to `--proto_path` only. Fails with
/// [`Error::NoInputs`] when there is nothing to compile.
pub fn plan(
    config: &ProtobufConfig,
    layout: &ProjectLayout,
    specs: &[GeneratorSpec],
    discovered: &Discovery,
) -> Result<CompilerInvocationPlan, Error> {
    let inputs: Vec<PathBuf> = discovered.sources().map(|p| p.input_path()).collect();
    if inputs.is_empty() {
        return Err(Error::NoInputs {
            roots: config.proto_paths.to_vec(),
        });
    }

    let proto_path_args = proto_path_args(config);

    let mut expected_outputs = BTreeSet::new();
    let generators = specs
        .iter()
        .map(|spec| {
            let mut outputs = Vec::new();
            for proto in discovered.sources() {
                for template in &spec.outputs {
                    let expanded = template.expand(&proto.relative_dir, &proto.base_name);
                    outputs.push(normalize(&spec.output_path.join(expanded)));
                }
            }
            expected_outputs.extend(outputs.iter().cloned());

            GeneratorInvocation {
                name: spec.name.clone(),
                output_dir: spec.output_path.clone(),
                out_arg: spec.out_arg(),
                opt_arg: spec.opt_arg(),
                plugin_arg: spec.plugin_arg(),
                outputs,
            }
        })
        .collect();

    Ok(CompilerInvocationPlan {
        working_dir: layout.root().to_path_buf(),
        proto_path_args,
        generators,
        inputs,
        expected_outputs,
    })
}

/// `proto_paths`, then `library_paths`, then site-packages, first occurrence
/// wins.
fn proto_path_args(config: &ProtobufConfig) -> Vec<String> {
    let roots = config
        .proto_paths
        .iter()
        .chain(config.library_paths.iter())
        .map(|root| normalize(root))
        .chain(config.site_packages().map(Path::to_path_buf));

    let mut seen = BTreeSet::new();
    let mut args = Vec::new();
    for root in roots {
        if seen.insert(root.clone()) {
            args.push(format!("--proto_path={}", to_posix(&root)));
        }
    }
    args
}
