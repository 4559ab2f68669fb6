//! `protohook-build` plans `protoc` invocations for Python packaging builds.
//!
//! Given the hook configuration of a project it works out which `.proto`
//! files to compile, the exact compiler arguments for every generator, and
//! the files the compiler will write, so the packaging step can both run the
//! compiler and register the generated files as artifacts.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! fn main() -> Result<(), protohook_build::Error> {
//!     let root = Path::new(".");
//!     let layout = protohook_build::resolve_layout(root, "my-project")?;
//!     let config = protohook_build::RawConfig::from_toml(
//!         r#"
//!         proto_paths = ["protos"]
//!         output_path = "src"
//!         "#,
//!     )?
//!     .resolve(&layout, None)?;
//!
//!     let plan = protohook_build::plan_project(&layout, &config)?;
//!     for artifact in plan.artifacts() {
//!         println!("{artifact}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Output Templates
//!
//! Every generator lists the files it writes per `.proto` file as templates
//! relative to its output directory. Two placeholders are recognised:
//!
//! - `{proto_name}`: the file name without `.proto`.
//! - `{proto_path}`: the directory of the file relative to the search root
//!   it was found under.
//!
//! So with `proto_paths = ["src"]`, the file `src/foo/bar/test.proto` and the
//! template `{proto_path}/{proto_name}_pb2.py` name `foo/bar/test_pb2.py`.

mod config;
pub mod discovery;
mod error;
pub mod generator;
mod layout;
pub mod path;
mod plan;
pub mod protoc;
mod template;

pub use config::{CustomGenerator, ProtobufConfig, RawConfig, RawGenerator, Setting, Source};
pub use discovery::{discover, DiscoveredProto, Discovery, ProtoOrigin};
pub use error::Error;
pub use generator::{build_generator_specs, GeneratorSpec};
pub use layout::{normalize_package_name, resolve_layout, ProjectLayout};
pub use plan::{plan, CompilerInvocationPlan, GeneratorInvocation};
pub use template::{OutputTemplate, TemplateError, TemplateErrorKind};

/// Build generators, discover protos and plan, in one go.
pub fn plan_project(
    layout: &ProjectLayout,
    config: &ProtobufConfig,
) -> Result<CompilerInvocationPlan, Error> {
    let specs = build_generator_specs(config)?;
    let discovered = discover(layout.root(), &config.proto_paths, &config.library_paths)?;
    plan(config, layout, &specs, &discovered)
}
