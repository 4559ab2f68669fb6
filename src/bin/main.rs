//! `protohook` command-line entry point.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use protohook::{BuildData, ProtocHook};

/// Compile a project's .proto files the way its build hook would.
#[derive(Debug, Parser)]
#[command(name = "protohook")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Project root holding pyproject.toml.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Python interpreter for grpc_tools.protoc and the site-packages lookup.
    #[arg(long, env = "PYTHON")]
    python: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the compiler arguments and the files they will produce.
    Plan,
    /// Run the compiler and list the registered artifacts.
    Build,
    /// Remove generated files.
    Clean,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut hook = ProtocHook::from_pyproject(&cli.root)
        .with_context(|| format!("failed to configure hook in {}", cli.root.display()))?;
    if let Some(python) = cli.python {
        hook = hook.with_python(python);
    }

    match cli.command {
        Commands::Plan => {
            let plan = hook.plan()?;
            println!("arguments:");
            for arg in plan.args() {
                println!("  {arg}");
            }
            println!("outputs:");
            for artifact in plan.artifacts() {
                println!("  {artifact}");
            }
        }
        Commands::Build => {
            let mut build_data = BuildData::default();
            hook.initialize(&mut build_data)?;
            for artifact in &build_data.artifacts {
                println!("{artifact}");
            }
        }
        Commands::Clean => {
            for removed in hook.clean()? {
                println!("removed {}", removed.display());
            }
        }
    }

    Ok(())
}
