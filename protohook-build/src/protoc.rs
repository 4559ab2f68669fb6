//! Protoc invocation utilities.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::path::to_posix;
use crate::plan::CompilerInvocationPlan;
use crate::Error;

/// Asks the interpreter where pure-Python packages are installed.
const SITE_PACKAGES_SCRIPT: &str = "import sysconfig; print(sysconfig.get_path('purelib'))";

/// The protocol compiler to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compiler {
    /// A standalone `protoc` binary.
    Protoc(PathBuf),
    /// `<python> -m grpc_tools.protoc`, which bundles the gRPC plugin.
    GrpcTools { python: PathBuf },
}

impl Compiler {
    /// Pick the compiler.
    ///
    /// A standalone binary is only used when configured explicitly. Otherwise
    /// `grpc_tools` runs through the given Python interpreter, since it ships
    /// the `grpc_python` plugin the default generators need. The `PROTOC`
    /// environment variable is not consulted.
    pub fn locate(explicit: Option<&Path>, python: Option<&Path>) -> Result<Self, Error> {
        if let Some(path) = explicit {
            return Ok(Self::Protoc(path.to_path_buf()));
        }

        let python = match python {
            Some(python) => python.to_path_buf(),
            None => find_python()?,
        };
        Ok(Self::GrpcTools { python })
    }

    /// Program and leading arguments.
    fn program(&self) -> (&Path, Vec<OsString>) {
        match self {
            Self::Protoc(path) => (path.as_path(), Vec::new()),
            Self::GrpcTools { python } => {
                (python.as_path(), vec!["-m".into(), "grpc_tools.protoc".into()])
            }
        }
    }

    /// The full command line for `plan`, for logging.
    pub fn command_line(&self, plan: &CompilerInvocationPlan) -> String {
        let (program, leading) = self.program();
        let mut parts = vec![to_posix(program)];
        parts.extend(leading.iter().map(|arg| arg.to_string_lossy().into_owned()));
        parts.extend(plan.args());
        parts
            .iter()
            .map(|part| shell_quote(part))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Find a Python interpreter: `PYTHON`, then `python3`, then `python` on PATH.
pub fn find_python() -> Result<PathBuf, Error> {
    if let Ok(path) = std::env::var("PYTHON") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Ok(path);
        }
    }

    which::which("python3")
        .or_else(|_| which::which("python"))
        .map_err(|_| {
            Error::CompilerNotFound(
                "no Python interpreter on PATH for grpc_tools.protoc; set PYTHON or configure protoc"
                    .to_string(),
            )
        })
}

/// The interpreter's site-packages directory.
pub fn site_packages(python: &Path) -> Result<PathBuf, Error> {
    let output = Command::new(python)
        .arg("-c")
        .arg(SITE_PACKAGES_SCRIPT)
        .output()?;
    if !output.status.success() {
        return Err(Error::SitePackages(combined_output(&output)));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let dir = stdout.trim();
    if dir.is_empty() {
        return Err(Error::SitePackages(format!(
            "{} printed no path",
            python.display()
        )));
    }
    Ok(PathBuf::from(dir))
}

/// Run the compiler once for the whole plan.
///
/// Generator output directories are created first since protoc refuses to
/// write into a missing directory. A non-zero exit is reported with the
/// compiler's output unchanged.
pub fn invoke(compiler: &Compiler, plan: &CompilerInvocationPlan) -> Result<(), Error> {
    for dir in plan.output_dirs() {
        std::fs::create_dir_all(plan.working_dir.join(dir))?;
    }

    let (program, leading) = compiler.program();
    let mut cmd = Command::new(program);
    cmd.current_dir(&plan.working_dir)
        .args(leading)
        .args(plan.args());

    tracing::debug!(command = %compiler.command_line(plan), "running protocol compiler");

    let output = cmd.output().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            Error::CompilerNotFound(format!("{}: {e}", program.display()))
        }
        _ => Error::Io(e),
    })?;

    if !output.status.success() {
        return Err(Error::ProtocFailed(combined_output(&output)));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        tracing::debug!("protoc stdout:\n{}", stdout.trim_end());
    }
    // Warnings, e.g. unused imports.
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        tracing::warn!("protoc: {}", stderr.trim_end());
    }
    Ok(())
}

/// Stdout and stderr of a finished process, joined.
fn combined_output(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    if stdout.is_empty() {
        stderr.into_owned()
    } else if stderr.is_empty() {
        stdout.into_owned()
    } else {
        format!("{}\n{}", stdout, stderr)
    }
}

/// Quote an argument for display the way a POSIX shell would need it.
fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "@%+=:,./-_".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use crate::plan::GeneratorInvocation;

    fn sample_plan(working_dir: &Path) -> CompilerInvocationPlan {
        CompilerInvocationPlan {
            working_dir: working_dir.to_path_buf(),
            proto_path_args: vec!["--proto_path=my protos".to_string()],
            generators: vec![GeneratorInvocation {
                name: "python".to_string(),
                output_dir: "gen/out".into(),
                out_arg: "--python_out=gen/out".to_string(),
                opt_arg: None,
                plugin_arg: None,
                outputs: vec!["gen/out/a_pb2.py".into()],
            }],
            inputs: vec!["my protos/a.proto".into()],
            expected_outputs: BTreeSet::from(["gen/out/a_pb2.py".into()]),
        }
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("--python_out=."), "--python_out=.");
        assert_eq!(shell_quote("has space"), "'has space'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn test_explicit_protoc_wins() {
        let compiler = Compiler::locate(Some(Path::new("/opt/protoc")), None).unwrap();
        assert_eq!(compiler, Compiler::Protoc("/opt/protoc".into()));
    }

    #[test]
    fn test_grpc_tools_without_explicit_protoc() {
        let compiler = Compiler::locate(None, Some(Path::new("/usr/bin/python3"))).unwrap();
        assert_eq!(
            compiler,
            Compiler::GrpcTools {
                python: "/usr/bin/python3".into()
            }
        );
    }

    #[test]
    fn test_command_line() {
        let plan = sample_plan(Path::new("/project"));
        let compiler = Compiler::GrpcTools {
            python: "/usr/bin/python3".into(),
        };
        assert_eq!(
            compiler.command_line(&plan),
            "/usr/bin/python3 -m grpc_tools.protoc '--proto_path=my protos' \
             --python_out=gen/out 'my protos/a.proto'"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_invoke_failure_is_verbatim() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-protoc");
        std::fs::write(&script, "#!/bin/sh\necho 'a.proto:1:1: Expected \"syntax\"' >&2\nexit 1\n")
            .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let plan = sample_plan(dir.path());
        let err = invoke(&Compiler::Protoc(script), &plan).unwrap_err();
        match err {
            Error::ProtocFailed(msg) => assert_eq!(msg, "a.proto:1:1: Expected \"syntax\"\n"),
            other => panic!("unexpected error {other:?}"),
        }
        assert!(dir.path().join("gen/out").is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_invoke_passes_plan_args() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-protoc");
        std::fs::write(&script, "#!/bin/sh\nprintf '%s\\n' \"$@\" > args.txt\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let plan = sample_plan(dir.path());
        invoke(&Compiler::Protoc(script), &plan).unwrap();

        let recorded = std::fs::read_to_string(dir.path().join("args.txt")).unwrap();
        assert_eq!(
            recorded.lines().collect::<Vec<_>>(),
            vec!["--proto_path=my protos", "--python_out=gen/out", "my protos/a.proto"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_invoke_success_with_warnings() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-protoc");
        std::fs::write(&script, "#!/bin/sh\necho 'a.proto:3:1: warning: Import unused' >&2\n")
            .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let plan = sample_plan(dir.path());
        invoke(&Compiler::Protoc(script), &plan).unwrap();
    }

    #[test]
    fn test_missing_compiler() {
        let dir = tempfile::tempdir().unwrap();
        let plan = sample_plan(dir.path());
        let err = invoke(&Compiler::Protoc(dir.path().join("no-such-protoc")), &plan).unwrap_err();
        assert!(matches!(err, Error::CompilerNotFound(_)), "{err:?}");
    }
}
