//! Subprocess invocation of gmsh.
//!
//! [`build_argv`] produces the command line in the exact order gmsh's option
//! parser expects. [`ToolInvoker`] is the seam between the session and the
//! operating system: [`NativeInvoker`] spawns a real process, tests swap in
//! a stub that fabricates output.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::config::InvocationSpec;
use super::result::ToolOutput;
use crate::error::{MeshError, Result};

/// Builds the full gmsh command line, executable first and input last.
pub fn build_argv(spec: &InvocationSpec, input: &Path, output: &Path) -> Vec<String> {
    let mut argv = vec![
        spec.executable.clone(),
        format!("-{}", spec.dimensions()),
        "-o".to_string(),
        output.to_string_lossy().to_string(),
        "-nopopup".to_string(),
    ];

    if let Some(order) = spec.order {
        argv.extend(["-order".to_string(), order.to_string()]);
    }

    if let Some(incomplete) = spec.incomplete_elements {
        argv.extend([
            "-string".to_string(),
            format!("Mesh.SecondOrderIncomplete = {};", u8::from(incomplete)),
        ]);
    }

    argv.extend(spec.extra_args.iter().cloned());
    argv.push(input.to_string_lossy().to_string());
    argv
}

/// A fully resolved process launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program followed by its arguments.
    pub argv: Vec<String>,
    pub working_dir: PathBuf,
    pub timeout: Option<Duration>,
}

impl Invocation {
    pub fn executable(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }

    /// Space-joined command line, for logging.
    pub fn display(&self) -> String {
        self.argv.join(" ")
    }
}

/// Runs a command and hands back its exit code and captured streams.
///
/// Implementations must not interpret the exit code; classification belongs
/// to the caller.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> Result<ToolOutput>;
}

/// Spawns the executable as a native child process.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeInvoker;

impl NativeInvoker {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolInvoker for NativeInvoker {
    async fn run(&self, invocation: &Invocation) -> Result<ToolOutput> {
        let (program, args) = invocation.argv.split_first().ok_or_else(|| {
            MeshError::Invocation {
                executable: String::new(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command line"),
            }
        })?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // A timed-out wait drops the child, which must take the process with it.
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| MeshError::Invocation {
            executable: program.clone(),
            source: e,
        })?;

        let waited = match invocation.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| MeshError::Timeout(limit))?,
            None => child.wait_with_output().await,
        };
        let output = waited.map_err(|e| MeshError::Invocation {
            executable: program.clone(),
            source: e,
        })?;

        let exit_code = output.status.code();
        debug!("{} exited with code {:?}", program, exit_code);

        Ok(ToolOutput::new(
            exit_code,
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        ))
    }
}
