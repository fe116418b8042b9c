//! Captured subprocess output and how it is judged.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

const FAILURE_HEADER: &str = "gmsh execution failed with message:\n\n";
const WARNING_HEADER: &str = "gmsh issued the following messages:\n\n";

/// Exit status and buffered streams of a finished gmsh process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn new(
        exit_code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Decides whether the run failed, succeeded, or succeeded with noise.
    ///
    /// gmsh reports real failures on stderr rather than through its exit
    /// status, so the only signal used is whether stderr mentions "error" in
    /// any case. A benign message containing that word is treated as fatal,
    /// and a non-zero exit with an empty stderr counts as success.
    pub fn classify(&self) -> Classification {
        if self.stderr.is_empty() {
            return Classification::Success;
        }
        if self.stderr.to_lowercase().contains("error") {
            Classification::Failure(self.report(FAILURE_HEADER))
        } else {
            Classification::Warning(ToolWarning {
                message: self.report(WARNING_HEADER),
            })
        }
    }

    fn report(&self, header: &str) -> String {
        let mut msg = String::from(header);
        if !self.stdout.is_empty() {
            msg.push_str(&self.stdout);
            msg.push('\n');
        }
        msg.push_str(&self.stderr);
        msg.push('\n');
        msg
    }
}

/// Outcome of [`ToolOutput::classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Success,
    Warning(ToolWarning),
    /// Carries the full failure message, header included.
    Failure(String),
}

/// Non-fatal diagnostics gmsh printed during a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolWarning {
    pub message: String,
}

impl fmt::Display for ToolWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Summary of a completed run, as printed by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Where the mesh was copied to.
    pub output_path: PathBuf,
    pub bytes_written: u64,
    pub exit_code: Option<i32>,
    pub warning: Option<String>,
    pub duration_ms: u64,
}
