//! The gmsh session: stage, invoke, classify, hand out the mesh, clean up.

use std::fmt;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::config::InvocationSpec;
use super::invoker::{build_argv, Invocation, NativeInvoker, ToolInvoker};
use super::result::{Classification, ToolOutput, ToolWarning};
use super::source::SourceDescriptor;
use super::tempdir::ScopedTempDir;
use crate::error::{MeshError, Result};

/// Name of the mesh file gmsh is asked to write inside the session directory.
pub const OUTPUT_FILE_NAME: &str = "output.msh";

/// Lifecycle of a [`GmshSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Staged,
    Invoked,
    Opened,
    Failed,
    Closed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Staged => "staged",
            SessionState::Invoked => "invoked",
            SessionState::Opened => "opened",
            SessionState::Failed => "failed",
            SessionState::Closed => "closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives the events a session produces.
///
/// Injected per session; the library holds no global logger.
pub trait SessionObserver: Send + Sync {
    fn invoking(&self, _invocation: &Invocation) {}

    fn returned(&self, _output: &ToolOutput) {}

    /// gmsh wrote to stderr but the run still counts as a success.
    fn warning(&self, warning: &ToolWarning);

    /// Removing the session directory failed. When this follows another
    /// error, that other error is still the one returned to the caller.
    fn cleanup_failed(&self, error: &MeshError);
}

/// Forwards session events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl SessionObserver for TracingObserver {
    fn invoking(&self, invocation: &Invocation) {
        info!("invoking gmsh: '{}'", invocation.display());
    }

    fn returned(&self, output: &ToolOutput) {
        info!("return from gmsh (exit code {:?})", output.exit_code);
    }

    fn warning(&self, warning: &ToolWarning) {
        warn!("{}", warning);
    }

    fn cleanup_failed(&self, error: &MeshError) {
        warn!("Cleanup failed: {}", error);
    }
}

/// One run of gmsh and the resources it owns.
///
/// ```ignore
/// use gmsh_runner::{GmshSession, InvocationSpec, NativeInvoker, SourceDescriptor};
///
/// let spec = InvocationSpec::new(2)?.with_order(2);
/// let source = SourceDescriptor::literal("Point(1) = {0, 0, 0, 0.1};", "geo");
///
/// let mut session = GmshSession::new(source, spec);
/// let result = session.open(&NativeInvoker).await.map(|_| ());
/// let mesh = result.and_then(|_| session.read_output());
/// session.close()?;
/// let mesh = mesh?;
/// ```
///
/// [`close`](Self::close) is the release point for both the output handle and
/// the session directory. Dropping an unclosed session still removes the
/// directory, but any removal error is lost.
pub struct GmshSession {
    source: SourceDescriptor,
    spec: InvocationSpec,
    observer: Arc<dyn SessionObserver>,
    state: SessionState,
    // Declared before `temp_dir` so the handle is released first on drop.
    output: Option<File>,
    temp_dir: Option<ScopedTempDir>,
    warning: Option<ToolWarning>,
    exit_code: Option<i32>,
    cleanup_errors: Vec<MeshError>,
}

impl GmshSession {
    /// Creates an idle session that logs through [`TracingObserver`].
    pub fn new(source: SourceDescriptor, spec: InvocationSpec) -> Self {
        Self {
            source,
            spec,
            observer: Arc::new(TracingObserver),
            state: SessionState::Idle,
            output: None,
            temp_dir: None,
            warning: None,
            exit_code: None,
            cleanup_errors: Vec::new(),
        }
    }

    /// Replaces the observer.
    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn spec(&self) -> &InvocationSpec {
        &self.spec
    }

    pub fn source(&self) -> &SourceDescriptor {
        &self.source
    }

    /// Stages the input, runs gmsh and opens the resulting mesh.
    ///
    /// On any error the session directory is removed before returning and
    /// the session ends up in [`SessionState::Failed`].
    pub async fn open(&mut self, invoker: &dyn ToolInvoker) -> Result<&mut File> {
        if self.state != SessionState::Idle {
            return Err(MeshError::InvalidTransition {
                from: self.state.to_string(),
                to: SessionState::Staged.to_string(),
            });
        }

        let created = match &self.spec.temp_root {
            Some(root) => ScopedTempDir::create_in(root),
            None => ScopedTempDir::create(),
        };
        let dir = match created {
            Ok(dir) => dir,
            Err(e) => {
                self.state = SessionState::Failed;
                return Err(e);
            }
        };

        match self.run_in(&dir, invoker).await {
            Ok(file) => {
                self.temp_dir = Some(dir);
                self.state = SessionState::Opened;
                Ok(self.output.insert(file))
            }
            Err(e) => {
                self.state = SessionState::Failed;
                if let Err(cleanup) = dir.destroy() {
                    self.observer.cleanup_failed(&cleanup);
                    self.cleanup_errors.push(cleanup);
                }
                Err(e)
            }
        }
    }

    /// [`open`](Self::open) with a real gmsh process.
    pub async fn open_native(&mut self) -> Result<&mut File> {
        self.open(&NativeInvoker).await
    }

    async fn run_in(&mut self, dir: &ScopedTempDir, invoker: &dyn ToolInvoker) -> Result<File> {
        let input = self.source.materialize(dir)?;
        self.state = SessionState::Staged;

        let output_path = dir.path_for(OUTPUT_FILE_NAME);
        let invocation = Invocation {
            argv: build_argv(&self.spec, &input, &output_path),
            working_dir: dir.path().to_path_buf(),
            timeout: self.spec.timeout,
        };

        self.observer.invoking(&invocation);
        let output = invoker.run(&invocation).await?;
        self.state = SessionState::Invoked;
        self.exit_code = output.exit_code;
        self.observer.returned(&output);

        match output.classify() {
            Classification::Failure(message) => return Err(MeshError::ToolExecution(message)),
            Classification::Warning(warning) => {
                self.observer.warning(&warning);
                self.warning = Some(warning);
            }
            Classification::Success => {}
        }

        File::open(&output_path).map_err(|e| {
            MeshError::resource(format!("failed to open {}", output_path.display()), e)
        })
    }

    /// Read handle over the produced mesh. Valid until [`close`](Self::close).
    pub fn output_mut(&mut self) -> Option<&mut File> {
        self.output.as_mut()
    }

    /// Reads the whole mesh file from the start.
    pub fn read_output(&mut self) -> Result<Vec<u8>> {
        let state = self.state;
        let file = self.output.as_mut().ok_or_else(|| MeshError::InvalidTransition {
            from: state.to_string(),
            to: "read".to_string(),
        })?;

        let mut bytes = Vec::new();
        file.seek(SeekFrom::Start(0))
            .and_then(|_| file.read_to_end(&mut bytes))
            .map_err(|e| MeshError::resource("failed to read gmsh output", e))?;
        Ok(bytes)
    }

    /// Path of the mesh file while the session is open.
    pub fn output_path(&self) -> Option<PathBuf> {
        self.output
            .as_ref()
            .and(self.temp_dir.as_ref())
            .map(|dir| dir.path_for(OUTPUT_FILE_NAME))
    }

    /// The session directory while the session is open.
    pub fn work_dir(&self) -> Option<&Path> {
        self.temp_dir.as_ref().map(ScopedTempDir::path)
    }

    /// Diagnostics from a successful run that wrote to stderr.
    pub fn warning(&self) -> Option<&ToolWarning> {
        self.warning.as_ref()
    }

    /// Exit code of the gmsh process, once it has run.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Removal failures that happened while another error was propagating.
    pub fn cleanup_errors(&self) -> &[MeshError] {
        &self.cleanup_errors
    }

    /// Releases the output handle and removes the session directory.
    ///
    /// Closing an already closed session does nothing.
    pub fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }

        self.output.take();
        self.state = SessionState::Closed;

        if let Some(dir) = self.temp_dir.take() {
            dir.destroy()?;
        }
        debug!("gmsh session closed");
        Ok(())
    }
}

impl fmt::Debug for GmshSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GmshSession")
            .field("source", &self.source)
            .field("spec", &self.spec)
            .field("state", &self.state)
            .field("work_dir", &self.work_dir())
            .field("warning", &self.warning)
            .finish()
    }
}

impl Drop for GmshSession {
    fn drop(&mut self) {
        if let Some(dir) = &self.temp_dir {
            warn!(
                "gmsh session was not closed; removing {}",
                dir.path().display()
            );
        }
    }
}
