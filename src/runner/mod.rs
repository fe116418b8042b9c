//! Managed gmsh invocation.
//!
//! # Architecture
//!
//! ```text
//! SourceDescriptor → ScopedTempDir → build_argv → ToolInvoker → classify → output.msh
//! ```
//!
//! A [`GmshSession`]:
//! 1. Creates a private temporary directory
//! 2. Writes literal geometry into it, or checks that a referenced file exists
//! 3. Runs gmsh there with a fixed argument layout
//! 4. Fails if stderr mentions "error", warns if stderr has anything else
//! 5. Opens `output.msh` for the caller
//!
//! Every failure removes the directory before the error is returned, and
//! [`GmshSession::close`] removes it after a successful run.
//!
//! # Example
//!
//! ```ignore
//! use gmsh_runner::runner::{GmshSession, InvocationSpec, SourceDescriptor};
//!
//! let spec = InvocationSpec::new(3)?
//!     .with_order(2)
//!     .with_incomplete_elements(true);
//!
//! let mut session = GmshSession::new(SourceDescriptor::file("part.geo"), spec);
//! session.open_native().await?;
//! let mesh = session.read_output()?;
//! session.close()?;
//! ```

pub mod config;
pub mod invoker;
pub mod result;
pub mod session;
pub mod source;
pub mod tempdir;

pub use config::{InvocationSpec, RunConfig, DEFAULT_EXECUTABLE};
pub use invoker::{build_argv, Invocation, NativeInvoker, ToolInvoker};
pub use result::{Classification, RunReport, ToolOutput, ToolWarning};
pub use session::{GmshSession, SessionObserver, SessionState, TracingObserver, OUTPUT_FILE_NAME};
pub use source::SourceDescriptor;
pub use tempdir::ScopedTempDir;
