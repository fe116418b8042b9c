//! gmsh-runner: managed invocation of the gmsh mesh generator.
//!
//! This library stages geometry input in a private temporary directory,
//! runs gmsh against it, classifies the run from its diagnostic output and
//! hands the produced `.msh` file back to the caller as a scoped resource.

pub mod cli;
pub mod error;
pub mod runner;

pub use error::{MeshError, Result};
pub use runner::{
    GmshSession, InvocationSpec, NativeInvoker, RunConfig, SessionObserver, SessionState,
    SourceDescriptor, ToolInvoker, ToolOutput, ToolWarning, TracingObserver,
};
