//! Error types for gmsh-runner operations.
//!
//! Every failure a session can hit is a variant of [`MeshError`]:
//! - Spec and source validation
//! - Temporary directory and file I/O
//! - Subprocess spawning, waiting and classification
//! - Session state transitions

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while staging, running or cleaning up a gmsh session.
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("dimensions must be one of 1, 2, 3 (got {0})")]
    InvalidDimensions(i64),

    #[error("source type unrecognized: {0}")]
    InvalidSource(String),

    #[error("'{}' does not exist", .path.display())]
    InputNotFound { path: PathBuf },

    #[error("{context}: {source}")]
    Resource {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Carries the tool's stdout/stderr verbatim, prefixed with a header.
    #[error("{0}")]
    ToolExecution(String),

    #[error("failed to run '{executable}': {source}")]
    Invocation {
        executable: String,
        #[source]
        source: std::io::Error,
    },

    #[error("gmsh timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid session transition from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl MeshError {
    /// Wraps an I/O error with a description of what was being attempted.
    pub fn resource(context: impl Into<String>, source: std::io::Error) -> Self {
        MeshError::Resource {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, MeshError>;
