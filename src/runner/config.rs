//! Configuration for gmsh runs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::source::SourceDescriptor;
use crate::error::{MeshError, Result};

/// Executable looked up on `PATH` when none is configured.
pub const DEFAULT_EXECUTABLE: &str = "gmsh";

/// How gmsh should be invoked for one session.
///
/// `dimensions` is checked in [`InvocationSpec::new`], so a spec that exists
/// is always valid and a session built from it never stages anything for a
/// bad dimension count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationSpec {
    dimensions: u8,
    /// Element order passed as `-order`.
    pub order: Option<u32>,
    /// Sets `Mesh.SecondOrderIncomplete` when present.
    pub incomplete_elements: Option<bool>,
    /// Raw arguments appended after the generated ones.
    pub extra_args: Vec<String>,
    /// Name or path of the gmsh binary.
    pub executable: String,
    /// Upper bound on the subprocess wait. `None` blocks until gmsh exits.
    pub timeout: Option<Duration>,
    /// Parent directory for the session's temp directory.
    pub temp_root: Option<PathBuf>,
}

impl InvocationSpec {
    /// Creates a spec for a 1, 2 or 3 dimensional mesh.
    pub fn new(dimensions: i64) -> Result<Self> {
        let dimensions = match dimensions {
            1..=3 => dimensions as u8,
            other => return Err(MeshError::InvalidDimensions(other)),
        };
        Ok(Self {
            dimensions,
            order: None,
            incomplete_elements: None,
            extra_args: Vec::new(),
            executable: DEFAULT_EXECUTABLE.to_string(),
            timeout: None,
            temp_root: None,
        })
    }

    pub fn dimensions(&self) -> u8 {
        self.dimensions
    }

    /// Sets the element order.
    pub fn with_order(mut self, order: u32) -> Self {
        self.order = Some(order);
        self
    }

    /// Requests incomplete (serendipity) or complete high-order elements.
    pub fn with_incomplete_elements(mut self, incomplete: bool) -> Self {
        self.incomplete_elements = Some(incomplete);
        self
    }

    /// Appends raw command-line arguments.
    pub fn with_extra_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the gmsh executable.
    pub fn with_executable(mut self, executable: impl Into<String>) -> Self {
        self.executable = executable.into();
        self
    }

    /// Bounds how long the subprocess may run.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Places session directories under `root` instead of the system temp dir.
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(root.into());
        self
    }
}

fn default_executable() -> String {
    DEFAULT_EXECUTABLE.to_string()
}

/// A run described in a YAML (or JSON) document.
///
/// ```yaml
/// source:
///   kind: literal
///   extension: geo
///   content: |
///     Point(1) = {0, 0, 0, 0.1};
/// dimensions: 2
/// order: 2
/// extra_args: ["-v", "2"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Kept untyped until [`RunConfig::into_parts`] so an unknown `kind`
    /// surfaces as [`MeshError::InvalidSource`].
    pub source: serde_yaml::Value,
    pub dimensions: i64,
    #[serde(default)]
    pub order: Option<u32>,
    #[serde(default)]
    pub incomplete_elements: Option<bool>,
    #[serde(default)]
    pub extra_args: Vec<String>,
    #[serde(default = "default_executable")]
    pub executable: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub temp_root: Option<PathBuf>,
}

impl RunConfig {
    /// Parses a config document. JSON is accepted since it is valid YAML.
    pub fn parse(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| MeshError::Config(e.to_string()))
    }

    /// Loads a config document from disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MeshError::resource(format!("failed to read {}", path.display()), e))?;
        Self::parse(&content)
    }

    /// Validates the document and splits it into a source and a spec.
    ///
    /// Dimensions are checked before the source is looked at.
    pub fn into_parts(self) -> Result<(SourceDescriptor, InvocationSpec)> {
        let mut spec = InvocationSpec::new(self.dimensions)?
            .with_extra_args(self.extra_args)
            .with_executable(self.executable);
        spec.order = self.order;
        spec.incomplete_elements = self.incomplete_elements;
        spec.timeout = self.timeout_secs.map(Duration::from_secs);
        spec.temp_root = self.temp_root;

        let source = serde_yaml::from_value(self.source)
            .map_err(|e| MeshError::InvalidSource(e.to_string()))?;

        Ok((source, spec))
    }
}
