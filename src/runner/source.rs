//! Where gmsh reads its geometry from.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::tempdir::ScopedTempDir;
use crate::error::{MeshError, Result};

/// Input handed to gmsh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceDescriptor {
    /// Inline text, written to `temp.<extension>` inside the session directory.
    Literal { content: String, extension: String },
    /// An existing file, used in place.
    #[serde(rename = "file")]
    FileRef { path: PathBuf },
}

impl SourceDescriptor {
    pub fn literal(content: impl Into<String>, extension: impl Into<String>) -> Self {
        SourceDescriptor::Literal {
            content: content.into(),
            extension: extension.into(),
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        SourceDescriptor::FileRef { path: path.into() }
    }

    /// Produces the concrete input path gmsh will be pointed at.
    ///
    /// File references are checked for existence only here; a file removed
    /// between this call and the subprocess start is not detected.
    pub fn materialize(&self, dir: &ScopedTempDir) -> Result<PathBuf> {
        match self {
            SourceDescriptor::Literal { content, extension } => {
                let path = dir.path_for(&format!("temp.{}", extension));
                fs::write(&path, content).map_err(|e| {
                    MeshError::resource(format!("failed to write {}", path.display()), e)
                })?;
                debug!("Staged literal source ({} bytes) at {}", content.len(), path.display());
                Ok(path)
            }
            SourceDescriptor::FileRef { path } => {
                let absolute = std::path::absolute(path).map_err(|e| {
                    MeshError::resource(format!("failed to resolve {}", path.display()), e)
                })?;
                if !absolute.exists() {
                    return Err(MeshError::InputNotFound { path: absolute });
                }
                debug!("Using source file {}", absolute.display());
                Ok(absolute)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_literal_written_verbatim() {
        let dir = ScopedTempDir::create().unwrap();
        let source = SourceDescriptor::literal("point(1) = {0,0,0,1};", "geo");

        let path = source.materialize(&dir).unwrap();

        assert_eq!(path, dir.path_for("temp.geo"));
        assert_eq!(fs::read(&path).unwrap(), b"point(1) = {0,0,0,1};");
        dir.destroy().unwrap();
    }

    #[test]
    fn test_file_ref_resolves_existing() {
        let scratch = TempDir::new().unwrap();
        let geo = scratch.path().join("box.geo");
        fs::write(&geo, "Box(1) = {0,0,0,1,1,1};").unwrap();
        let dir = ScopedTempDir::create().unwrap();

        let path = SourceDescriptor::file(&geo).materialize(&dir).unwrap();

        assert!(path.is_absolute());
        assert_eq!(path, geo);
        // File references are not copied into the session directory.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_file_ref_missing() {
        let dir = ScopedTempDir::create().unwrap();
        let err = SourceDescriptor::file("definitely/not/here.geo")
            .materialize(&dir)
            .unwrap_err();

        match err {
            MeshError::InputNotFound { path } => {
                assert!(path.is_absolute());
                assert!(path.ends_with("definitely/not/here.geo"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_serde_tagged() {
        let yaml = "kind: literal\ncontent: \"Point(1) = {0,0,0};\"\nextension: geo\n";
        let source: SourceDescriptor = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(source, SourceDescriptor::literal("Point(1) = {0,0,0};", "geo"));

        let source: SourceDescriptor = serde_yaml::from_str("kind: file\npath: a.geo\n").unwrap();
        assert_eq!(source, SourceDescriptor::file("a.geo"));
    }
}
