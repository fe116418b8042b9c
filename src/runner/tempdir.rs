//! Scoped temporary directory owned by a single session.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::error::{MeshError, Result};

const DIR_PREFIX: &str = "gmsh-run-";

/// A uniquely named directory that lives exactly as long as one session.
///
/// [`destroy`](Self::destroy) removes it and reports failures. If the value
/// is dropped instead, the directory is still removed but errors are lost.
#[derive(Debug)]
pub struct ScopedTempDir {
    dir: TempDir,
}

impl ScopedTempDir {
    /// Creates a fresh directory under the system temp location.
    pub fn create() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(DIR_PREFIX)
            .tempdir()
            .map_err(|e| MeshError::resource("failed to create temporary directory", e))?;
        debug!("Created temporary directory {}", dir.path().display());
        Ok(Self { dir })
    }

    /// Creates a fresh directory under `root`.
    pub fn create_in(root: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(DIR_PREFIX)
            .tempdir_in(root)
            .map_err(|e| {
                MeshError::resource(
                    format!("failed to create temporary directory in {}", root.display()),
                    e,
                )
            })?;
        debug!("Created temporary directory {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Joins `name` onto the owned directory. Does not touch the filesystem.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Recursively removes the directory and everything in it.
    pub fn destroy(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close().map_err(|e| {
            MeshError::resource(
                format!("failed to remove temporary directory {}", path.display()),
                e,
            )
        })?;
        debug!("Removed temporary directory {}", path.display());
        Ok(())
    }
}
