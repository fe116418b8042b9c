//! Integration tests running full sessions against a fake gmsh.
//!
//! The fake is a shell script that mimics how gmsh reports: it writes the
//! `-o` file, and prints diagnostics on stderr depending on markers in the
//! geometry it is handed.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use gmsh_runner::{GmshSession, InvocationSpec, MeshError, SessionState, SourceDescriptor};
use tempfile::TempDir;

const FAKE_GMSH: &str = r#"#!/bin/sh
here="$(dirname "$0")"
out=""
prev=""
last=""
for a in "$@"; do
  if [ "$prev" = "-o" ]; then out="$a"; fi
  prev="$a"
  last="$a"
done
printf '%s\n' "$@" > "$here/last_args"
pwd > "$here/last_cwd"
if grep -q SLEEP "$last"; then sleep 5; fi
if grep -q FAIL "$last"; then
  echo "Info    : Reading '$last'"
  echo "Error: bad syntax" >&2
  exit 1
fi
if grep -q WARN "$last"; then echo "Warning: unused option" >&2; fi
printf '$MeshFormat\n4.1 0 8\n$EndMeshFormat\n' > "$out"
"#;

const MESH: &[u8] = b"$MeshFormat\n4.1 0 8\n$EndMeshFormat\n";

struct Fixture {
    bin: TempDir,
    root: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let bin = TempDir::new().unwrap();
        let script = bin.path().join("gmsh");
        fs::write(&script, FAKE_GMSH).unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        Self {
            bin,
            root: TempDir::new().unwrap(),
        }
    }

    fn spec(&self, dimensions: i64) -> InvocationSpec {
        InvocationSpec::new(dimensions)
            .unwrap()
            .with_executable(self.bin.path().join("gmsh").to_string_lossy().to_string())
            .with_temp_root(self.root.path())
    }

    fn last_args(&self) -> Vec<String> {
        fs::read_to_string(self.bin.path().join("last_args"))
            .unwrap()
            .lines()
            .map(String::from)
            .collect()
    }

    fn last_cwd(&self) -> PathBuf {
        PathBuf::from(
            fs::read_to_string(self.bin.path().join("last_cwd"))
                .unwrap()
                .trim(),
        )
    }

    fn root_is_empty(&self) -> bool {
        fs::read_dir(self.root.path()).unwrap().next().is_none()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().to_string()
}

#[tokio::test]
async fn test_successful_run() {
    let fx = Fixture::new();
    let spec = fx
        .spec(2)
        .with_order(2)
        .with_incomplete_elements(true)
        .with_extra_args(["-v", "2"]);
    let source = SourceDescriptor::literal("Point(1) = {0,0,0};", "geo");
    let mut session = GmshSession::new(source, spec);

    session.open_native().await.unwrap();

    assert_eq!(session.state(), SessionState::Opened);
    assert_eq!(session.read_output().unwrap(), MESH);
    assert!(session.warning().is_none());
    assert_eq!(session.exit_code(), Some(0));

    let args = fx.last_args();
    assert_eq!(
        &args[..],
        &[
            "-2",
            "-o",
            session.output_path().unwrap().to_str().unwrap(),
            "-nopopup",
            "-order",
            "2",
            "-string",
            "Mesh.SecondOrderIncomplete = 1;",
            "-v",
            "2",
            session.work_dir().unwrap().join("temp.geo").to_str().unwrap(),
        ]
    );
    assert!(file_name(&fx.last_cwd()).starts_with("gmsh-run-"));

    session.close().unwrap();
    assert!(fx.root_is_empty());
}

#[tokio::test]
async fn test_error_output_fails_run() {
    let fx = Fixture::new();
    let mut session = GmshSession::new(SourceDescriptor::literal("// FAIL", "geo"), fx.spec(3));

    let err = session.open_native().await.unwrap_err();

    match err {
        MeshError::ToolExecution(msg) => {
            assert!(msg.starts_with("gmsh execution failed with message:\n\n"));
            assert!(msg.contains("Info    : Reading"));
            assert!(msg.ends_with("Error: bad syntax\n\n"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(session.state(), SessionState::Failed);
    assert!(fx.root_is_empty());

    session.close().unwrap();
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_warning_output_still_succeeds() {
    let fx = Fixture::new();
    let mut session = GmshSession::new(SourceDescriptor::literal("// WARN", "geo"), fx.spec(1));

    session.open_native().await.unwrap();

    let warning = session.warning().unwrap();
    assert!(warning.message.contains("Warning: unused option"));
    assert_eq!(session.read_output().unwrap(), MESH);

    session.close().unwrap();
    assert!(fx.root_is_empty());
}

#[tokio::test]
async fn test_file_reference_used_in_place() {
    let fx = Fixture::new();
    let scratch = TempDir::new().unwrap();
    let geo = scratch.path().join("wing.geo");
    fs::write(&geo, "Point(1) = {0,0,0};").unwrap();

    let mut session = GmshSession::new(SourceDescriptor::file(&geo), fx.spec(3));
    session.open_native().await.unwrap();

    assert_eq!(fx.last_args().last().map(String::as_str), geo.to_str());
    assert!(!session.work_dir().unwrap().join("temp.geo").exists());

    session.close().unwrap();
    assert!(geo.exists());
    assert!(fx.root_is_empty());
}

#[tokio::test]
async fn test_timeout_kills_and_cleans_up() {
    let fx = Fixture::new();
    let spec = fx.spec(2).with_timeout(Duration::from_millis(200));
    let mut session = GmshSession::new(SourceDescriptor::literal("// SLEEP", "geo"), spec);

    let err = session.open_native().await.unwrap_err();

    assert!(matches!(err, MeshError::Timeout(_)));
    assert_eq!(session.state(), SessionState::Failed);
    assert!(fx.root_is_empty());
}

#[tokio::test]
async fn test_missing_executable() {
    let fx = Fixture::new();
    let spec = fx.spec(2).with_executable("gmsh-runner-missing-binary");
    let mut session = GmshSession::new(SourceDescriptor::literal("", "geo"), spec);

    let err = session.open_native().await.unwrap_err();

    assert!(matches!(err, MeshError::Invocation { .. }));
    assert!(fx.root_is_empty());
}
