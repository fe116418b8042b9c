//! Command-line interface for gmsh-runner.
//!
//! Provides the `mesh` command for managed gmsh runs and `probe` for
//! checking the gmsh installation.

mod commands;

pub use commands::{
    parse_cli, preview_argv, resolve_mesh_args, run, run_with_cli, Cli, Commands, MeshArgs,
    ProbeArgs,
};
