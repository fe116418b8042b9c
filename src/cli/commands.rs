//! CLI command definitions for gmsh-runner.
//!
//! `mesh` runs gmsh once and copies the produced mesh to a destination;
//! `probe` checks that the configured gmsh binary can be executed.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use crate::runner::{
    build_argv, GmshSession, Invocation, InvocationSpec, NativeInvoker, RunConfig, RunReport,
    SourceDescriptor, ToolInvoker, DEFAULT_EXECUTABLE, OUTPUT_FILE_NAME,
};

/// Run the gmsh mesh generator in a managed, self-cleaning session.
#[derive(Parser)]
#[command(name = "gmsh-runner")]
#[command(about = "Run gmsh in a managed temporary workspace and collect the mesh")]
#[command(version)]
#[command(
    long_about = "gmsh-runner stages geometry in a private temporary directory, runs gmsh against it,\nfails the run if gmsh reports an error and copies the resulting .msh file out.\n\nExample usage:\n  gmsh-runner mesh part.geo -d 3 --order 2 -o part.msh -- -clscale 0.5"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Mesh a geometry file or inline geometry.
    Mesh(MeshArgs),

    /// Check that the gmsh executable can be run and print its version.
    Probe(ProbeArgs),
}

/// Arguments for the `mesh` command.
#[derive(Parser, Debug, Default)]
pub struct MeshArgs {
    /// Geometry file to mesh.
    #[arg(conflicts_with = "literal")]
    pub input: Option<PathBuf>,

    /// Inline geometry text instead of an input file.
    #[arg(long)]
    pub literal: Option<String>,

    /// File extension used when staging --literal geometry.
    #[arg(long, default_value = "geo")]
    pub extension: String,

    /// YAML or JSON run description. Command-line flags override its values.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Mesh dimension (1, 2 or 3).
    #[arg(short, long, allow_negative_numbers = true)]
    pub dimensions: Option<i64>,

    /// Element order.
    #[arg(long)]
    pub order: Option<u32>,

    /// Use incomplete (serendipity) high-order elements.
    #[arg(long, conflicts_with = "complete")]
    pub incomplete: bool,

    /// Use complete high-order elements.
    #[arg(long)]
    pub complete: bool,

    /// gmsh executable name or path.
    #[arg(long, env = "GMSH_EXECUTABLE")]
    pub executable: Option<String>,

    /// Kill gmsh if it runs longer than this many seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Directory in which the session's temporary directory is created.
    #[arg(long)]
    pub temp_root: Option<PathBuf>,

    /// Where to write the produced mesh.
    #[arg(short, long, default_value = "output.msh")]
    pub output: PathBuf,

    /// Print the gmsh command line without running it.
    #[arg(long)]
    pub dry_run: bool,

    /// Print a JSON run report.
    #[arg(long)]
    pub json: bool,

    /// Extra arguments passed to gmsh verbatim (after `--`).
    #[arg(last = true)]
    pub extra_args: Vec<String>,
}

/// Arguments for the `probe` command.
#[derive(Parser, Debug)]
pub struct ProbeArgs {
    /// gmsh executable name or path.
    #[arg(long, env = "GMSH_EXECUTABLE", default_value = DEFAULT_EXECUTABLE)]
    pub executable: String,

    /// Give up after this many seconds.
    #[arg(long, default_value = "10")]
    pub timeout_secs: u64,
}

/// Parse CLI arguments without running a command.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Parse CLI arguments and execute the selected command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with already parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Mesh(args) => run_mesh_command(args).await,
        Commands::Probe(args) => run_probe_command(args).await,
    }
}

/// Combines the optional config file with command-line flags.
pub fn resolve_mesh_args(args: &MeshArgs) -> anyhow::Result<(SourceDescriptor, InvocationSpec)> {
    let (source, mut spec) = match &args.config {
        Some(path) => {
            let mut config = RunConfig::from_path(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?;
            if let Some(dimensions) = args.dimensions {
                config.dimensions = dimensions;
            }
            let (source, spec) = config.into_parts()?;
            let source = cli_source(args).unwrap_or(source);
            (source, spec)
        }
        None => {
            let dimensions = args
                .dimensions
                .ok_or_else(|| anyhow::anyhow!("--dimensions is required without --config"))?;
            let spec = InvocationSpec::new(dimensions)?;
            let source = cli_source(args)
                .ok_or_else(|| anyhow::anyhow!("Provide an input file or --literal geometry"))?;
            (source, spec)
        }
    };

    if let Some(order) = args.order {
        spec.order = Some(order);
    }
    if args.incomplete {
        spec.incomplete_elements = Some(true);
    } else if args.complete {
        spec.incomplete_elements = Some(false);
    }
    if let Some(executable) = &args.executable {
        spec.executable = executable.clone();
    }
    if let Some(secs) = args.timeout_secs {
        spec.timeout = Some(Duration::from_secs(secs));
    }
    if let Some(root) = &args.temp_root {
        spec.temp_root = Some(root.clone());
    }
    spec.extra_args.extend(args.extra_args.iter().cloned());

    Ok((source, spec))
}

fn cli_source(args: &MeshArgs) -> Option<SourceDescriptor> {
    if let Some(text) = &args.literal {
        return Some(SourceDescriptor::literal(text.clone(), args.extension.clone()));
    }
    args.input.clone().map(SourceDescriptor::file)
}

/// The command line a session would run, with the session directory shown as `$WORKDIR`.
pub fn preview_argv(source: &SourceDescriptor, spec: &InvocationSpec) -> Vec<String> {
    let workdir = Path::new("$WORKDIR");
    let input = match source {
        SourceDescriptor::Literal { extension, .. } => workdir.join(format!("temp.{}", extension)),
        SourceDescriptor::FileRef { path } => {
            std::path::absolute(path).unwrap_or_else(|_| path.clone())
        }
    };
    build_argv(spec, &input, &workdir.join(OUTPUT_FILE_NAME))
}

async fn run_mesh_command(args: MeshArgs) -> anyhow::Result<()> {
    let (source, spec) = resolve_mesh_args(&args)?;

    if args.dry_run {
        println!("{}", preview_argv(&source, &spec).join(" "));
        return Ok(());
    }

    let start = Instant::now();
    let mut session = GmshSession::new(source, spec);

    let copied = match session.open_native().await {
        Ok(mesh) => copy_mesh(mesh, &args.output),
        Err(e) => Err(anyhow::Error::new(e)),
    };
    for cleanup in session.cleanup_errors() {
        warn!("Secondary cleanup error: {}", cleanup);
    }
    let warning = session.warning().map(|w| w.message.clone());
    let exit_code = session.exit_code();
    let closed = session.close();

    let bytes_written = settle_run(copied, closed)?;

    let report = RunReport {
        output_path: args.output.clone(),
        bytes_written,
        exit_code,
        warning,
        duration_ms: start.elapsed().as_millis() as u64,
    };

    if args.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| anyhow::anyhow!("Failed to serialize JSON output: {}", e))?;
        println!("{}", json);
    } else {
        info!(
            "Wrote {} bytes to {} in {} ms",
            report.bytes_written,
            report.output_path.display(),
            report.duration_ms
        );
    }

    Ok(())
}

/// Picks the error to surface once the session is closed.
///
/// A failed run wins over a failed directory removal; the removal error is
/// then only logged.
fn settle_run(copied: anyhow::Result<u64>, closed: crate::Result<()>) -> anyhow::Result<u64> {
    match (copied, closed) {
        (Ok(bytes), Ok(())) => Ok(bytes),
        (Ok(_), Err(e)) => {
            Err(anyhow::Error::new(e).context("Failed to remove gmsh session directory"))
        }
        (Err(e), closed) => {
            if let Err(cleanup) = closed {
                warn!("Failed to remove gmsh session directory: {}", cleanup);
            }
            Err(e.context("gmsh run failed"))
        }
    }
}

fn copy_mesh(mesh: &mut File, destination: &Path) -> anyhow::Result<u64> {
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let mut out = File::create(destination)
        .with_context(|| format!("Failed to create {}", destination.display()))?;
    let bytes = io::copy(mesh, &mut out)
        .with_context(|| format!("Failed to write {}", destination.display()))?;
    Ok(bytes)
}

async fn run_probe_command(args: ProbeArgs) -> anyhow::Result<()> {
    let invocation = Invocation {
        argv: vec![args.executable.clone(), "--version".to_string()],
        working_dir: std::env::temp_dir(),
        timeout: Some(Duration::from_secs(args.timeout_secs)),
    };

    let output = NativeInvoker
        .run(&invocation)
        .await
        .with_context(|| format!("{} is not available", args.executable))?;

    // gmsh prints its version on stderr.
    let version = [output.stdout.trim(), output.stderr.trim()]
        .into_iter()
        .find(|s| !s.is_empty())
        .unwrap_or("unknown");
    println!("{} {}", args.executable, version);
    Ok(())
}
