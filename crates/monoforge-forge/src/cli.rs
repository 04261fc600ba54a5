//! CLI front-end.
//!
//! A thin shell over the pipeline: locate the spec file, load it, pick the
//! output root, run. Exit code 0 on success; the first fatal error prints a
//! single diagnostic line naming the failing phase and path and exits
//! non-zero.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::collab::ProcessCollaborators;
use crate::pipeline::{GenerateOptions, Pipeline};

#[derive(Parser)]
#[command(name = "monoforge")]
#[command(about = "Declarative monorepo generator", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the multi-service workspace described by a specification
    Generate {
        /// Path to the YAML specification
        #[arg(default_value = "monoforge.yaml")]
        spec: PathBuf,

        /// Output directory (defaults to examples/<spec name>)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Module-path prefix override
        #[arg(long)]
        module_path: Option<String>,

        /// Development mode: point the shared-library dependency at the
        /// local path
        #[arg(long)]
        dev: bool,
    },
}

/// Parse arguments and run. This is the only entry point the binaries call.
pub fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Generate {
            spec,
            output,
            module_path,
            dev,
        } => generate(spec, output, module_path, dev),
    }
}

fn generate(
    spec_path: PathBuf,
    output: Option<PathBuf>,
    module_path: Option<String>,
    dev: bool,
) -> anyhow::Result<()> {
    let bytes = fs::read(&spec_path)
        .with_context(|| format!("loader: {}", spec_path.display()))?;
    let spec = monoforge_core::load(&bytes)?;

    let output = output.unwrap_or_else(|| PathBuf::from("examples").join(spec.sanitized_name()));
    let spec_file_name = spec_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "spec.yaml".to_string());

    let collab = ProcessCollaborators;
    let pipeline = Pipeline::new(&collab)?;
    let layout = pipeline.generate(
        &spec,
        &bytes,
        &spec_file_name,
        &GenerateOptions {
            output,
            module_root: module_path,
            dev,
        },
    )?;
    println!("workspace generated at {}", layout.root().display());
    Ok(())
}
